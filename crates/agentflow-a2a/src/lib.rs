//! The A2A bridge and HTTP surface (spec §4.8/§6): translates between
//! the Agent-to-Agent wire protocol and the executor's native
//! `ExecutionRequest`/`A2AEvent` types, and exposes both the A2A and
//! the native `/api/v1/*` endpoints over axum.

mod bridge;
mod error;
mod protocol;
mod routes;
mod state;

pub use bridge::{to_execution_request, to_stream_event, DEFAULT_MODEL, DEFAULT_PROVIDER};
pub use error::A2aError;
pub use protocol::{A2aMessage, A2aStreamEvent, AuthContext, MessagePart, MessageSendParams, TaskArtifactUpdate, TaskStatusUpdate};
pub use routes::router;
pub use state::AppState;
