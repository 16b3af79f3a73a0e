//! Shared data model for the agent execution engine: requests, messages,
//! tools, durable execution state, and the events published about it.
//!
//! Every other crate in the workspace depends on this one and none of its
//! types depend outward — it stays a leaf.

mod error;
mod event;
mod message;
mod request;
mod state;
mod tool;
mod usage;

pub use error::{CoreError, CoreResult};
pub use event::{A2AEvent, A2AEventType};
pub use message::{Message, Role};
pub use request::{ExecutionRequest, ModelConfig};
pub use state::{ExecutionResponse, ExecutionState, TaskStatus};
pub use tool::{Tool, ToolCall, ToolCallStatus, ToolConfig, ToolType};
pub use usage::TokenUsage;
