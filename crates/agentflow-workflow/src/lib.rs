//! The activity layer and agent-loop workflow (spec §4.1/§4.2): the
//! durable state machine that drives iterations, parallel tool dispatch,
//! HITL approval, and termination over the abstractions the other crates
//! in this workspace provide.

pub mod activities;
mod agent_loop;
mod config;
mod error;
mod retry;
mod state_store;

pub use agent_loop::{spawn_agent_loop, AgentLoopDeps, AgentLoopHandle, ApprovalSignal};
pub use config::AgentLoopConfig;
pub use error::{WorkflowError, WorkflowResult};
pub use retry::{retry, IsTransient, RetryPolicy};
pub use state_store::{NullStateStore, StateStore};
