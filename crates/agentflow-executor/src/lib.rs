//! The executor façade (spec §4.7): a process-wide entry point that
//! starts, signals, queries, and streams events for agent-loop workflows
//! keyed by `task_id`, on top of `agentflow-workflow`'s actor.

mod error;
mod query;
mod service;

pub use error::{ExecutorError, ExecutorResult};
pub use query::QueryType;
pub use service::ExecutorService;
