use thiserror::Error;

/// Errors from the activity layer and the agent-loop actor. Provider and
/// tool errors are wrapped transparently; everything else is a condition
/// local to driving the loop itself.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Provider(#[from] agentflow_providers::ProviderError),

    #[error("invoke_llm timed out after {0:?}")]
    LlmTimeout(std::time::Duration),

    #[error("workflow command channel closed")]
    Closed,

    #[error("state store error: {0}")]
    StateStore(String),

    #[error("a workflow with task_id `{0}` is already running")]
    DuplicateTaskId(String),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
