use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("workflow `{0}` is already running")]
    AlreadyRunning(String),

    #[error("workflow `{0}` not found")]
    NotFound(String),

    #[error(transparent)]
    Workflow(#[from] agentflow_workflow::WorkflowError),

    #[error("invalid execution request: {0}")]
    InvalidRequest(agentflow_core::CoreError),

    #[error("failed to serialize query result: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;
