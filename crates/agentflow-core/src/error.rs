use thiserror::Error;

/// Errors surfaced by the data model itself — malformed requests and
/// state invariant violations caught before a workflow ever starts.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid execution request: {0}")]
    InvalidRequest(String),

    #[error("invalid tool definition `{name}`: {reason}")]
    InvalidTool { name: String, reason: String },

    #[error("state invariant violated: {0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
