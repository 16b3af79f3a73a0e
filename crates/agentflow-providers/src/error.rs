use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider `{0}` is already registered")]
    AlreadyRegistered(String),

    #[error("no provider registered under `{0}`")]
    NotFound(String),

    #[error("transient provider error: {0}")]
    Transient(String),

    #[error("permanent provider error: {0}")]
    Permanent(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl ProviderError {
    /// Distinguishes the two failure kinds the activity layer's retry
    /// policy cares about (spec §4.2): network/5xx is transient and should
    /// be retried, auth/schema problems are permanent and fatal.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_) | ProviderError::Transport(_))
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
