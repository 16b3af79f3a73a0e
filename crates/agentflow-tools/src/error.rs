use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolDispatchError {
    #[error("tool `{0}` not found")]
    NotFound(String),

    #[error("unsupported tool type for `{0}`")]
    UnsupportedType(String),

    #[error("tool `{name}` is missing required config `{field}`")]
    MissingConfig { name: String, field: &'static str },

    #[error("tool call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("tool call was cancelled")]
    Cancelled,

    #[error("http tool call failed: {0}")]
    Http(String),

    #[error("builtin tool `{0}` is unknown")]
    UnknownBuiltin(String),

    #[error("mcp dispatch is not implemented: {0}")]
    McpUnimplemented(String),
}
