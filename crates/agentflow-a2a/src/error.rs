use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced at the A2A/HTTP boundary (spec §7: validation errors are
/// rejected here with 4xx before any workflow starts).
#[derive(Debug, Error)]
pub enum A2aError {
    #[error("failed to decode request body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidMessage(String),

    #[error(transparent)]
    Executor(#[from] agentflow_executor::ExecutorError),
}

impl A2aError {
    fn status(&self) -> StatusCode {
        match self {
            A2aError::Decode(_) | A2aError::InvalidMessage(_) => StatusCode::BAD_REQUEST,
            A2aError::Executor(agentflow_executor::ExecutorError::NotFound(_)) => StatusCode::NOT_FOUND,
            A2aError::Executor(agentflow_executor::ExecutorError::AlreadyRunning(_)) => StatusCode::CONFLICT,
            A2aError::Executor(agentflow_executor::ExecutorError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            A2aError::Executor(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for A2aError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
