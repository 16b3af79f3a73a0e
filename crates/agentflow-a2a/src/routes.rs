use std::convert::Infallible;

use agentflow_bus::KeepAliveStream;
use agentflow_core::ExecutionRequest;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::bridge::{to_execution_request, to_stream_event};
use crate::error::A2aError;
use crate::protocol::{A2aStreamEvent, MessageSendParams};
use crate::state::AppState;

/// Builds the router spec §6 describes: the A2A surface (`/a2a/*`) and
/// the alternative `ExecutionRequest`-shaped API (`/api/v1/*`).
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/a2a/message", post(a2a_message))
        .route("/a2a/stream", post(a2a_stream))
        .route("/api/v1/execute", post(api_execute))
        .route("/api/v1/cancel/{workflow_id}", post(api_cancel))
        .route("/api/v1/approve/{workflow_id}", post(api_approve))
        .route("/api/v1/status/{workflow_id}", get(api_status))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

async fn a2a_message(
    State(state): State<AppState>,
    Json(params): Json<MessageSendParams>,
) -> Result<impl IntoResponse, A2aError> {
    let request = to_execution_request(params);
    let response = state.executor.execute(request).await?;
    Ok(Json(response))
}

/// Streams the task's events as Server-Sent Events (spec §6), wrapped in
/// a keep-alive so the connection survives quiet stretches between
/// iterations. Ends after the first terminal status update.
async fn a2a_stream(State(state): State<AppState>, Json(params): Json<MessageSendParams>) -> impl IntoResponse {
    let request = to_execution_request(params);
    let task_id = request.task_id.clone();

    let body = async_stream::stream! {
        // Subscribe before the workflow starts: `EventBus::publish` is
        // fire-and-forget, so a workflow that finishes before anyone is
        // listening would otherwise drop its terminal event into the void
        // and leave this stream waiting on a `recv()` that never resolves.
        let mut events = KeepAliveStream::new(state.executor.stream_events(&task_id));

        let handle = match state.executor.execute_async(request).await {
            Ok(handle) => handle,
            Err(err) => {
                yield Ok::<_, Infallible>(SseEvent::default().event("error").data(err.to_string()));
                return;
            }
        };
        drop(handle);

        while let Some(event) = events.recv().await {
            let payload = to_stream_event(&event);
            let terminal = matches!(&payload, A2aStreamEvent::Status(update) if update.status.is_terminal());
            match serde_json::to_string(&payload) {
                Ok(data) => yield Ok(SseEvent::default().event("message").data(data)),
                Err(err) => {
                    warn!(%err, "failed to serialize stream event");
                    yield Ok(SseEvent::default().event("error").data(err.to_string()));
                }
            }
            if terminal {
                break;
            }
        }
    };

    Sse::new(body).keep_alive(KeepAlive::default())
}

async fn api_execute(
    State(state): State<AppState>,
    Json(request): Json<ExecutionRequest>,
) -> Result<impl IntoResponse, A2aError> {
    let response = state.executor.execute(request).await?;
    Ok(Json(response))
}

async fn api_cancel(State(state): State<AppState>, Path(workflow_id): Path<String>) -> Result<impl IntoResponse, A2aError> {
    state.executor.cancel(&workflow_id).await?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, Deserialize)]
struct ApproveBody {
    approved: bool,
    #[serde(default)]
    reason: Option<String>,
}

async fn api_approve(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
    Json(body): Json<ApproveBody>,
) -> Result<impl IntoResponse, A2aError> {
    state
        .executor
        .approve_tool_execution(&workflow_id, body.approved, body.reason)
        .await?;
    Ok(StatusCode::ACCEPTED)
}

async fn api_status(State(state): State<AppState>, Path(workflow_id): Path<String>) -> Result<impl IntoResponse, A2aError> {
    let response = state.executor.status(&workflow_id).await?;
    Ok(Json(response))
}
