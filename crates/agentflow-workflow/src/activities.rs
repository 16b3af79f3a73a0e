//! The activity layer (spec §4.2): idempotent-at-boundary units of work the
//! agent loop schedules. Each activity emits a `tracing` span at start
//! (the "heartbeat") and returns plain data, never leaving an in-flight
//! side effect for the loop to reason about.

use std::sync::Arc;
use std::time::Duration;

use agentflow_bus::EventBus;
use agentflow_core::{A2AEvent, Tool, ToolCall};
use agentflow_providers::{ChatRequest, ChatResponse, ProviderRegistry};
use agentflow_tools::ToolDispatcher;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::{WorkflowError, WorkflowResult};
use crate::retry::{retry, RetryPolicy};

const LLM_RETRY_POLICY: RetryPolicy = RetryPolicy {
    max_attempts: 3,
    initial_backoff: Duration::from_secs(1),
    max_backoff: Duration::from_secs(30),
};

/// `InvokeLLM` (spec §4.1 step 2): route to the named provider, retrying
/// transient failures with exponential backoff. A permanent error (auth,
/// malformed schema) or exhausting the retry budget is fatal to the loop.
#[instrument(skip(registry, request), fields(provider = %provider_name))]
pub async fn invoke_llm(
    registry: &ProviderRegistry,
    provider_name: &str,
    request: ChatRequest,
) -> WorkflowResult<ChatResponse> {
    let provider = registry.get(provider_name).await?;
    retry(LLM_RETRY_POLICY, || {
        let provider = Arc::clone(&provider);
        let request = request.clone();
        async move { provider.chat(request).await }
    })
    .await
    .map_err(WorkflowError::Provider)
}

/// `ExecuteTool` (spec §4.2/§4.4): this never surfaces a workflow-fatal
/// error — every failure mode (missing config, timeout, cancellation,
/// transport error) is encoded onto the returned `ToolCall`. Activity-level
/// retry is therefore moot for this build's in-process dispatcher: there is
/// no failure channel left for a wrapping retry loop to observe, so none is
/// applied here (the spec's `retry <=2` describes the durable-engine-level
/// activity-call retry of a production deployment, not app-level retries
/// of the dispatcher's own verdict).
#[instrument(skip(dispatcher, tool, cancellation), fields(tool.name = %call.name, tool.id = %call.id))]
pub async fn execute_tool(dispatcher: &ToolDispatcher, call: ToolCall, tool: &Tool, cancellation: &CancellationToken) -> ToolCall {
    dispatcher.execute(call, tool, cancellation).await
}

/// `PublishEvent` (spec §4.2): retried up to 3 times in a production
/// transport; a publish failure is logged and never propagated as a fatal
/// workflow error. The in-process `EventBus::publish` used here is
/// infallible (it drops on a full subscriber buffer rather than erroring),
/// so there is nothing for a retry loop to observe — the call site is kept
/// as its own activity function so a future transport-backed bus (e.g. a
/// webhook relay) slots in without changing callers.
#[instrument(skip(bus, event), fields(task_id = %event.task_id))]
pub async fn publish_event(bus: &EventBus, event: A2AEvent) {
    bus.publish(event);
}

/// `CancelExecution` (spec §4.2): publish the final `cancelled` status for
/// a task being torn down.
pub async fn cancel_execution(bus: &EventBus, task_id: &str) {
    publish_event(bus, A2AEvent::status_update(task_id, serde_json::json!({ "status": "cancelled" }))).await;
}
