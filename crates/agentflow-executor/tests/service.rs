//! Exercises `ExecutorService` on top of the real agent loop: duplicate
//! task-id rejection, the blocking and async start paths, and the
//! cancel/approve/query signal surface.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use agentflow_bus::EventBus;
use agentflow_core::{ExecutionRequest, ModelConfig, TaskStatus, Tool, ToolCall};
use agentflow_executor::{ExecutorError, ExecutorService, QueryType};
use agentflow_providers::{ChatRequest, ChatResponse, FinishReason, Provider, ProviderRegistry, ProviderResult};
use agentflow_tools::{BuiltinRegistry, BuiltinTool, ToolDispatcher};
use agentflow_workflow::{AgentLoopConfig, NullStateStore};
use async_trait::async_trait;
use serde_json::json;

struct EchoBuiltin;

#[async_trait]
impl BuiltinTool for EchoBuiltin {
    async fn call(&self, _arguments: &serde_json::Value) -> Result<String, agentflow_tools::ToolDispatchError> {
        Ok("echo".to_string())
    }
}

/// A provider that always asks to call tool `t`, for tests that need the
/// loop to stay in flight long enough to exercise cancel/query.
struct AlwaysCallsToolProvider;

#[async_trait]
impl Provider for AlwaysCallsToolProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn supported_models(&self) -> Vec<String> {
        vec!["scripted-model".to_string()]
    }

    async fn chat(&self, _request: ChatRequest) -> ProviderResult<ChatResponse> {
        Ok(ChatResponse {
            content: String::new(),
            tool_calls: vec![ToolCall::requested("c1", "t", json!({}))],
            finish_reason: FinishReason::ToolCalls,
            token_usage: agentflow_core::TokenUsage::new(1, 1),
            model_used: "scripted-model".to_string(),
        })
    }
}

struct ImmediateStopProvider;

#[async_trait]
impl Provider for ImmediateStopProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn supported_models(&self) -> Vec<String> {
        vec!["scripted-model".to_string()]
    }

    async fn chat(&self, _request: ChatRequest) -> ProviderResult<ChatResponse> {
        Ok(ChatResponse {
            content: "done".to_string(),
            tool_calls: vec![],
            finish_reason: FinishReason::Stop,
            token_usage: agentflow_core::TokenUsage::new(3, 0),
            model_used: "scripted-model".to_string(),
        })
    }
}

fn base_request(task_id: &str) -> ExecutionRequest {
    ExecutionRequest {
        task_id: task_id.to_string(),
        session_id: "session-1".to_string(),
        user_id: "user-1".to_string(),
        user_message: "Say hi".to_string(),
        system_message: None,
        max_iterations: 1000,
        timeout: Duration::from_secs(30),
        require_approval: false,
        tools: vec![Tool::builtin("t", "echoes", json!({"type": "object"}))],
        model_config: ModelConfig::new("scripted", "scripted-model"),
        metadata: HashMap::new(),
    }
}

/// Polls `status` until the workflow reaches a terminal state. Needed
/// whenever a test starts a workflow with `execute_async`: the service's
/// own background reaper owns the handle's single `join()`, so tests
/// observe completion through `status` instead of racing that reaper for
/// the same `JoinHandle`.
async fn wait_for_terminal(service: &ExecutorService, task_id: &str) -> agentflow_core::ExecutionResponse {
    let mut response = service.status(task_id).await.unwrap();
    for _ in 0..200 {
        if response.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        response = service.status(task_id).await.unwrap();
    }
    response
}

async fn service_with(provider: Arc<dyn Provider>) -> ExecutorService {
    let providers = ProviderRegistry::new();
    providers.register(provider).await.unwrap();

    let mut builtins = BuiltinRegistry::new();
    builtins.register("t", Box::new(EchoBuiltin));
    let dispatcher = ToolDispatcher::new().with_builtins(builtins);

    ExecutorService::new(
        Arc::new(providers),
        Arc::new(dispatcher),
        EventBus::new(),
        Arc::new(NullStateStore),
        AgentLoopConfig::default(),
    )
}

#[tokio::test]
async fn execute_blocks_until_completion() {
    let service = service_with(Arc::new(ImmediateStopProvider)).await;
    let response = service.execute(base_request("exec-1")).await.unwrap();
    assert_eq!(response.status, TaskStatus::Completed);
    assert_eq!(response.result, "done");
}

#[tokio::test]
async fn duplicate_task_id_is_rejected_while_running() {
    let service = service_with(Arc::new(AlwaysCallsToolProvider)).await;
    let handle = service.execute_async(base_request("dup-1")).await.unwrap();

    let err = service
        .execute_async(base_request("dup-1"))
        .await
        .expect_err("same task_id should collide while still running");
    assert!(matches!(err, ExecutorError::AlreadyRunning(id) if id == "dup-1"));

    handle.cancel();
    let response = wait_for_terminal(&service, "dup-1").await;
    assert_eq!(response.status, TaskStatus::Cancelled);
}

#[tokio::test]
async fn task_id_is_reusable_once_the_prior_run_finished() {
    let service = service_with(Arc::new(ImmediateStopProvider)).await;
    service.execute(base_request("reuse-1")).await.unwrap();

    // The first run already reached a terminal status, so starting a new
    // one under the same task_id must succeed rather than collide.
    let response = service.execute(base_request("reuse-1")).await.unwrap();
    assert_eq!(response.status, TaskStatus::Completed);
}

#[tokio::test]
async fn cancel_and_query_act_on_the_running_workflow() {
    let service = service_with(Arc::new(AlwaysCallsToolProvider)).await;
    service.execute_async(base_request("cancel-1")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    let state = service.query("cancel-1", QueryType::State).await.unwrap();
    assert_eq!(state.task_id, "cancel-1");

    service.cancel("cancel-1").await.unwrap();
    let response = wait_for_terminal(&service, "cancel-1").await;
    assert_eq!(response.status, TaskStatus::Cancelled);
}

#[tokio::test]
async fn approve_tool_execution_unblocks_a_paused_workflow() {
    let service = service_with(Arc::new(AlwaysCallsToolProvider)).await;
    let mut request = base_request("approve-1");
    request.require_approval = true;
    request.max_iterations = 1;
    service.execute_async(request).await.unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    service
        .approve_tool_execution("approve-1", true, None)
        .await
        .unwrap();

    let response = wait_for_terminal(&service, "approve-1").await;
    assert_eq!(response.status, TaskStatus::Completed);
}

#[tokio::test]
async fn status_reports_the_cached_response_after_execute_async_completes() {
    let service = service_with(Arc::new(ImmediateStopProvider)).await;
    service.execute_async(base_request("status-1")).await.unwrap();

    let response = wait_for_terminal(&service, "status-1").await;
    assert_eq!(response.status, TaskStatus::Completed);
    assert_eq!(response.result, "done");
}

#[tokio::test]
async fn unknown_task_id_is_not_found() {
    let service = service_with(Arc::new(ImmediateStopProvider)).await;
    let err = service.cancel("no-such-task").await.expect_err("should not find it");
    assert!(matches!(err, ExecutorError::NotFound(id) if id == "no-such-task"));
}
