//! The agent-loop workflow (spec §4.1): a durable state machine driving
//! iterations, parallel tool dispatch, HITL approval, and termination.
//!
//! A single task owns the mutable `ExecutionState` and drains an `mpsc`
//! command channel, so the state is never shared across threads and
//! every mutation happens on one logical thread. A production deployment
//! would swap this actor for a real durable-workflow engine without
//! changing its external contract (see DESIGN.md).

use std::collections::HashMap;
use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Instant;

use agentflow_bus::EventBus;
use agentflow_core::{
    A2AEvent, ExecutionRequest, ExecutionResponse, ExecutionState, Message, TaskStatus, ToolCall,
};
use agentflow_providers::{ChatRequest, ProviderRegistry};
use agentflow_tools::{find_tool, ToolDispatcher};
use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::activities;
use crate::config::AgentLoopConfig;
use crate::error::{WorkflowError, WorkflowResult};
use crate::state_store::StateStore;

/// External signal delivered on the `tool-approval` channel (spec §4.1
/// step 5). `reason` is a supplemental-features addition (SPEC_FULL.md):
/// a denial can carry human-readable context the model sees in the
/// synthesized `tool` message.
#[derive(Debug, Clone, Default)]
pub struct ApprovalSignal {
    pub approved: bool,
    pub reason: Option<String>,
}

/// Everything the loop needs from the rest of the workspace.
#[derive(Clone)]
pub struct AgentLoopDeps {
    pub providers: Arc<ProviderRegistry>,
    pub tools: Arc<ToolDispatcher>,
    pub bus: EventBus,
    pub state_store: Arc<dyn StateStore>,
    pub config: AgentLoopConfig,
}

enum LoopCmd {
    Approve(ApprovalSignal),
    Query(oneshot::Sender<ExecutionState>),
}

enum ApprovalOutcome {
    Approved,
    Denied(Option<String>),
    TimedOut,
}

/// A handle to a running loop. Cheap to clone the underlying channels are
/// not exposed directly so callers go through `approve_tool_execution`/
/// `query`/`cancel`, matching the executor façade's operations (spec
/// §4.7).
pub struct AgentLoopHandle {
    task_id: String,
    cmd_tx: mpsc::Sender<LoopCmd>,
    cancel: CancellationToken,
    join: tokio::sync::Mutex<Option<JoinHandle<ExecutionResponse>>>,
}

impl AgentLoopHandle {
    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Deliver an external approve/deny signal (spec §4.7
    /// `approve_tool_execution`). A signal delivered when the loop isn't
    /// waiting on one is simply ignored by the loop's command dispatch.
    pub async fn approve_tool_execution(&self, approved: bool, reason: Option<String>) -> WorkflowResult<()> {
        self.cmd_tx
            .send(LoopCmd::Approve(ApprovalSignal { approved, reason }))
            .await
            .map_err(|_| WorkflowError::Closed)
    }

    /// Read-only snapshot of the current `ExecutionState` (spec §4.1
    /// Queries). Never mutates the loop.
    pub async fn query(&self) -> WorkflowResult<ExecutionState> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx.send(LoopCmd::Query(reply_tx)).await.map_err(|_| WorkflowError::Closed)?;
        reply_rx.await.map_err(|_| WorkflowError::Closed)
    }

    /// Request cancellation (spec §4.7 `cancel`). The loop observes this
    /// at its next suspension point and publishes a final status before
    /// exiting.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the underlying task has already terminated. Used by the
    /// executor façade to decide whether a task-id is a live collision
    /// (spec §4.7: "starting two workflows with the same task_id must be
    /// rejected") or a stale, reusable identity.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        match self.join.try_lock() {
            Ok(guard) => guard.as_ref().is_none_or(JoinHandle::is_finished),
            Err(_) => false,
        }
    }

    /// Wait for the loop to terminate and collect its response (spec §4.7
    /// `execute`, blocking variant). Only the first caller observes the
    /// `JoinHandle` directly; concurrent callers after it has been taken
    /// get `WorkflowError::Closed` rather than a second await of the same
    /// task (callers needing a broadcast of completion should `query`
    /// instead).
    pub async fn join(&self) -> WorkflowResult<ExecutionResponse> {
        let mut slot = self.join.lock().await;
        let handle = slot.take().ok_or(WorkflowError::Closed)?;
        drop(slot);
        handle.await.map_err(|_| WorkflowError::Closed)
    }
}

/// Start a new agent loop. The loop runs on its own task; use the returned
/// handle to signal, query, cancel, or await it.
#[must_use]
pub fn spawn_agent_loop(request: ExecutionRequest, deps: AgentLoopDeps) -> AgentLoopHandle {
    let task_id = request.task_id.clone();
    let state = ExecutionState::new(task_id.clone(), request.max_iterations, request.metadata.clone());
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let cancel = CancellationToken::new();

    let actor = AgentLoopActor {
        request,
        deps,
        state,
        cmd_rx,
        cancel: cancel.clone(),
        start: Instant::now(),
    };
    let join = tokio::spawn(actor.run());

    AgentLoopHandle { task_id, cmd_tx, cancel, join: tokio::sync::Mutex::new(Some(join)) }
}

struct AgentLoopActor {
    request: ExecutionRequest,
    deps: AgentLoopDeps,
    state: ExecutionState,
    cmd_rx: mpsc::Receiver<LoopCmd>,
    cancel: CancellationToken,
    start: Instant,
}

impl AgentLoopActor {
    #[instrument(skip(self), fields(task_id = %self.state.task_id))]
    async fn run(mut self) -> ExecutionResponse {
        self.state.status = TaskStatus::Working;
        if let Some(system) = self.request.system_message.clone() {
            self.state.push_message(Message::system(system));
        }
        self.state.push_message(Message::user(self.request.user_message.clone()));

        loop {
            if self.cancel.is_cancelled() {
                self.state.finish(TaskStatus::Cancelled);
                return self.finalize(None).await;
            }
            if self.start.elapsed() >= self.request.timeout {
                self.state.finish(TaskStatus::Failed);
                return self.finalize(Some("execution request timeout exceeded".to_string())).await;
            }

            self.state.current_iteration += 1;
            info!(iteration = self.state.current_iteration, "starting iteration");

            let chat_response = match self.invoke_llm().await {
                ControlFlow::Break(response) => return response,
                ControlFlow::Continue(Ok(response)) => response,
                ControlFlow::Continue(Err(message)) => {
                    self.state.finish(TaskStatus::Failed);
                    return self.finalize(Some(message)).await;
                }
            };

            let has_tool_calls = !chat_response.tool_calls.is_empty();
            let finish_stop = chat_response.finish_reason.is_stop();
            self.state.token_usage.add(chat_response.token_usage);
            self.state.last_llm_response = Some(chat_response.content.clone());
            self.state
                .push_message(Message::assistant(chat_response.content.clone(), chat_response.tool_calls.clone()));

            // Termination check A (spec §4.1 step 4).
            if finish_stop && !has_tool_calls {
                self.state.finish(TaskStatus::Completed);
                return self.finalize(None).await;
            }

            let mut pending_calls = chat_response.tool_calls;

            // Approval gate (spec §4.1 step 5).
            if self.request.require_approval && !pending_calls.is_empty() {
                self.state.pending_approvals.clone_from(&pending_calls);
                self.state.status = TaskStatus::InputRequired;
                self.publish_status().await;

                match self.await_approval().await {
                    ControlFlow::Break(response) => return response,
                    ControlFlow::Continue(ApprovalOutcome::Approved) => {
                        self.state.pending_approvals.clear();
                        self.state.status = TaskStatus::Working;
                        for call in &mut pending_calls {
                            call.status = agentflow_core::ToolCallStatus::Approved;
                        }
                    }
                    ControlFlow::Continue(ApprovalOutcome::Denied(reason)) => {
                        return self.finish_denied(pending_calls, reason).await;
                    }
                    ControlFlow::Continue(ApprovalOutcome::TimedOut) => {
                        return self.finish_approval_timeout(pending_calls).await;
                    }
                }
            }

            // Parallel tool dispatch (spec §4.1 step 6), reassembled in
            // the originating assistant message's call order regardless
            // of completion order (DESIGN.md's Open Question resolution).
            let results = match self.dispatch_tools(pending_calls).await {
                ControlFlow::Break(response) => return response,
                ControlFlow::Continue(results) => results,
            };

            self.state.record_tool_calls(&results);
            for call in &results {
                self.state.push_message(Message::tool_result(call.id.clone(), call.llm_visible_text()));
            }

            // Termination check B (spec §4.1 step 8): clean termination,
            // not failure.
            if self.state.current_iteration >= self.state.max_iterations {
                self.state.finish(TaskStatus::Completed);
                return self.finalize(None).await;
            }
        }
    }

    async fn invoke_llm(&mut self) -> ControlFlow<ExecutionResponse, Result<agentflow_providers::ChatResponse, String>> {
        let chat_request = self.build_chat_request();
        let provider_name = self.request.model_config.provider.clone();
        let timeout = self.deps.config.activity_timeout;
        let providers = Arc::clone(&self.deps.providers);
        let invoke = time::timeout(timeout, async move { activities::invoke_llm(&providers, &provider_name, chat_request).await });

        match self.await_with_cmds(invoke).await {
            ControlFlow::Break(response) => ControlFlow::Break(response),
            ControlFlow::Continue(Ok(Ok(response))) => ControlFlow::Continue(Ok(response)),
            ControlFlow::Continue(Ok(Err(error))) => ControlFlow::Continue(Err(error.to_string())),
            ControlFlow::Continue(Err(_elapsed)) => {
                ControlFlow::Continue(Err(format!("invoke_llm timed out after {timeout:?}")))
            }
        }
    }

    fn build_chat_request(&self) -> ChatRequest {
        ChatRequest {
            messages: self.state.messages.clone(),
            tools: self.request.tools.clone(),
            model_config: self.request.model_config.clone(),
        }
    }

    async fn dispatch_tools(&mut self, calls: Vec<ToolCall>) -> ControlFlow<ExecutionResponse, Vec<ToolCall>> {
        let mut completed: HashMap<String, ToolCall> = HashMap::with_capacity(calls.len());
        let mut pending = FuturesUnordered::new();
        let semaphore = Arc::new(Semaphore::new(self.deps.config.max_concurrent_activities.max(1)));

        for call in &calls {
            match find_tool(&self.request.tools, &call.name) {
                None => {
                    let mut missing = call.clone();
                    missing.mark_failed(format!("tool {} not found", call.name));
                    completed.insert(missing.id.clone(), missing);
                }
                Some(tool) => {
                    let tool = tool.clone();
                    let call = call.clone();
                    let dispatcher = Arc::clone(&self.deps.tools);
                    let cancellation = self.cancel.clone();
                    let permit = Arc::clone(&semaphore);
                    pending.push(async move {
                        let _permit = permit.acquire_owned().await.ok();
                        activities::execute_tool(&dispatcher, call, &tool, &cancellation).await
                    });
                }
            }
        }

        while !pending.is_empty() {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    self.state.finish(TaskStatus::Cancelled);
                    return ControlFlow::Break(self.finalize(None).await);
                }
                Some(cmd) = self.cmd_rx.recv() => self.service_stray_command(cmd),
                Some(result) = pending.next() => {
                    completed.insert(result.id.clone(), result);
                }
            }
        }

        ControlFlow::Continue(reorder_results(&calls, completed))
    }

    async fn await_approval(&mut self) -> ControlFlow<ExecutionResponse, ApprovalOutcome> {
        let timer = time::sleep(self.deps.config.approval_timeout);
        tokio::pin!(timer);
        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    self.state.finish(TaskStatus::Cancelled);
                    return ControlFlow::Break(self.finalize(None).await);
                }
                Some(cmd) = self.cmd_rx.recv() => {
                    match cmd {
                        LoopCmd::Approve(signal) => {
                            return ControlFlow::Continue(if signal.approved {
                                ApprovalOutcome::Approved
                            } else {
                                ApprovalOutcome::Denied(signal.reason)
                            });
                        }
                        LoopCmd::Query(reply) => {
                            let _ = reply.send(self.state.clone());
                        }
                    }
                }
                () = &mut timer => {
                    return ControlFlow::Continue(ApprovalOutcome::TimedOut);
                }
            }
        }
    }

    /// Service a command arm that arrived while the loop was waiting on
    /// something other than a signal (an LLM call or tool dispatch): only
    /// `Query` makes sense there, so `Approve` is dropped — there is no
    /// pending approval to apply it to.
    fn service_stray_command(&mut self, cmd: LoopCmd) {
        match cmd {
            LoopCmd::Query(reply) => {
                let _ = reply.send(self.state.clone());
            }
            LoopCmd::Approve(_) => {}
        }
    }

    async fn await_with_cmds<F, T>(&mut self, fut: F) -> ControlFlow<ExecutionResponse, T>
    where
        F: Future<Output = T>,
    {
        tokio::pin!(fut);
        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    self.state.finish(TaskStatus::Cancelled);
                    return ControlFlow::Break(self.finalize(None).await);
                }
                Some(cmd) = self.cmd_rx.recv() => self.service_stray_command(cmd),
                out = &mut fut => {
                    return ControlFlow::Continue(out);
                }
            }
        }
    }

    async fn finish_denied(&mut self, mut calls: Vec<ToolCall>, reason: Option<String>) -> ExecutionResponse {
        for call in &mut calls {
            call.mark_denied(reason.clone());
            self.state.push_message(Message::tool_result(call.id.clone(), call.llm_visible_text()));
        }
        self.state.record_tool_calls(&calls);
        self.state.pending_approvals.clear();
        // Distinct from `Failed`: a human declining to authorize an action
        // is a recoverable, non-system-error outcome (DESIGN.md Open
        // Question resolution).
        self.state.finish(TaskStatus::CancelledByUser);
        self.finalize(Some("tool execution denied by approver".to_string())).await
    }

    async fn finish_approval_timeout(&mut self, mut calls: Vec<ToolCall>) -> ExecutionResponse {
        for call in &mut calls {
            call.mark_failed("approval timed out".to_string());
            self.state.push_message(Message::tool_result(call.id.clone(), call.llm_visible_text()));
        }
        self.state.record_tool_calls(&calls);
        self.state.pending_approvals.clear();
        self.state.finish(TaskStatus::Failed);
        self.finalize(Some("approval timed out waiting for tool-approval signal".to_string())).await
    }

    async fn publish_status(&self) {
        let data = serde_json::json!({
            "status": status_label(self.state.status),
            "pending_approvals": self.state.pending_approvals.len(),
        });
        activities::publish_event(&self.deps.bus, A2AEvent::status_update(self.state.task_id.clone(), data)).await;
    }

    async fn finalize(&mut self, error: Option<String>) -> ExecutionResponse {
        let data = serde_json::json!({
            "status": status_label(self.state.status),
            "error": error,
        });
        activities::publish_event(&self.deps.bus, A2AEvent::status_update(self.state.task_id.clone(), data)).await;
        let _ = self.deps.state_store.save(&self.state).await;

        ExecutionResponse {
            task_id: self.state.task_id.clone(),
            status: self.state.status,
            result: self.state.extract_result(),
            iterations: self.state.current_iteration,
            token_usage: self.state.token_usage,
            duration_ms: u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX),
            error,
        }
    }
}

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Submitted => "submitted",
        TaskStatus::Working => "working",
        TaskStatus::InputRequired => "input_required",
        TaskStatus::AuthRequired => "auth_required",
        TaskStatus::Completed => "completed",
        TaskStatus::Failed => "failed",
        TaskStatus::Cancelled => "cancelled",
        TaskStatus::CancelledByUser => "cancelled_by_user",
    }
}

/// Reassembles tool-dispatch results into the order of `original_order`'s
/// tool-call ids, regardless of the order the futures actually completed
/// in (spec §4.1 step 6, §5 "Parallel tool results are reassembled").
fn reorder_results(original_order: &[ToolCall], mut completed: HashMap<String, ToolCall>) -> Vec<ToolCall> {
    original_order
        .iter()
        .map(|call| {
            completed.remove(&call.id).unwrap_or_else(|| {
                let mut missing = call.clone();
                missing.mark_failed("tool result missing".to_string());
                missing
            })
        })
        .collect()
}
