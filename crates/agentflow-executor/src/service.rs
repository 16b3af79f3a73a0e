use std::collections::HashMap;
use std::sync::Arc;

use agentflow_bus::{EventBus, EventSubscription};
use agentflow_core::{ExecutionRequest, ExecutionResponse, ExecutionState};
use agentflow_providers::ProviderRegistry;
use agentflow_tools::ToolDispatcher;
use agentflow_workflow::{spawn_agent_loop, AgentLoopConfig, AgentLoopDeps, AgentLoopHandle, StateStore};
use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::error::{ExecutorError, ExecutorResult};
use crate::query::QueryType;

/// The process-wide façade over the agent loop (spec §4.7): starts,
/// cancels, signals, and queries workflows by `task_id`, enforcing that
/// at most one loop runs under a given id at a time.
///
/// An id-keyed table of handles guarding a background actor, without LRU
/// eviction: a finished loop's entry is simply replaced the next time its
/// id is reused, since `ExecutionState` durability is the `StateStore`'s
/// job, not this table's.
pub struct ExecutorService {
    providers: Arc<ProviderRegistry>,
    tools: Arc<ToolDispatcher>,
    bus: EventBus,
    state_store: Arc<dyn StateStore>,
    config: AgentLoopConfig,
    running: RwLock<HashMap<String, Arc<AgentLoopHandle>>>,
    completed: Arc<RwLock<HashMap<String, ExecutionResponse>>>,
}

impl ExecutorService {
    pub fn new(
        providers: Arc<ProviderRegistry>,
        tools: Arc<ToolDispatcher>,
        bus: EventBus,
        state_store: Arc<dyn StateStore>,
        config: AgentLoopConfig,
    ) -> Self {
        Self {
            providers,
            tools,
            bus,
            state_store,
            config,
            running: RwLock::new(HashMap::new()),
            completed: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start a workflow and block until it reaches a terminal status
    /// (spec §4.7 `execute`).
    #[instrument(skip(self, request), fields(task_id = %request.task_id))]
    pub async fn execute(&self, request: ExecutionRequest) -> ExecutorResult<ExecutionResponse> {
        let task_id = request.task_id.clone();
        let handle = self.start(request).await?;
        let response = handle.join().await?;
        self.completed.write().await.insert(task_id, response.clone());
        Ok(response)
    }

    /// Start a workflow and return immediately with a handle the caller
    /// can poll, signal, or await later (spec §4.7 `execute_async`). The
    /// service itself reaps the handle's eventual result in the
    /// background, so `status`/`/api/v1/status` sees the terminal
    /// response even if nothing else ever calls `handle.join()`.
    #[instrument(skip(self, request), fields(task_id = %request.task_id))]
    pub async fn execute_async(&self, request: ExecutionRequest) -> ExecutorResult<Arc<AgentLoopHandle>> {
        let task_id = request.task_id.clone();
        let handle = self.start(request).await?;
        let reap_handle = Arc::clone(&handle);
        let completed = Arc::clone(&self.completed);
        tokio::spawn(async move {
            if let Ok(response) = reap_handle.join().await {
                completed.write().await.insert(task_id, response);
            }
        });
        Ok(handle)
    }

    async fn start(&self, request: ExecutionRequest) -> ExecutorResult<Arc<AgentLoopHandle>> {
        request.validate().map_err(ExecutorError::InvalidRequest)?;
        let task_id = request.task_id.clone();

        let mut running = self.running.write().await;
        if let Some(existing) = running.get(&task_id) {
            if !existing.is_finished() {
                return Err(ExecutorError::AlreadyRunning(task_id));
            }
        }

        let deps = AgentLoopDeps {
            providers: Arc::clone(&self.providers),
            tools: Arc::clone(&self.tools),
            bus: self.bus.clone(),
            state_store: Arc::clone(&self.state_store),
            config: self.config,
        };
        info!("starting workflow");
        let handle = Arc::new(spawn_agent_loop(request, deps));
        running.insert(task_id, Arc::clone(&handle));
        Ok(handle)
    }

    /// Request cooperative cancellation of a running workflow (spec
    /// §4.7 `cancel`).
    pub async fn cancel(&self, task_id: &str) -> ExecutorResult<()> {
        self.handle(task_id).await?.cancel();
        Ok(())
    }

    /// Resolve the HITL approval gate for a paused workflow (spec §4.7
    /// `approve_tool_execution`).
    pub async fn approve_tool_execution(
        &self,
        task_id: &str,
        approved: bool,
        reason: Option<String>,
    ) -> ExecutorResult<()> {
        self.handle(task_id)
            .await?
            .approve_tool_execution(approved, reason)
            .await?;
        Ok(())
    }

    /// Read-only query of an in-flight workflow's state (spec §4.7
    /// `query`).
    pub async fn query(&self, task_id: &str, query_type: QueryType) -> ExecutorResult<ExecutionState> {
        let state = self.handle(task_id).await?.query().await?;
        match query_type {
            QueryType::State => Ok(state),
        }
    }

    /// `ExecutionResponse` snapshot for `/api/v1/status` (spec §6): the
    /// cached terminal response once the workflow has finished, or a
    /// response synthesized from the live `ExecutionState` while it is
    /// still running.
    pub async fn status(&self, task_id: &str) -> ExecutorResult<ExecutionResponse> {
        if let Some(response) = self.completed.read().await.get(task_id).cloned() {
            return Ok(response);
        }
        let state = self.query(task_id, QueryType::State).await?;
        Ok(ExecutionResponse {
            task_id: state.task_id.clone(),
            status: state.status,
            result: state.extract_result(),
            iterations: state.current_iteration,
            token_usage: state.token_usage,
            duration_ms: 0,
            error: None,
        })
    }

    /// Subscribe to the event fan-out for a task (spec §4.6). Callers
    /// that need idle keep-alives should wrap the subscription
    /// themselves; this returns the raw per-task stream.
    pub fn stream_events(&self, task_id: &str) -> EventSubscription {
        self.bus.subscribe(task_id)
    }

    async fn handle(&self, task_id: &str) -> ExecutorResult<Arc<AgentLoopHandle>> {
        self.running
            .read()
            .await
            .get(task_id)
            .cloned()
            .ok_or_else(|| ExecutorError::NotFound(task_id.to_string()))
    }
}
