use std::sync::Arc;

use agentflow_executor::ExecutorService;

/// Shared axum handler state: one executor façade per process.
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<ExecutorService>,
}

impl AppState {
    #[must_use]
    pub fn new(executor: Arc<ExecutorService>) -> Self {
        Self { executor }
    }
}
