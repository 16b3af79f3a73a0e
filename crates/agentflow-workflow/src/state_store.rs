use async_trait::async_trait;

use agentflow_core::ExecutionState;

use crate::error::WorkflowResult;

/// Optional external persistence for `ExecutionState` (spec §4.2:
/// `SaveState`/`LoadState`). The agent loop works correctly without one —
/// its own in-process actor state is the durable record for this build —
/// but a deployment that wants an append-only external audit log of every
/// checkpoint can supply one, keyed by `task_id`.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save(&self, state: &ExecutionState) -> WorkflowResult<()>;
    async fn load(&self, task_id: &str) -> WorkflowResult<Option<ExecutionState>>;
}

/// The default: the workflow's own actor state is authoritative, so
/// persistence is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStateStore;

#[async_trait]
impl StateStore for NullStateStore {
    async fn save(&self, _state: &ExecutionState) -> WorkflowResult<()> {
        Ok(())
    }

    async fn load(&self, _task_id: &str) -> WorkflowResult<Option<ExecutionState>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn null_store_never_remembers_anything() {
        let store = NullStateStore;
        let state = ExecutionState::new("t1", 5, HashMap::new());
        store.save(&state).await.unwrap();
        assert!(store.load("t1").await.unwrap().is_none());
    }
}
