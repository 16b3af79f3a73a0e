use std::time::Duration;

/// Tunables for the agent loop that spec.md §6 lists under
/// `executor.*`/timeouts but that are wired per-run here rather than
/// globally, so a single process can run loops under different policies.
#[derive(Debug, Clone, Copy)]
pub struct AgentLoopConfig {
    /// Start-to-close timeout for one `InvokeLLM`/`ExecuteTool` activity
    /// call (spec §4.1 step 2/6). Default 5 minutes.
    pub activity_timeout: Duration,
    /// How long the HITL selector waits for an `approve_tool_execution`
    /// signal before the timer arm wins (spec §4.1 step 5). Default 5
    /// minutes.
    pub approval_timeout: Duration,
    /// Upper bound on tool calls dispatched concurrently within one
    /// iteration (spec §5: `max_concurrent_activities`, default 100).
    pub max_concurrent_activities: usize,
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self {
            activity_timeout: Duration::from_secs(300),
            approval_timeout: Duration::from_secs(300),
            max_concurrent_activities: 100,
        }
    }
}
