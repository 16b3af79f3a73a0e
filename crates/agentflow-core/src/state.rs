use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::Message;
use crate::tool::ToolCall;
use crate::usage::TokenUsage;

/// Status of a run. `CancelledByUser` is a deliberate addition beyond the
/// minimal spec set: a human declining to authorize a tool call is a
/// distinct, non-failure outcome from `Failed` (see DESIGN.md's Open
/// Question resolution).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Submitted,
    Working,
    InputRequired,
    AuthRequired,
    Completed,
    Failed,
    Cancelled,
    CancelledByUser,
}

impl TaskStatus {
    /// Terminal statuses imply `continue_execution = false` (invariant 4).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled | TaskStatus::CancelledByUser
        )
    }
}

/// The single durable object a running workflow owns. Mutated only by the
/// workflow coordinator; activities receive copies and return deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionState {
    pub task_id: String,
    pub messages: Vec<Message>,
    pub tool_calls: Vec<ToolCall>,
    pub pending_approvals: Vec<ToolCall>,
    pub current_iteration: u32,
    pub max_iterations: u32,
    pub continue_execution: bool,
    pub status: TaskStatus,
    pub token_usage: TokenUsage,
    pub last_llm_response: Option<String>,
    pub execution_start_time: DateTime<Utc>,
    pub metadata: HashMap<String, Value>,
}

impl ExecutionState {
    #[must_use]
    pub fn new(task_id: impl Into<String>, max_iterations: u32, metadata: HashMap<String, Value>) -> Self {
        Self {
            task_id: task_id.into(),
            messages: Vec::new(),
            tool_calls: Vec::new(),
            pending_approvals: Vec::new(),
            current_iteration: 0,
            max_iterations,
            continue_execution: true,
            status: TaskStatus::Submitted,
            token_usage: TokenUsage::default(),
            last_llm_response: None,
            execution_start_time: Utc::now(),
            metadata,
        }
    }

    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn record_tool_calls(&mut self, calls: &[ToolCall]) {
        self.tool_calls.extend_from_slice(calls);
    }

    /// Set a terminal status and keep invariant 4 (`continue_execution`)
    /// consistent with it in one place.
    pub fn finish(&mut self, status: TaskStatus) {
        self.continue_execution = !status.is_terminal();
        self.status = status;
    }

    /// Invariant 1: once working, at least one message exists and the first
    /// non-system message is `user`.
    #[must_use]
    pub fn first_non_system_is_user(&self) -> bool {
        self.messages
            .iter()
            .find(|m| m.role != crate::message::Role::System)
            .is_none_or(|m| m.role == crate::message::Role::User)
    }

    /// The result string returned to the caller: content of the most recent
    /// `assistant` message, or empty if none exists.
    #[must_use]
    pub fn extract_result(&self) -> String {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == crate::message::Role::Assistant)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

/// The outcome handed back to whoever started the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResponse {
    pub task_id: String,
    pub status: TaskStatus,
    pub result: String,
    pub iterations: u32,
    pub token_usage: TokenUsage,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_result_is_last_assistant_message() {
        let mut state = ExecutionState::new("t1", 5, HashMap::new());
        state.push_message(Message::user("hi"));
        state.push_message(Message::assistant("first", vec![]));
        state.push_message(Message::assistant("second", vec![]));
        assert_eq!(state.extract_result(), "second");
    }

    #[test]
    fn extract_result_empty_when_no_assistant_message() {
        let state = ExecutionState::new("t1", 5, HashMap::new());
        assert_eq!(state.extract_result(), "");
    }

    #[test]
    fn finish_clears_continue_execution_for_terminal_status() {
        let mut state = ExecutionState::new("t1", 5, HashMap::new());
        state.finish(TaskStatus::Completed);
        assert!(!state.continue_execution);
        assert_eq!(state.status, TaskStatus::Completed);
    }
}
