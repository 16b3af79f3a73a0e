use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a [`Tool`] is actually invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolType {
    Http,
    Mcp,
    Builtin,
}

/// Backend-specific wiring for a tool. Exactly the fields the dispatcher of
/// each [`ToolType`] needs; unused fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub mcp_server: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// A single capability offered to the model: name, description, a JSON
/// Schema describing its arguments, and how to execute it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub parameters: Value,
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    #[serde(default)]
    pub config: ToolConfig,
}

impl Tool {
    #[must_use]
    pub fn builtin(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            tool_type: ToolType::Builtin,
            config: ToolConfig::default(),
        }
    }
}

/// Lifecycle of one LLM-requested invocation of a [`Tool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Pending,
    Approved,
    Denied,
    Executing,
    Completed,
    Failed,
}

/// One LLM-assigned tool invocation. `id` is unique within the iteration
/// that produced it and is the join key used to pair the eventual `tool`
/// message back to the assistant message that requested it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
    pub status: ToolCallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ToolCall {
    #[must_use]
    pub fn requested(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
            status: ToolCallStatus::Pending,
            result: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn mark_completed(&mut self, result: String) {
        self.status = ToolCallStatus::Completed;
        self.result = Some(result);
        self.error = None;
    }

    pub fn mark_failed(&mut self, error: String) {
        self.status = ToolCallStatus::Failed;
        self.error = Some(error);
        self.result = None;
    }

    pub fn mark_denied(&mut self, reason: Option<String>) {
        self.status = ToolCallStatus::Denied;
        self.error = Some(reason.unwrap_or_else(|| "denied by user".to_string()));
    }

    /// Text surfaced back to the LLM inside the paired `tool` message.
    #[must_use]
    pub fn llm_visible_text(&self) -> String {
        match (&self.result, &self.error) {
            (Some(result), _) => result.clone(),
            (None, Some(error)) => error.clone(),
            (None, None) => String::new(),
        }
    }
}
