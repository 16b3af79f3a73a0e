use std::collections::HashMap;

use agentflow_core::TaskStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One part of an A2A message body. Only the shapes the bridge actually
/// reads (§4.8: "concatenated text parts") are modeled; unrecognized parts
/// round-trip through `Data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessagePart {
    Text { text: String },
    Data { data: Value },
}

/// The authentication context a gateway attaches to an inbound message.
/// §4.8 reads `user_id` from here before falling back to `context_id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthContext {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct A2aMessage {
    pub role: String,
    pub parts: Vec<MessagePart>,
    #[serde(default)]
    pub auth: Option<AuthContext>,
}

/// The inbound A2A request body for `/a2a/message` and `/a2a/stream`
/// (spec §4.8). `metadata` may override `system_message`,
/// `max_iterations`, `require_approval`, `model_config`, and `tools` on
/// the resulting `ExecutionRequest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSendParams {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub context_id: Option<String>,
    pub message: A2aMessage,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

/// Outbound translation of an internal status-carrying `A2AEvent` (spec
/// §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusUpdate {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
    #[serde(default)]
    pub metadata: Value,
}

/// Outbound translation of an internal artifact-carrying `A2AEvent` (spec
/// §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskArtifactUpdate {
    pub task_id: String,
    pub artifact_id: String,
    pub content: Value,
    pub content_type: String,
}

/// Either outbound shape an internal event translates into; carried as
/// the `data` payload of one SSE `event: message` frame (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum A2aStreamEvent {
    Status(TaskStatusUpdate),
    Artifact(TaskArtifactUpdate),
}
