use std::collections::HashMap;

use agentflow_core::{A2AEvent, A2AEventType, ExecutionRequest, ModelConfig, TaskStatus, Tool};
use serde_json::Value;

use crate::protocol::{A2aMessage, A2aStreamEvent, MessagePart, MessageSendParams, TaskArtifactUpdate, TaskStatusUpdate};

/// Provider/model applied when an inbound message's metadata omits
/// `model_config`.
pub const DEFAULT_PROVIDER: &str = "anthropic";
pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-20250219";

fn concatenated_text(message: &A2aMessage) -> String {
    message
        .parts
        .iter()
        .filter_map(|part| match part {
            MessagePart::Text { text } => Some(text.as_str()),
            MessagePart::Data { .. } => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn take_override<T: serde::de::DeserializeOwned>(metadata: &mut HashMap<String, Value>, key: &str) -> Option<T> {
    metadata.remove(key).and_then(|value| serde_json::from_value(value).ok())
}

/// Translate an inbound A2A request into the executor's native
/// `ExecutionRequest` (spec §4.8): user_id from the message's auth
/// context falling back to context_id, session_id falling back to
/// task_id, user_message as the concatenated text parts.
#[must_use]
pub fn to_execution_request(params: MessageSendParams) -> ExecutionRequest {
    let MessageSendParams { task_id, context_id, message, mut metadata } = params;

    let user_id = message
        .auth
        .as_ref()
        .and_then(|auth| auth.user_id.clone())
        .or_else(|| context_id.clone())
        .unwrap_or_else(|| "anonymous".to_string());

    let task_id = task_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let session_id = context_id.unwrap_or_else(|| task_id.clone());
    let user_message = concatenated_text(&message);

    let system_message = take_override::<String>(&mut metadata, "system_message");
    let max_iterations = take_override::<u32>(&mut metadata, "max_iterations").unwrap_or(10);
    let require_approval = take_override::<bool>(&mut metadata, "require_approval").unwrap_or(false);
    let tools = take_override::<Vec<Tool>>(&mut metadata, "tools").unwrap_or_default();
    let model_config = take_override::<ModelConfig>(&mut metadata, "model_config")
        .unwrap_or_else(|| ModelConfig::new(DEFAULT_PROVIDER, DEFAULT_MODEL));

    ExecutionRequest {
        task_id,
        session_id,
        user_id,
        user_message,
        system_message,
        max_iterations,
        timeout: std::time::Duration::from_secs(300),
        require_approval,
        tools,
        model_config,
        metadata,
    }
}

fn status_from_data(data: &Value) -> TaskStatus {
    data.get("status")
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or(TaskStatus::Working)
}

/// Translate an internal event into its A2A wire shape (spec §4.8). A
/// `Message` event folds into a status update carrying the message body,
/// since the A2A surface only exposes the two update kinds.
#[must_use]
pub fn to_stream_event(event: &A2AEvent) -> A2aStreamEvent {
    match event.event_type {
        A2AEventType::StatusUpdate => A2aStreamEvent::Status(TaskStatusUpdate {
            task_id: event.task_id.clone(),
            status: status_from_data(&event.data),
            message: None,
            metadata: event.data.clone(),
        }),
        A2AEventType::Message => A2aStreamEvent::Status(TaskStatusUpdate {
            task_id: event.task_id.clone(),
            status: status_from_data(&event.data),
            message: Some(event.data.clone()),
            metadata: Value::Null,
        }),
        A2AEventType::ArtifactUpdate => A2aStreamEvent::Artifact(TaskArtifactUpdate {
            task_id: event.task_id.clone(),
            artifact_id: event
                .data
                .get("artifact_id")
                .and_then(Value::as_str)
                .unwrap_or("artifact")
                .to_string(),
            content: event.data.get("content").cloned().unwrap_or_else(|| event.data.clone()),
            content_type: event
                .data
                .get("content_type")
                .and_then(Value::as_str)
                .unwrap_or("text/plain")
                .to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::AuthContext;
    use serde_json::json;

    #[test]
    fn user_id_falls_back_to_context_id_then_anonymous() {
        let params = MessageSendParams {
            task_id: Some("t1".to_string()),
            context_id: Some("ctx-1".to_string()),
            message: A2aMessage { role: "user".to_string(), parts: vec![MessagePart::Text { text: "hi".to_string() }], auth: None },
            metadata: HashMap::new(),
        };
        let request = to_execution_request(params);
        assert_eq!(request.user_id, "ctx-1");
        assert_eq!(request.session_id, "ctx-1");
        assert_eq!(request.user_message, "hi");
    }

    #[test]
    fn auth_user_id_wins_over_context_id() {
        let params = MessageSendParams {
            task_id: None,
            context_id: Some("ctx-1".to_string()),
            message: A2aMessage {
                role: "user".to_string(),
                parts: vec![MessagePart::Text { text: "hi".to_string() }],
                auth: Some(AuthContext { user_id: Some("u-42".to_string()) }),
            },
            metadata: HashMap::new(),
        };
        let request = to_execution_request(params);
        assert_eq!(request.user_id, "u-42");
    }

    #[test]
    fn text_parts_are_concatenated_in_order() {
        let params = MessageSendParams {
            task_id: Some("t1".to_string()),
            context_id: None,
            message: A2aMessage {
                role: "user".to_string(),
                parts: vec![
                    MessagePart::Text { text: "first".to_string() },
                    MessagePart::Data { data: json!({"ignored": true}) },
                    MessagePart::Text { text: "second".to_string() },
                ],
                auth: None,
            },
            metadata: HashMap::new(),
        };
        let request = to_execution_request(params);
        assert_eq!(request.user_message, "first\nsecond");
    }

    #[test]
    fn metadata_overrides_are_applied_and_consumed() {
        let mut metadata = HashMap::new();
        metadata.insert("max_iterations".to_string(), json!(3));
        metadata.insert("require_approval".to_string(), json!(true));
        metadata.insert("note".to_string(), json!("kept"));

        let params = MessageSendParams {
            task_id: Some("t1".to_string()),
            context_id: Some("ctx-1".to_string()),
            message: A2aMessage { role: "user".to_string(), parts: vec![], auth: None },
            metadata,
        };
        let request = to_execution_request(params);
        assert_eq!(request.max_iterations, 3);
        assert!(request.require_approval);
        assert_eq!(request.model_config.provider, DEFAULT_PROVIDER);
        // Non-override keys pass through into the request's own metadata.
        assert_eq!(request.metadata.get("note"), Some(&json!("kept")));
        assert!(!request.metadata.contains_key("max_iterations"));
    }

    #[test]
    fn status_update_event_translates_to_a_status_update() {
        let event = A2AEvent::status_update("t1", json!({"status": "completed"}));
        let A2aStreamEvent::Status(update) = to_stream_event(&event) else {
            unreachable!("status_update must translate to a status update");
        };
        assert_eq!(update.task_id, "t1");
        assert_eq!(update.status, TaskStatus::Completed);
    }

    #[test]
    fn artifact_update_event_translates_to_an_artifact_update() {
        let event = A2AEvent::artifact_update(
            "t1",
            json!({"artifact_id": "a1", "content": "result text", "content_type": "text/plain"}),
        );
        let A2aStreamEvent::Artifact(update) = to_stream_event(&event) else {
            unreachable!("artifact_update must translate to an artifact update");
        };
        assert_eq!(update.artifact_id, "a1");
        assert_eq!(update.content, json!("result text"));
    }
}
