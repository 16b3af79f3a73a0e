use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum A2AEventType {
    StatusUpdate,
    ArtifactUpdate,
    Message,
}

/// The internal event shape fanned out over the event bus and, on the A2A
/// boundary, translated into `TaskStatusUpdate`/`TaskArtifactUpdate`.
/// Ordering for a given `task_id` is delivery-order-preserving (spec §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct A2AEvent {
    pub task_id: String,
    pub event_type: A2AEventType,
    pub timestamp: DateTime<Utc>,
    pub data: Value,
}

impl A2AEvent {
    #[must_use]
    pub fn status_update(task_id: impl Into<String>, data: Value) -> Self {
        Self {
            task_id: task_id.into(),
            event_type: A2AEventType::StatusUpdate,
            timestamp: Utc::now(),
            data,
        }
    }

    #[must_use]
    pub fn artifact_update(task_id: impl Into<String>, data: Value) -> Self {
        Self {
            task_id: task_id.into(),
            event_type: A2AEventType::ArtifactUpdate,
            timestamp: Utc::now(),
            data,
        }
    }

    #[must_use]
    pub fn message(task_id: impl Into<String>, data: Value) -> Self {
        Self {
            task_id: task_id.into(),
            event_type: A2AEventType::Message,
            timestamp: Utc::now(),
            data,
        }
    }
}
