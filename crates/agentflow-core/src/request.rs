use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::tool::Tool;

fn default_max_iterations() -> u32 {
    10
}

fn default_timeout() -> Duration {
    Duration::from_secs(300)
}

/// LLM capability selection and sampling parameters for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl ModelConfig {
    #[must_use]
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
            top_p: None,
            api_key: None,
            endpoint: None,
        }
    }
}

/// The input contract for one agent-loop run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub task_id: String,
    pub session_id: String,
    pub user_id: String,

    pub user_message: String,
    #[serde(default)]
    pub system_message: Option<String>,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_timeout", with = "humantime_duration")]
    pub timeout: Duration,
    #[serde(default)]
    pub require_approval: bool,

    #[serde(default)]
    pub tools: Vec<Tool>,
    pub model_config: ModelConfig,

    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl ExecutionRequest {
    /// Validate the request's own invariants — independent of any
    /// runtime/workflow concern. Does not check tool/provider existence.
    pub fn validate(&self) -> CoreResult<()> {
        if self.task_id.trim().is_empty() {
            return Err(CoreError::InvalidRequest("task_id must not be empty".into()));
        }
        if self.max_iterations == 0 {
            return Err(CoreError::InvalidRequest("max_iterations must be >= 1".into()));
        }
        if self.user_message.trim().is_empty() {
            return Err(CoreError::InvalidRequest("user_message must not be empty".into()));
        }
        Ok(())
    }
}

/// `serde_with`-style helper so `Duration` round-trips through JSON/TOML as
/// whole seconds instead of the serde-default nested struct.
mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
