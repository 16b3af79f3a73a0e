use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use serde_json::Value;

use crate::error::ToolDispatchError;

/// A named, in-process tool primitive. Kept small and closed, matching the
/// spec's "builtin: named primitives" contract — new builtins are added
/// here, not discovered dynamically.
#[async_trait]
pub trait BuiltinTool: Send + Sync {
    async fn call(&self, arguments: &Value) -> Result<String, ToolDispatchError>;
}

struct GetCurrentTime;

#[async_trait]
impl BuiltinTool for GetCurrentTime {
    async fn call(&self, _arguments: &Value) -> Result<String, ToolDispatchError> {
        Ok(Utc::now().to_rfc3339())
    }
}

struct GetRandomNumber;

#[async_trait]
impl BuiltinTool for GetRandomNumber {
    async fn call(&self, arguments: &Value) -> Result<String, ToolDispatchError> {
        let min = arguments.get("min").and_then(Value::as_i64).unwrap_or(0);
        let max = arguments.get("max").and_then(Value::as_i64).unwrap_or(100);
        let (low, high) = if min <= max { (min, max) } else { (max, min) };
        let value = rand::thread_rng().gen_range(low..=high);
        Ok(value.to_string())
    }
}

/// Name → implementation map for builtin tools. Unknown names are an
/// explicit error, never a silent no-op.
pub struct BuiltinRegistry {
    tools: HashMap<String, Box<dyn BuiltinTool>>,
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        let mut tools: HashMap<String, Box<dyn BuiltinTool>> = HashMap::new();
        tools.insert("get_current_time".to_string(), Box::new(GetCurrentTime));
        tools.insert("get_random_number".to_string(), Box::new(GetRandomNumber));
        Self { tools }
    }
}

impl BuiltinRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, tool: Box<dyn BuiltinTool>) {
        self.tools.insert(name.into(), tool);
    }

    pub async fn call(&self, name: &str, arguments: &Value) -> Result<String, ToolDispatchError> {
        match self.tools.get(name) {
            Some(tool) => tool.call(arguments).await,
            None => Err(ToolDispatchError::UnknownBuiltin(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn get_current_time_returns_rfc3339() {
        let registry = BuiltinRegistry::new();
        let result = registry.call("get_current_time", &Value::Null).await.unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&result).is_ok());
    }

    #[tokio::test]
    async fn get_random_number_respects_bounds() {
        let registry = BuiltinRegistry::new();
        let result = registry
            .call("get_random_number", &json!({ "min": 5, "max": 5 }))
            .await
            .unwrap();
        assert_eq!(result, "5");
    }

    #[tokio::test]
    async fn unknown_builtin_is_an_error() {
        let registry = BuiltinRegistry::new();
        let err = registry.call("does_not_exist", &Value::Null).await.unwrap_err();
        assert!(matches!(err, ToolDispatchError::UnknownBuiltin(_)));
    }
}
