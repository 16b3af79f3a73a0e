use std::time::Duration;

use agentflow_core::{Tool, ToolCall, ToolType};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::builtin::BuiltinRegistry;

const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(300);

/// Executes one [`ToolCall`] against its [`Tool`] definition. This is the
/// `ExecuteTool` activity body (spec §4.2/§4.4): it never returns an
/// `Err` — every failure mode is encoded into the returned call's
/// `status`/`error` so the workflow can thread it back to the model
/// instead of treating it as an activity failure.
pub struct ToolDispatcher {
    http: reqwest::Client,
    builtins: BuiltinRegistry,
    timeout: Duration,
}

impl Default for ToolDispatcher {
    fn default() -> Self {
        Self {
            http: reqwest::Client::new(),
            builtins: BuiltinRegistry::new(),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }
}

impl ToolDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_builtins(mut self, builtins: BuiltinRegistry) -> Self {
        self.builtins = builtins;
        self
    }

    #[instrument(skip(self, tool, cancellation), fields(tool.name = %call.name, tool.id = %call.id))]
    pub async fn execute(&self, mut call: ToolCall, tool: &Tool, cancellation: &CancellationToken) -> ToolCall {
        let outcome = tokio::select! {
            biased;
            () = cancellation.cancelled() => Err("tool call cancelled".to_string()),
            result = tokio::time::timeout(self.timeout, self.run(tool, &call)) => {
                match result {
                    Ok(inner) => inner,
                    Err(_elapsed) => Err(format!("tool call timed out after {:?}", self.timeout)),
                }
            }
        };

        match outcome {
            Ok(text) => call.mark_completed(text),
            Err(error) => call.mark_failed(error),
        }
        call
    }

    async fn run(&self, tool: &Tool, call: &ToolCall) -> Result<String, String> {
        match tool.tool_type {
            ToolType::Builtin => self
                .builtins
                .call(&tool.name, &call.arguments)
                .await
                .map_err(|e| e.to_string()),
            ToolType::Http => self.run_http(tool, call).await,
            ToolType::Mcp => self.run_mcp(tool, call).await,
        }
    }

    async fn run_http(&self, tool: &Tool, call: &ToolCall) -> Result<String, String> {
        let endpoint = tool
            .config
            .endpoint
            .as_ref()
            .ok_or_else(|| format!("tool `{}` is missing config.endpoint", tool.name))?;

        let mut request = self.http.post(endpoint).json(&serde_json::json!({
            "name": call.name,
            "arguments": call.arguments,
        }));
        if let Some(api_key) = &tool.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status.is_client_error() || status.is_server_error() {
            return Err(format!("http tool `{}` returned {status}: {body}", tool.name));
        }
        Ok(body)
    }

    async fn run_mcp(&self, tool: &Tool, _call: &ToolCall) -> Result<String, String> {
        if tool.config.mcp_server.is_none() {
            return Err(format!("tool `{}` is missing config.mcp_server", tool.name));
        }
        // MCP protocol dispatch is an out-of-scope implementation detail
        // (spec §4.4); callers needing it supply their own backend and
        // register it ahead of the dispatcher.
        Err(format!("mcp dispatch for `{}` is not available in this build", tool.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn builtin_tool(name: &str) -> Tool {
        Tool::builtin(name, "test tool", json!({ "type": "object", "properties": {} }))
    }

    #[tokio::test]
    async fn builtin_success_marks_call_completed() {
        let dispatcher = ToolDispatcher::new();
        let call = ToolCall::requested("c1", "get_current_time", Value::Null);
        let tool = builtin_tool("get_current_time");
        let result = dispatcher.execute(call, &tool, &CancellationToken::new()).await;
        assert_eq!(result.status, agentflow_core::ToolCallStatus::Completed);
        assert!(result.result.is_some());
    }

    #[tokio::test]
    async fn unknown_builtin_marks_call_failed_not_err() {
        let dispatcher = ToolDispatcher::new();
        let call = ToolCall::requested("c1", "nonexistent", Value::Null);
        let tool = builtin_tool("nonexistent");
        let result = dispatcher.execute(call, &tool, &CancellationToken::new()).await;
        assert_eq!(result.status, agentflow_core::ToolCallStatus::Failed);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn cancellation_marks_call_failed() {
        let dispatcher = ToolDispatcher::new().with_timeout(Duration::from_secs(5));
        let token = CancellationToken::new();
        token.cancel();
        let call = ToolCall::requested("c1", "get_current_time", Value::Null);
        let tool = builtin_tool("get_current_time");
        let result = dispatcher.execute(call, &tool, &token).await;
        assert_eq!(result.status, agentflow_core::ToolCallStatus::Failed);
    }

    use serde_json::Value;
}
