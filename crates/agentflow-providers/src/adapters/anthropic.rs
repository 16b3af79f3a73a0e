use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use agentflow_core::{Message, Role, Tool, ToolCall, ToolCallStatus, TokenUsage};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{ChatRequest, ChatResponse, FinishReason, Provider};

/// Adapter for Anthropic's Messages API. Demonstrates the remaining
/// message-role mapping rules the OpenAI adapter didn't need: the system
/// message travels out-of-band as a top-level `system` field rather than
/// inside the message list, an assistant tool-call message becomes a
/// `{text-block?, tool-use-block*}` content array, and a `tool` message
/// becomes a `user`-role message wrapping a `tool_result` block keyed by
/// `tool_use_id`.
pub struct AnthropicProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    models: Vec<String>,
}

impl AnthropicProvider {
    #[must_use]
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, models: Vec<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            models,
        }
    }

    fn split_system(messages: &[Message]) -> (Option<String>, Vec<&Message>) {
        let mut system = None;
        let mut rest = Vec::with_capacity(messages.len());
        for m in messages {
            match m.role {
                Role::System => system = Some(m.content.clone()),
                _ => rest.push(m),
            }
        }
        (system, rest)
    }

    fn wire_messages(messages: &[&Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|m| match m.role {
                Role::Assistant => {
                    let mut blocks = Vec::new();
                    if !m.content.is_empty() {
                        blocks.push(json!({ "type": "text", "text": m.content }));
                    }
                    for call in m.tool_calls.iter().flatten() {
                        blocks.push(json!({
                            "type": "tool_use",
                            "id": call.id,
                            "name": call.name,
                            "input": call.arguments,
                        }));
                    }
                    json!({ "role": "assistant", "content": blocks })
                }
                Role::Tool => {
                    json!({
                        "role": "user",
                        "content": [{
                            "type": "tool_result",
                            "tool_use_id": m.tool_call_id,
                            "content": m.content,
                        }],
                    })
                }
                Role::User => json!({ "role": "user", "content": m.content }),
                Role::System => unreachable!("system messages are split out before this point"),
            })
            .collect()
    }

    fn wire_tools(tools: &[Tool]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "input_schema": t.parameters,
                })
            })
            .collect()
    }
}

#[derive(Debug, serde::Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
    model: String,
}

#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
}

#[derive(Debug, serde::Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

fn map_stop_reason(raw: Option<&str>) -> FinishReason {
    match raw {
        Some("end_turn") | Some("stop_sequence") => FinishReason::Stop,
        Some("tool_use") => FinishReason::ToolCalls,
        Some("max_tokens") => FinishReason::Length,
        Some(other) => FinishReason::Other(other.to_string()),
        None => FinishReason::Other("unknown".to_string()),
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn supported_models(&self) -> Vec<String> {
        self.models.clone()
    }

    async fn chat(&self, request: ChatRequest) -> ProviderResult<ChatResponse> {
        let (system, rest) = Self::split_system(&request.messages);
        let mut body = json!({
            "model": request.model_config.model,
            "messages": Self::wire_messages(&rest),
            "tools": Self::wire_tools(&request.tools),
            "max_tokens": request.model_config.max_tokens.unwrap_or(4096),
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }
        if let Some(temperature) = request.model_config.temperature {
            body["temperature"] = json!(temperature);
        }

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Permanent(format!("anthropic {status}: {body}")));
        }
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Transient(format!("anthropic {status}: {body}")));
        }

        let parsed: MessagesResponse = response.json().await.map_err(ProviderError::from)?;

        let mut content = String::new();
        let mut tool_calls = Vec::new();
        for block in parsed.content {
            match block {
                ContentBlock::Text { text } => content.push_str(&text),
                ContentBlock::ToolUse { id, name, input } => {
                    let mut call = ToolCall::requested(id, name, input);
                    call.status = ToolCallStatus::Pending;
                    tool_calls.push(call);
                }
            }
        }

        Ok(ChatResponse {
            content,
            tool_calls,
            finish_reason: map_stop_reason(parsed.stop_reason.as_deref()),
            token_usage: TokenUsage::new(parsed.usage.input_tokens, parsed.usage.output_tokens),
            model_used: parsed.model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_message_splits_out_of_band() {
        let messages = vec![Message::system("be terse"), Message::user("hi")];
        let (system, rest) = AnthropicProvider::split_system(&messages);
        assert_eq!(system.as_deref(), Some("be terse"));
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].role, Role::User);
    }

    #[test]
    fn assistant_tool_calls_become_tool_use_blocks() {
        let call = ToolCall::requested("call-1", "get_weather", json!({"city": "NYC"}));
        let message = Message::assistant("", vec![call]);
        let wire = AnthropicProvider::wire_messages(&[&message]);
        let content = &wire[0]["content"];
        assert_eq!(content[0]["type"], "tool_use");
        assert_eq!(content[0]["id"], "call-1");
        assert_eq!(content[0]["name"], "get_weather");
    }

    #[test]
    fn tool_result_message_becomes_a_user_turn() {
        let message = Message::tool_result("call-1", "72F");
        let wire = AnthropicProvider::wire_messages(&[&message]);
        assert_eq!(wire[0]["role"], "user");
        assert_eq!(wire[0]["content"][0]["type"], "tool_result");
        assert_eq!(wire[0]["content"][0]["tool_use_id"], "call-1");
    }

    #[test]
    fn parses_tool_use_blocks_into_tool_calls() {
        let raw = r#"{
            "content": [
                { "type": "text", "text": "let me check" },
                { "type": "tool_use", "id": "call-1", "name": "get_weather", "input": { "city": "NYC" } }
            ],
            "stop_reason": "tool_use",
            "usage": { "input_tokens": 10, "output_tokens": 5 },
            "model": "claude-3-opus"
        }"#;
        let parsed: MessagesResponse = serde_json::from_str(raw).unwrap();
        let tool_uses: Vec<_> = parsed
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, .. } => Some((id.clone(), name.clone())),
                ContentBlock::Text { .. } => None,
            })
            .collect();
        assert_eq!(tool_uses, vec![("call-1".to_string(), "get_weather".to_string())]);
        assert_eq!(map_stop_reason(parsed.stop_reason.as_deref()), FinishReason::ToolCalls);
    }
}
