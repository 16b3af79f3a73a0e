use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use agentflow_core::{Message, Role, Tool, ToolCall, ToolCallStatus, TokenUsage};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{ChatRequest, ChatResponse, FinishReason, Provider};

/// Adapter for OpenAI-compatible chat-completions endpoints. Demonstrates
/// the spec's message-role mapping rules: `system` stays an in-band
/// message (no out-of-band parameter needed for this wire format), and
/// tool calls/results map directly onto `tool_calls`/`tool_call_id` since
/// the OpenAI wire format already matches our internal shape closely.
pub struct OpenAiProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    models: Vec<String>,
}

impl OpenAiProvider {
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

    fn wire_messages(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::Tool => "tool",
                };
                let mut wire = json!({ "role": role, "content": m.content });
                if let Some(id) = &m.tool_call_id {
                    wire["tool_call_id"] = json!(id);
                }
                if let Some(calls) = &m.tool_calls {
                    wire["tool_calls"] = json!(calls
                        .iter()
                        .map(|c| {
                            json!({
                                "id": c.id,
                                "type": "function",
                                "function": { "name": c.name, "arguments": c.arguments.to_string() },
                            })
                        })
                        .collect::<Vec<_>>());
                }
                wire
            })
            .collect()
    }

    fn wire_tools(tools: &[Tool]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    },
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunctionCall,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

fn map_finish_reason(raw: Option<&str>) -> FinishReason {
    match raw {
        Some("stop") => FinishReason::Stop,
        Some("tool_calls") => FinishReason::ToolCalls,
        Some("length") => FinishReason::Length,
        Some(other) => FinishReason::Other(other.to_string()),
        None => FinishReason::Other("unknown".to_string()),
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn supported_models(&self) -> Vec<String> {
        self.models.clone()
    }

    async fn chat(&self, request: ChatRequest) -> ProviderResult<ChatResponse> {
        let body = json!({
            "model": request.model_config.model,
            "messages": Self::wire_messages(&request.messages),
            "tools": Self::wire_tools(&request.tools),
            "temperature": request.model_config.temperature,
            "max_tokens": request.model_config.max_tokens,
            "top_p": request.model_config.top_p,
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Permanent(format!("openai {status}: {body}")));
        }
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Transient(format!("openai {status}: {body}")));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(ProviderError::from)?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Permanent("openai response had no choices".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .into_iter()
            .map(|wire| {
                let arguments: Value = serde_json::from_str(&wire.function.arguments).unwrap_or(Value::Null);
                let mut call = ToolCall::requested(wire.id, wire.function.name, arguments);
                call.status = ToolCallStatus::Pending;
                call
            })
            .collect();

        let usage = parsed
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(ChatResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            finish_reason: map_finish_reason(choice.finish_reason.as_deref()),
            token_usage: usage,
            model_used: parsed.model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_role_maps_to_its_wire_name() {
        let messages = vec![
            Message::system("be terse"),
            Message::user("hi"),
            Message::assistant("hello", vec![]),
            Message::tool_result("call-1", "72F"),
        ];
        let wire = OpenAiProvider::wire_messages(&messages);
        assert_eq!(wire[0]["role"], "system");
        assert_eq!(wire[1]["role"], "user");
        assert_eq!(wire[2]["role"], "assistant");
        assert_eq!(wire[3]["role"], "tool");
        assert_eq!(wire[3]["tool_call_id"], "call-1");
    }

    #[test]
    fn assistant_tool_calls_become_wire_tool_calls() {
        let call = ToolCall::requested("call-1", "get_weather", json!({"city": "NYC"}));
        let message = Message::assistant("", vec![call]);
        let wire = OpenAiProvider::wire_messages(&[message]);
        let tool_calls = &wire[0]["tool_calls"];
        assert_eq!(tool_calls[0]["id"], "call-1");
        assert_eq!(tool_calls[0]["function"]["name"], "get_weather");
    }

    #[test]
    fn parses_tool_calls_from_the_response() {
        let raw = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call-1",
                        "function": { "name": "get_weather", "arguments": "{\"city\":\"NYC\"}" }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5 },
            "model": "gpt-4o"
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        let choice = parsed.choices.into_iter().next().unwrap();
        assert_eq!(choice.message.tool_calls.len(), 1);
        assert_eq!(choice.message.tool_calls[0].function.name, "get_weather");
        assert_eq!(map_finish_reason(choice.finish_reason.as_deref()), FinishReason::ToolCalls);
    }
}
