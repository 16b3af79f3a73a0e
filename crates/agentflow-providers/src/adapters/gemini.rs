use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use agentflow_core::{Message, Role, Tool, ToolCall, ToolCallStatus, TokenUsage};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{ChatRequest, ChatResponse, FinishReason, Provider};

/// Adapter for Gemini's `generateContent` API. Demonstrates the last
/// message-role mapping rule: Gemini calls the model's own turns `model`
/// rather than `assistant`, and has no `tool` role at all — tool results
/// come back as a `user` turn carrying a `functionResponse` part.
pub struct GeminiProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    models: Vec<String>,
}

impl GeminiProvider {
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

    fn wire_role(role: Role) -> &'static str {
        match role {
            Role::Assistant => "model",
            Role::Tool | Role::User => "user",
            Role::System => "system",
        }
    }

    fn wire_contents(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| {
                if m.role == Role::Tool {
                    json!({
                        "role": "user",
                        "parts": [{
                            "functionResponse": {
                                "name": m.tool_call_id.clone().unwrap_or_default(),
                                "response": { "content": m.content },
                            },
                        }],
                    })
                } else {
                    json!({ "role": Self::wire_role(m.role), "parts": [{ "text": m.content }] })
                }
            })
            .collect()
    }

    fn wire_tools(tools: &[Tool]) -> Value {
        json!([{
            "functionDeclarations": tools.iter().map(|t| json!({
                "name": t.name,
                "description": t.description,
                "parameters": t.parameters,
            })).collect::<Vec<_>>(),
        }])
    }
}

#[derive(Debug, serde::Deserialize)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, serde::Deserialize)]
struct Candidate {
    content: CandidateContent,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct CandidateContent {
    parts: Vec<Part>,
}

#[derive(Debug, serde::Deserialize)]
struct Part {
    text: Option<String>,
    #[serde(rename = "functionCall")]
    function_call: Option<WireFunctionCall>,
}

#[derive(Debug, serde::Deserialize)]
struct WireFunctionCall {
    name: String,
    args: Value,
}

#[derive(Debug, serde::Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: u64,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: u64,
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn supported_models(&self) -> Vec<String> {
        self.models.clone()
    }

    async fn chat(&self, request: ChatRequest) -> ProviderResult<ChatResponse> {
        let body = json!({
            "contents": Self::wire_contents(&request.messages),
            "tools": Self::wire_tools(&request.tools),
        });

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, request.model_config.model, self.api_key
        );

        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Permanent(format!("gemini {status}: {body}")));
        }
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Transient(format!("gemini {status}: {body}")));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(ProviderError::from)?;
        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Permanent("gemini response had no candidates".to_string()))?;

        let mut content = String::new();
        let mut tool_calls = Vec::new();
        for part in candidate.content.parts {
            if let Some(function_call) = part.function_call {
                // Gemini never assigns its own function-call ids; synthesize one
                // so it can still be joined back up by `ToolCall::id`.
                let id = uuid::Uuid::new_v4().to_string();
                let mut call = ToolCall::requested(id, function_call.name, function_call.args);
                call.status = ToolCallStatus::Pending;
                tool_calls.push(call);
            } else if let Some(text) = part.text {
                content.push_str(&text);
            }
        }

        let finish_reason = match candidate.finish_reason.as_deref() {
            Some("STOP") => FinishReason::Stop,
            Some("MAX_TOKENS") => FinishReason::Length,
            Some(other) => FinishReason::Other(other.to_string()),
            None => FinishReason::Other("unknown".to_string()),
        };

        let usage = parsed
            .usage_metadata
            .map(|u| TokenUsage::new(u.prompt_token_count, u.candidates_token_count))
            .unwrap_or_default();

        Ok(ChatResponse {
            content,
            tool_calls,
            finish_reason,
            token_usage: usage,
            model_used: request.model_config.model,
        })
    }
}
