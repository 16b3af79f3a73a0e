use async_trait::async_trait;
use futures_core::stream::BoxStream;
use serde::{Deserialize, Serialize};

use agentflow_core::{Message, ModelConfig, Tool, ToolCall, TokenUsage};

use crate::error::ProviderResult;

/// Why the model stopped generating. Unrecognized reasons from a given
/// provider's wire format fall into `Other` rather than being dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    Other(String),
}

impl FinishReason {
    #[must_use]
    pub fn is_stop(&self) -> bool {
        matches!(self, FinishReason::Stop)
    }
}

/// The uniform request every adapter translates into its own wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<Tool>,
    pub model_config: ModelConfig,
}

/// The uniform response every adapter translates its wire format into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: FinishReason,
    pub token_usage: TokenUsage,
    pub model_used: String,
}

impl ChatResponse {
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// One increment of a streamed response. `is_delta` is `true` for partial
/// content chunks and `false` for a final, fully-assembled chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<FinishReason>,
    pub is_delta: bool,
}

/// The capability contract every LLM backend implements (spec §4.3).
///
/// Implementors are responsible for: stripping/re-attaching system
/// messages the way their wire format expects, re-splitting assistant
/// tool-call messages into provider-native content blocks, re-wrapping
/// tool-result messages, and renaming roles (`assistant` vs `model`).
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    fn supported_models(&self) -> Vec<String>;

    async fn chat(&self, request: ChatRequest) -> ProviderResult<ChatResponse>;

    /// Lazily streamed variant. The default wraps `chat` into a single,
    /// non-delta chunk, matching providers with no native streaming.
    async fn stream_chat(&self, request: ChatRequest) -> ProviderResult<BoxStream<'static, ProviderResult<StreamChunk>>> {
        let response = self.chat(request).await?;
        let chunk = StreamChunk {
            content: response.content,
            tool_calls: response.tool_calls,
            finish_reason: Some(response.finish_reason),
            is_delta: false,
        };
        Ok(Box::pin(futures_util::stream::once(async move { Ok(chunk) })))
    }
}
