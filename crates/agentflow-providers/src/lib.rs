//! LLM provider abstraction: a uniform chat/stream contract implemented
//! across heterogeneous providers, plus a thread-safe registry.

mod adapters;
mod error;
mod provider;
mod registry;

pub use adapters::{AnthropicProvider, GeminiProvider, OpenAiProvider};
pub use error::{ProviderError, ProviderResult};
pub use provider::{ChatRequest, ChatResponse, FinishReason, Provider, StreamChunk};
pub use registry::ProviderRegistry;
