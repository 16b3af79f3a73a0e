use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::Provider;

/// Thread-safe name → provider map. `register` rejects duplicates; `get`
/// returns a typed error on miss. Concurrent `register`/`get`/`list` is
/// safe — reads and writes both take the same `RwLock` (spec §5: the
/// provider registry uses the same rw-lock pattern as the event bus).
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn Provider>>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, provider: Arc<dyn Provider>) -> ProviderResult<()> {
        let name = provider.name().to_string();
        let mut providers = self.providers.write().await;
        if providers.contains_key(&name) {
            return Err(ProviderError::AlreadyRegistered(name));
        }
        providers.insert(name, provider);
        Ok(())
    }

    pub async fn get(&self, name: &str) -> ProviderResult<Arc<dyn Provider>> {
        self.providers
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))
    }

    pub async fn list(&self) -> Vec<String> {
        self.providers.read().await.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use futures_core::stream::BoxStream;

    use super::*;
    use crate::provider::{ChatRequest, ChatResponse, FinishReason};
    use agentflow_core::TokenUsage;

    struct StubProvider(&'static str);

    #[async_trait]
    impl Provider for StubProvider {
        fn name(&self) -> &str {
            self.0
        }

        fn supported_models(&self) -> Vec<String> {
            vec!["stub-model".to_string()]
        }

        async fn chat(&self, _request: ChatRequest) -> ProviderResult<ChatResponse> {
            Ok(ChatResponse {
                content: "stub".to_string(),
                tool_calls: vec![],
                finish_reason: FinishReason::Stop,
                token_usage: TokenUsage::default(),
                model_used: "stub-model".to_string(),
            })
        }

        async fn stream_chat(&self, _request: ChatRequest) -> ProviderResult<BoxStream<'static, ProviderResult<crate::provider::StreamChunk>>> {
            unreachable!("not exercised in this test")
        }
    }

    #[tokio::test]
    async fn register_rejects_duplicate_names() {
        let registry = ProviderRegistry::new();
        registry.register(Arc::new(StubProvider("openai"))).await.unwrap();
        let err = registry.register(Arc::new(StubProvider("openai"))).await.unwrap_err();
        assert!(matches!(err, ProviderError::AlreadyRegistered(name) if name == "openai"));
    }

    #[tokio::test]
    async fn get_returns_not_found_on_miss() {
        let registry = ProviderRegistry::new();
        let err = registry.get("missing").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_reflects_registered_providers() {
        let registry = ProviderRegistry::new();
        registry.register(Arc::new(StubProvider("a"))).await.unwrap();
        registry.register(Arc::new(StubProvider("b"))).await.unwrap();
        let mut names = registry.list().await;
        names.sort();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }
}
