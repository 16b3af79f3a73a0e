use std::sync::Arc;

use agentflow_a2a::AppState;
use agentflow_bus::EventBus;
use agentflow_executor::ExecutorService;
use agentflow_providers::{AnthropicProvider, GeminiProvider, OpenAiProvider, Provider, ProviderRegistry};
use agentflow_tools::ToolDispatcher;
use agentflow_workflow::{AgentLoopConfig, NullStateStore};
use std::time::Duration;

use crate::config::{ExecutorSettings, ProviderSettings, Settings};
use crate::error::{ConfigError, ConfigResult};

const DEFAULT_ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com";
const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

fn build_provider(settings: &ProviderSettings) -> ConfigResult<Arc<dyn Provider>> {
    let api_key = settings.resolve_api_key()?;
    let models = settings.models();

    let provider: Arc<dyn Provider> = match settings.name.as_str() {
        "anthropic" => {
            let endpoint = settings.endpoint.clone().unwrap_or_else(|| DEFAULT_ANTHROPIC_ENDPOINT.to_string());
            Arc::new(AnthropicProvider::new(api_key, endpoint, models))
        }
        "openai" => {
            let endpoint = settings.endpoint.clone().unwrap_or_else(|| DEFAULT_OPENAI_ENDPOINT.to_string());
            Arc::new(OpenAiProvider::new(api_key, endpoint, models))
        }
        "gemini" => {
            let endpoint = settings.endpoint.clone().unwrap_or_else(|| DEFAULT_GEMINI_ENDPOINT.to_string());
            Arc::new(GeminiProvider::new(api_key, endpoint, models))
        }
        other => return Err(ConfigError::UnknownProvider(other.to_string())),
    };
    Ok(provider)
}

/// Builds the process-wide registry from `llm.providers[]` (spec §6).
/// Each entry's adapter is selected by name; an unrecognized name is a
/// config error rather than a silently-skipped entry.
pub async fn build_provider_registry(settings: &[ProviderSettings]) -> ConfigResult<ProviderRegistry> {
    let registry = ProviderRegistry::new();
    for provider_settings in settings {
        let provider = build_provider(provider_settings)?;
        registry.register(provider).await?;
    }
    Ok(registry)
}

fn agent_loop_config(executor: &ExecutorSettings) -> AgentLoopConfig {
    AgentLoopConfig {
        activity_timeout: executor.default_timeout(),
        approval_timeout: Duration::from_secs(300),
        max_concurrent_activities: executor.max_concurrent_activities,
    }
}

/// Assembles the full dependency graph for one process: provider
/// registry, tool dispatcher, event bus, executor façade, and the axum
/// state that wraps it, from a loaded [`Settings`].
pub async fn build_app_state(settings: &Settings) -> ConfigResult<AppState> {
    let providers = Arc::new(build_provider_registry(&settings.llm.providers).await?);
    let tools = Arc::new(ToolDispatcher::new());
    let bus = EventBus::new();
    let executor = Arc::new(ExecutorService::new(
        providers,
        tools,
        bus,
        Arc::new(NullStateStore),
        agent_loop_config(&settings.executor),
    ));
    Ok(AppState::new(executor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unrecognized_provider_name_is_a_config_error() {
        let settings = vec![crate::config::ProviderSettings {
            name: "cohere".to_string(),
            api_key: Some("k".to_string()),
            api_key_env: None,
            endpoint: None,
            config: None,
        }];
        let err = build_provider_registry(&settings).await.expect_err("unknown provider name must be rejected");
        assert!(matches!(err, ConfigError::UnknownProvider(name) if name == "cohere"));
    }

    #[tokio::test]
    async fn registers_one_provider_per_entry() {
        let settings = vec![crate::config::ProviderSettings {
            name: "anthropic".to_string(),
            api_key: Some("k".to_string()),
            api_key_env: None,
            endpoint: None,
            config: None,
        }];
        let registry = build_provider_registry(&settings).await.unwrap();
        assert_eq!(registry.list().await, vec!["anthropic".to_string()]);
    }
}
