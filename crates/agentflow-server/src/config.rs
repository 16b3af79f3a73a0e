use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};

fn default_temporal_host_port() -> String {
    "localhost:7233".to_string()
}
fn default_namespace() -> String {
    "default".to_string()
}
fn default_task_queue() -> String {
    "agent-execution-queue".to_string()
}

/// Names the in-process scheduler's task queue; no Temporal server is
/// ever dialed, since the workflow engine here is the tokio-actor one in
/// `agentflow-workflow`, not a real Temporal worker.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TemporalSettings {
    pub host_port: String,
    pub namespace: String,
    pub task_queue: String,
}

impl Default for TemporalSettings {
    fn default() -> Self {
        Self {
            host_port: default_temporal_host_port(),
            namespace: default_namespace(),
            task_queue: default_task_queue(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    pub max_concurrent_workflows: usize,
    pub max_concurrent_activities: usize,
    pub default_timeout_secs: u64,
    pub max_iterations: u32,
    pub require_approval: bool,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            max_concurrent_workflows: 100,
            max_concurrent_activities: 100,
            default_timeout_secs: 300,
            max_iterations: 10,
            require_approval: false,
        }
    }
}

impl ExecutorSettings {
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }
}

/// One entry of `llm.providers[]`. `api_key_env` is resolved at load time
/// by [`resolve_env`]; exactly one of `api_key`/`api_key_env` must be
/// present once resolution runs.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    pub name: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub config: Option<Value>,
}

impl ProviderSettings {
    /// Resolves `api_key_env` against the process environment when
    /// `api_key` itself is absent. A provider entry with neither is a
    /// configuration error (spec §6: "missing-required keys fail
    /// configuration validation").
    pub fn resolve_api_key(&self) -> ConfigResult<String> {
        if let Some(key) = &self.api_key {
            return Ok(key.clone());
        }
        match &self.api_key_env {
            Some(var) => std::env::var(var).map_err(|_| ConfigError::MissingEnv(var.clone())),
            None => Err(ConfigError::MissingCredential(self.name.clone())),
        }
    }

    #[must_use]
    pub fn models(&self) -> Vec<String> {
        self.config
            .as_ref()
            .and_then(|config| config.get("models"))
            .and_then(Value::as_array)
            .map(|models| models.iter().filter_map(|m| m.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    pub providers: Vec<ProviderSettings>,
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}
fn default_server_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: default_server_host(), port: default_server_port() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct A2aSettings {
    pub enabled: bool,
    pub webhook_url: Option<String>,
    pub auth_token: Option<String>,
    pub auth_token_env: Option<String>,
}

impl Default for A2aSettings {
    fn default() -> Self {
        Self { enabled: true, webhook_url: None, auth_token: None, auth_token_env: None }
    }
}

impl A2aSettings {
    /// Resolves `auth_token_env` the same way provider credentials are
    /// resolved. Unlike LLM credentials, auth is optional: an a2a block
    /// with neither field set simply runs unauthenticated.
    pub fn resolve_auth_token(&self) -> ConfigResult<Option<String>> {
        if let Some(token) = &self.auth_token {
            return Ok(Some(token.clone()));
        }
        match &self.auth_token_env {
            Some(var) => std::env::var(var).map(Some).map_err(|_| ConfigError::MissingEnv(var.clone())),
            None => Ok(None),
        }
    }
}

/// Top-level configuration (spec §6's "Configuration (all options
/// enumerated)" list), loaded from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub temporal: TemporalSettings,
    #[serde(default)]
    pub executor: ExecutorSettings,
    pub llm: LlmSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub a2a: A2aSettings,
}

impl Settings {
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
        let settings: Settings = toml::from_str(&raw)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Eagerly resolves every `*_env` field so a missing required
    /// environment variable fails before the server binds a socket,
    /// rather than lazily on first use.
    fn validate(&self) -> ConfigResult<()> {
        for provider in &self.llm.providers {
            provider.resolve_api_key()?;
        }
        self.a2a.resolve_auth_token()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [llm]
        providers = [{ name = "anthropic", api_key = "sk-test" }]
    "#;

    #[test]
    fn defaults_fill_in_every_omitted_section() {
        let settings: Settings = toml::from_str(MINIMAL).unwrap();
        settings.validate().unwrap();
        assert_eq!(settings.temporal.host_port, "localhost:7233");
        assert_eq!(settings.executor.max_iterations, 10);
        assert_eq!(settings.server.port, 8080);
        assert!(settings.a2a.enabled);
    }

    #[test]
    fn missing_env_var_fails_validation() {
        let toml = r#"
            [llm]
            providers = [{ name = "anthropic", api_key_env = "AGENTFLOW_TEST_MISSING_VAR" }]
        "#;
        let settings: Settings = toml::from_str(toml).unwrap();
        let err = settings.validate().expect_err("unset env var must fail validation");
        assert!(matches!(err, ConfigError::MissingEnv(var) if var == "AGENTFLOW_TEST_MISSING_VAR"));
    }

    #[test]
    fn neither_api_key_field_is_a_config_error() {
        let toml = r#"
            [llm]
            providers = [{ name = "anthropic" }]
        "#;
        let settings: Settings = toml::from_str(toml).unwrap();
        let err = settings.validate().expect_err("provider with no credential source must fail");
        assert!(matches!(err, ConfigError::MissingCredential(name) if name == "anthropic"));
    }

    #[test]
    fn literal_api_key_is_used_directly() {
        let settings: Settings = toml::from_str(MINIMAL).unwrap();
        assert_eq!(settings.llm.providers[0].resolve_api_key().unwrap(), "sk-test");
    }
}
