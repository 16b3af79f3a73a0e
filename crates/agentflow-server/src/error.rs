use thiserror::Error;

/// Config errors (spec §7): rejected at startup, the process does not
/// serve.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file `{path}`: {source}")]
    Read { path: String, #[source] source: std::io::Error },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("environment variable `{0}` required by configuration is not set")]
    MissingEnv(String),

    #[error("llm provider `{0}` has neither api_key nor api_key_env set")]
    MissingCredential(String),

    #[error("unknown llm provider name `{0}`")]
    UnknownProvider(String),

    #[error(transparent)]
    Registry(#[from] agentflow_providers::ProviderError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
