//! Binary wiring (spec §6 Configuration): loads [`Settings`] from TOML,
//! assembles the provider/tool/bus/executor dependency graph, and serves
//! the `agentflow-a2a` router over axum.

mod config;
mod error;
mod wiring;

pub use config::{A2aSettings, ExecutorSettings, LlmSettings, ProviderSettings, ServerSettings, Settings, TemporalSettings};
pub use error::{ConfigError, ConfigResult};
pub use wiring::{build_app_state, build_provider_registry};
