#![allow(clippy::must_use_candidate)]

pub mod agent;
mod env;
pub mod llm;
mod loader;
pub mod telemetry;

use serde::Deserialize;

pub use agent::AgentConfig;
pub use llm::*;
pub use telemetry::LogConfig;

/// Top-level Chorus configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// LLM provider configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Agent loop tuning
    #[serde(default)]
    pub agent: AgentConfig,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}
