use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let expanded =
            crate::env::expand_env(&raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if no provider is configured, a provider declares
    /// an empty model, or the agent knobs are out of range
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.llm.providers.is_empty() {
            anyhow::bail!("at least one LLM provider must be configured");
        }

        for (name, provider) in &self.llm.providers {
            if provider.settings().model.trim().is_empty() {
                anyhow::bail!("provider '{name}' declares an empty model");
            }
        }

        if self.agent.max_rounds == 0 {
            anyhow::bail!("agent.max_rounds must be greater than 0");
        }
        if self.agent.token_batch_size == 0 {
            anyhow::bail!("agent.token_batch_size must be greater than 0");
        }

        Ok(())
    }
}
