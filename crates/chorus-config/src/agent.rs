use serde::Deserialize;

/// Tuning knobs for the agent round loop
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Maximum generate→execute→relaunch rounds per user turn
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    /// Per-tool execution timeout in seconds
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    /// Characters buffered before a token batch is broadcast
    #[serde(default = "default_token_batch_size")]
    pub token_batch_size: usize,
    /// Broadcast publish retries before degrading to per-token sends
    #[serde(default = "default_broadcast_max_retries")]
    pub broadcast_max_retries: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            tool_timeout_secs: default_tool_timeout_secs(),
            token_batch_size: default_token_batch_size(),
            broadcast_max_retries: default_broadcast_max_retries(),
        }
    }
}

const fn default_max_rounds() -> u32 {
    10
}

const fn default_tool_timeout_secs() -> u64 {
    15
}

const fn default_token_batch_size() -> usize {
    50
}

const fn default_broadcast_max_retries() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.max_rounds, 10);
        assert_eq!(config.tool_timeout_secs, 15);
        assert_eq!(config.token_batch_size, 50);
        assert_eq!(config.broadcast_max_retries, 3);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config: AgentConfig = toml::from_str("max_rounds = 3").unwrap();
        assert_eq!(config.max_rounds, 3);
        assert_eq!(config.tool_timeout_secs, 15);
    }
}
