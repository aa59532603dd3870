use serde::Deserialize;

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Env-filter directive string (e.g. "info,chorus_agent=debug")
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit newline-delimited JSON instead of human-readable lines
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

fn default_filter() -> String {
    "info".to_owned()
}
