use indexmap::IndexMap;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Top-level LLM configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// LLM provider configurations keyed by name
    #[serde(default)]
    pub providers: IndexMap<String, ProviderConfig>,
}

/// Per-vendor provider configuration
///
/// A closed, tagged union: each vendor carries exactly the knobs its API
/// accepts, validated at deserialization rather than at call time.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Generic OpenAI-compatible endpoint
    Openai(ProviderSettings),
    /// Groq chat completions API
    Groq(GroqSettings),
    /// DeepSeek chat completions API
    Deepseek(ProviderSettings),
    /// xAI chat completions API
    Xai(ProviderSettings),
}

impl ProviderConfig {
    /// Settings shared by every vendor
    pub const fn settings(&self) -> &ProviderSettings {
        match self {
            Self::Openai(s) | Self::Deepseek(s) | Self::Xai(s) => s,
            Self::Groq(g) => &g.base,
        }
    }
}

/// Settings common to all providers
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    /// API key for authentication
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Default model identifier
    pub model: String,
    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default)]
    pub top_p: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_timeout_secs() -> u64 {
    30
}

/// Groq-specific settings on top of the common ones
#[derive(Debug, Clone, Deserialize)]
pub struct GroqSettings {
    /// Common provider settings
    #[serde(flatten)]
    pub base: ProviderSettings,
    /// Groq service tier
    #[serde(default)]
    pub service_tier: Option<ServiceTier>,
    /// Ask the vendor to emit parallel tool calls
    ///
    /// Wire-level only; the engine executes tool calls sequentially.
    #[serde(default)]
    pub parallel_tool_calls: Option<bool>,
    /// Reasoning effort hint
    #[serde(default)]
    pub reasoning_effort: Option<ReasoningEffort>,
}

/// Groq service tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceTier {
    /// Provider picks the tier
    Auto,
    /// Standard on-demand capacity
    OnDemand,
    /// Flexible, lower-priority capacity
    Flex,
    /// Dedicated performance capacity
    Performance,
}

/// Reasoning effort hint for reasoning-capable models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    /// Disable reasoning
    None,
    /// Minimal reasoning
    Low,
    /// Moderate reasoning
    Medium,
    /// Maximum reasoning
    High,
}
