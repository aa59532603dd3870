//! Groq adapter
//!
//! Chat-completions dialect with Groq's naming for the token limit and its
//! service-tier / reasoning-effort knobs. Images never travel inline.

use std::time::Duration;

use chorus_config::{GroqSettings, ReasoningEffort, ServiceTier};

use super::compat::{GenerationDefaults, OpenAiCompatProvider, VendorProfile};
use crate::dialect::DialectRules;
use crate::error::LlmError;

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Build a Groq provider from configuration
///
/// # Errors
///
/// Returns `LlmError::Internal` if the HTTP client cannot be built.
pub fn build(name: &str, settings: &GroqSettings) -> Result<OpenAiCompatProvider, LlmError> {
    let profile = VendorProfile {
        dialect: DialectRules {
            inline_images: false,
            ..DialectRules::permissive("groq")
        },
        default_base_url: DEFAULT_BASE_URL,
        use_max_completion_tokens: true,
        reasoning: true,
        service_tier: settings.service_tier.map(|tier| {
            match tier {
                ServiceTier::Auto => "auto",
                ServiceTier::OnDemand => "on_demand",
                ServiceTier::Flex => "flex",
                ServiceTier::Performance => "performance",
            }
            .to_owned()
        }),
        parallel_tool_calls: settings.parallel_tool_calls,
        reasoning_effort: settings.reasoning_effort.map(|effort| {
            match effort {
                ReasoningEffort::None => "none",
                ReasoningEffort::Low => "low",
                ReasoningEffort::Medium => "medium",
                ReasoningEffort::High => "high",
            }
            .to_owned()
        }),
    };

    OpenAiCompatProvider::new(
        name.to_owned(),
        profile,
        settings.base.base_url.clone(),
        settings.base.api_key.clone(),
        true,
        GenerationDefaults {
            temperature: settings.base.temperature,
            top_p: settings.base.top_p,
            max_tokens: settings.base.max_tokens,
        },
        Duration::from_secs(settings.base.timeout_secs),
    )
}
