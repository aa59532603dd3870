//! xAI adapter
//!
//! Accepts inline image parts but rejects a `name` field on tool-role
//! messages; the dialect table strips it before conversion.

use std::time::Duration;

use chorus_config::ProviderSettings;

use super::compat::{GenerationDefaults, OpenAiCompatProvider, VendorProfile};
use crate::dialect::DialectRules;
use crate::error::LlmError;

const DEFAULT_BASE_URL: &str = "https://api.x.ai/v1";

/// Build an xAI provider from configuration
///
/// # Errors
///
/// Returns `LlmError::Internal` if the HTTP client cannot be built.
pub fn build(name: &str, settings: &ProviderSettings) -> Result<OpenAiCompatProvider, LlmError> {
    let profile = VendorProfile {
        dialect: DialectRules {
            forbid_tool_message_name: true,
            ..DialectRules::permissive("xai")
        },
        default_base_url: DEFAULT_BASE_URL,
        use_max_completion_tokens: false,
        reasoning: true,
        service_tier: None,
        parallel_tool_calls: None,
        reasoning_effort: None,
    };

    OpenAiCompatProvider::new(
        name.to_owned(),
        profile,
        settings.base_url.clone(),
        settings.api_key.clone(),
        true,
        GenerationDefaults {
            temperature: settings.temperature,
            top_p: settings.top_p,
            max_tokens: settings.max_tokens,
        },
        Duration::from_secs(settings.timeout_secs),
    )
}
