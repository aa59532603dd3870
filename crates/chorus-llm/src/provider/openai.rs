//! Generic OpenAI-compatible adapter
//!
//! Used for the canonical OpenAI API and any compatible third-party or
//! local endpoint. A key is only required when the base URL is not
//! overridden, so local servers work without credentials.

use std::time::Duration;

use chorus_config::ProviderSettings;

use super::compat::{GenerationDefaults, OpenAiCompatProvider, VendorProfile};
use crate::dialect::DialectRules;
use crate::error::LlmError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Build a generic OpenAI-compatible provider from configuration
///
/// # Errors
///
/// Returns `LlmError::Internal` if the HTTP client cannot be built.
pub fn build(name: &str, settings: &ProviderSettings) -> Result<OpenAiCompatProvider, LlmError> {
    let profile = VendorProfile {
        dialect: DialectRules::permissive("openai"),
        default_base_url: DEFAULT_BASE_URL,
        use_max_completion_tokens: false,
        reasoning: false,
        service_tier: None,
        parallel_tool_calls: None,
        reasoning_effort: None,
    };

    let key_required = settings.base_url.is_none();

    OpenAiCompatProvider::new(
        name.to_owned(),
        profile,
        settings.base_url.clone(),
        settings.api_key.clone(),
        key_required,
        GenerationDefaults {
            temperature: settings.temperature,
            top_p: settings.top_p,
            max_tokens: settings.max_tokens,
        },
        Duration::from_secs(settings.timeout_secs),
    )
}
