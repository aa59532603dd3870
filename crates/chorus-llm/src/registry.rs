//! Provider registry built from configuration
//!
//! The registry is constructed once at startup and injected wherever
//! providers are needed. There is no process-global state; tests build
//! their own registries with mock providers.

use std::sync::Arc;

use chorus_config::{LlmConfig, ProviderConfig};
use indexmap::IndexMap;

use crate::error::LlmError;
use crate::provider::{Provider, deepseek, groq, openai, xai};

struct Entry {
    provider: Arc<dyn Provider>,
    model: String,
}

/// Named providers with their configured default models
#[derive(Default)]
pub struct ProviderRegistry {
    entries: IndexMap<String, Entry>,
}

impl ProviderRegistry {
    /// Build every configured provider
    ///
    /// # Errors
    ///
    /// Returns an error if any provider fails to construct.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let mut registry = Self::default();

        for (name, provider_config) in &config.providers {
            let provider: Arc<dyn Provider> = match provider_config {
                ProviderConfig::Openai(settings) => Arc::new(openai::build(name, settings)?),
                ProviderConfig::Groq(settings) => Arc::new(groq::build(name, settings)?),
                ProviderConfig::Deepseek(settings) => Arc::new(deepseek::build(name, settings)?),
                ProviderConfig::Xai(settings) => Arc::new(xai::build(name, settings)?),
            };
            tracing::info!(
                provider = %name,
                available = provider.is_available(),
                "registered provider"
            );
            registry.insert(name, &provider_config.settings().model, provider);
        }

        Ok(registry)
    }

    /// Register a provider under a name with its default model
    pub fn insert(&mut self, name: &str, model: &str, provider: Arc<dyn Provider>) {
        self.entries.insert(
            name.to_owned(),
            Entry {
                provider,
                model: model.to_owned(),
            },
        );
    }

    /// Look up a provider by name
    ///
    /// # Errors
    ///
    /// Returns `LlmError::ProviderNotFound` if no provider is registered
    /// under `name`.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Provider>, LlmError> {
        self.entries
            .get(name)
            .map(|entry| Arc::clone(&entry.provider))
            .ok_or_else(|| LlmError::ProviderNotFound {
                provider: name.to_owned(),
            })
    }

    /// Configured default model for a provider
    ///
    /// # Errors
    ///
    /// Returns `LlmError::ProviderNotFound` if no provider is registered
    /// under `name`.
    pub fn default_model(&self, name: &str) -> Result<&str, LlmError> {
        self.entries
            .get(name)
            .map(|entry| entry.model.as_str())
            .ok_or_else(|| LlmError::ProviderNotFound {
                provider: name.to_owned(),
            })
    }

    /// Registered provider names in configuration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of registered providers
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(text: &str) -> LlmConfig {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn builds_every_configured_vendor() {
        let registry = ProviderRegistry::from_config(&config(
            r#"
            [providers.fast]
            type = "groq"
            api_key = "gsk-test"
            model = "openai/gpt-oss-20b"

            [providers.deep]
            type = "deepseek"
            api_key = "sk-test"
            model = "deepseek-chat"

            [providers.local]
            type = "openai"
            base_url = "http://localhost:8080/v1"
            model = "llama-3.1-8b"
            "#,
        ))
        .unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.default_model("deep").unwrap(), "deepseek-chat");
        assert!(registry.get("fast").unwrap().is_available());
        // local endpoint with base_url override needs no key
        assert!(registry.get("local").unwrap().is_available());
    }

    #[test]
    fn unknown_provider_is_an_error() {
        let registry = ProviderRegistry::default();
        let Err(err) = registry.get("missing") else {
            panic!("expected lookup to fail");
        };
        assert!(matches!(err, LlmError::ProviderNotFound { .. }));
    }

    #[test]
    fn names_preserve_configuration_order() {
        let registry = ProviderRegistry::from_config(&config(
            r#"
            [providers.b]
            type = "xai"
            api_key = "xai-test"
            model = "grok-3"

            [providers.a]
            type = "deepseek"
            api_key = "sk-test"
            model = "deepseek-chat"
            "#,
        ))
        .unwrap();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
