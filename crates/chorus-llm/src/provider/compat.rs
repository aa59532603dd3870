//! Shared HTTP/SSE engine for OpenAI-compatible vendors
//!
//! Every supported vendor speaks the chat-completions dialect with small
//! deviations, so one engine carries the wire plumbing and a per-vendor
//! profile carries the deviations: base URL, dialect rules, and payload
//! extras.

use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{EventStream, Provider, ProviderCapabilities};
use crate::convert::openai::chunk_to_events;
use crate::dialect::DialectRules;
use crate::error::LlmError;
use crate::protocol::openai::{WireErrorResponse, WireRequest, WireResponse, WireStreamChunk};
use crate::types::{CompletionRequest, CompletionResponse, StreamEvent};

/// Everything that distinguishes one vendor from another
#[derive(Debug, Clone)]
pub struct VendorProfile {
    /// Dialect constraints applied before conversion
    pub dialect: DialectRules,
    /// Base URL used when the config does not override it
    pub default_base_url: &'static str,
    /// Vendor names the token limit `max_completion_tokens`
    pub use_max_completion_tokens: bool,
    /// Vendor emits reasoning deltas
    pub reasoning: bool,
    /// Service tier knob (Groq)
    pub service_tier: Option<String>,
    /// Vendor-side parallel tool call knob (wire-level only)
    pub parallel_tool_calls: Option<bool>,
    /// Reasoning effort knob (Groq)
    pub reasoning_effort: Option<String>,
}

/// Generation defaults taken from provider configuration
#[derive(Debug, Clone, Default)]
pub struct GenerationDefaults {
    /// Default sampling temperature
    pub temperature: Option<f64>,
    /// Default nucleus sampling threshold
    pub top_p: Option<f64>,
    /// Default token limit
    pub max_tokens: Option<u32>,
}

/// OpenAI-compatible provider parameterized by a vendor profile
pub struct OpenAiCompatProvider {
    name: String,
    profile: VendorProfile,
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
    key_required: bool,
    defaults: GenerationDefaults,
}

impl OpenAiCompatProvider {
    /// Create a provider from its profile and resolved configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Internal` if the HTTP client cannot be built or
    /// the default base URL fails to parse.
    pub fn new(
        name: String,
        profile: VendorProfile,
        base_url: Option<Url>,
        api_key: Option<SecretString>,
        key_required: bool,
        defaults: GenerationDefaults,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let base_url = match base_url {
            Some(url) => url,
            None => Url::parse(profile.default_base_url)
                .map_err(|e| LlmError::Internal(anyhow::anyhow!("invalid default base URL: {e}")))?,
        };

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Internal(anyhow::anyhow!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            name,
            profile,
            client,
            base_url,
            api_key,
            key_required,
            defaults,
        })
    }

    /// Build the chat completions URL
    fn completions_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/chat/completions")
    }

    /// Build the vendor wire request: dialect repair, defaults, extras
    fn build_wire_request(&self, request: &CompletionRequest) -> WireRequest {
        let prepared = self.profile.dialect.prepare(&request.messages);
        let repaired = CompletionRequest {
            messages: prepared,
            ..request.clone()
        };

        let mut wire: WireRequest = (&repaired).into();

        wire.temperature = wire.temperature.or(self.defaults.temperature);
        wire.top_p = wire.top_p.or(self.defaults.top_p);
        wire.max_tokens = wire.max_tokens.or(self.defaults.max_tokens);

        if self.profile.use_max_completion_tokens {
            wire.max_completion_tokens = wire.max_tokens.take();
        }

        if wire.tools.as_ref().is_some_and(|t| !t.is_empty()) && wire.tool_choice.is_none() {
            wire.tool_choice = Some("auto".to_owned());
        }

        wire.service_tier.clone_from(&self.profile.service_tier);
        wire.parallel_tool_calls = self.profile.parallel_tool_calls;
        wire.reasoning_effort.clone_from(&self.profile.reasoning_effort);

        wire
    }

    /// POST the wire request, mapping transport and status failures
    async fn send(&self, wire: &WireRequest) -> Result<reqwest::Response, LlmError> {
        let mut builder = self.client.post(self.completions_url()).json(wire);

        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!(provider = %self.name, error = %e, "upstream request failed");
            LlmError::Network {
                provider: self.name.clone(),
                message: e.to_string(),
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<WireErrorResponse>(&body)
                .map_or(body, |parsed| parsed.error.message);
            tracing::warn!(provider = %self.name, status, message = %message, "upstream returned error");
            return Err(LlmError::Upstream {
                provider: self.name.clone(),
                status,
                message,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            streaming: true,
            tool_calling: true,
            reasoning: self.profile.reasoning,
        }
    }

    fn is_available(&self) -> bool {
        !self.key_required || self.api_key.is_some()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        if !self.is_available() {
            return Err(LlmError::NotConfigured {
                provider: self.name.clone(),
            });
        }

        let mut wire = self.build_wire_request(request);
        wire.stream = None;

        let response = self.send(&wire).await?;
        let status = response.status().as_u16();

        let wire_response: WireResponse = response.json().await.map_err(|e| LlmError::Upstream {
            provider: self.name.clone(),
            status,
            message: format!("failed to parse response: {e}"),
        })?;

        Ok(wire_response.into())
    }

    async fn complete_stream(&self, request: &CompletionRequest) -> Result<EventStream, LlmError> {
        if !self.is_available() {
            return Err(LlmError::NotConfigured {
                provider: self.name.clone(),
            });
        }

        let mut wire = self.build_wire_request(request);
        wire.stream = Some(true);

        let response = self.send(&wire).await?;

        let provider = self.name.clone();
        let event_stream = response.bytes_stream().eventsource();

        // eventsource-stream buffers partial lines across network reads, so
        // JSON parsing only ever sees a complete `data:` payload. A payload
        // that still fails to parse is skipped without aborting the stream.
        let mapped = event_stream
            .map(move |result| match result {
                Ok(event) => {
                    let data = event.data.trim().to_owned();
                    if data == "[DONE]" {
                        return vec![Ok(StreamEvent::Done)];
                    }

                    match serde_json::from_str::<WireStreamChunk>(&data) {
                        Ok(chunk) => chunk_to_events(&chunk).into_iter().map(Ok).collect(),
                        Err(e) => {
                            tracing::debug!(provider = %provider, error = %e, data = %data, "skipping unparseable SSE chunk");
                            vec![]
                        }
                    }
                }
                Err(e) => vec![Err(LlmError::Streaming {
                    provider: provider.clone(),
                    message: e.to_string(),
                })],
            })
            .flat_map(futures_util::stream::iter);

        Ok(Box::pin(mapped))
    }
}
