//! Provider trait and per-vendor adapters

pub mod compat;
pub mod deepseek;
pub mod groq;
pub mod openai;
pub mod xai;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::error::LlmError;
use crate::types::{CompletionRequest, CompletionResponse, StreamEvent};

/// A finite stream of canonical events, consumed exactly once per round
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send>>;

/// Capabilities advertised by a provider
#[derive(Debug, Clone, Copy)]
pub struct ProviderCapabilities {
    /// Whether the provider supports streaming responses
    pub streaming: bool,
    /// Whether the provider supports tool/function calling
    pub tool_calling: bool,
    /// Whether the provider emits reasoning deltas
    pub reasoning: bool,
}

/// Trait implemented by each LLM vendor backend
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider instance name (the configuration key)
    fn name(&self) -> &str;

    /// Advertised capabilities
    fn capabilities(&self) -> ProviderCapabilities;

    /// Whether the provider has the credentials it needs
    fn is_available(&self) -> bool;

    /// Send a non-streaming completion request
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Send a streaming completion request
    async fn complete_stream(&self, request: &CompletionRequest) -> Result<EventStream, LlmError>;
}
