//! Provider-agnostic LLM access for Chorus
//!
//! Provides a unified interface over OpenAI-compatible chat-completions
//! vendors (Groq, DeepSeek, xAI, and generic OpenAI endpoints) with
//! per-vendor dialect repair, canonical message and stream-event types,
//! and thread validity checks.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod convert;
pub mod dialect;
pub mod error;
pub mod protocol;
pub mod provider;
pub mod registry;
pub mod thread;
pub mod types;

pub use error::LlmError;
pub use provider::{EventStream, Provider, ProviderCapabilities};
pub use registry::ProviderRegistry;
pub use types::{
    CompletionRequest, CompletionResponse, Content, ErrorCode, FinishReason, Message, Role,
    StreamEvent, ToolCall, ToolDefinition, ToolResult,
};
