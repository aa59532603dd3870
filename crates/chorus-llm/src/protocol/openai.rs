//! OpenAI-compatible chat completion wire format
//!
//! Groq, DeepSeek, and xAI all speak this dialect with small extensions
//! (`reasoning_content`, `max_completion_tokens`, service tiers), so one
//! set of wire types covers every vendor; unused extensions serialize to
//! nothing.

use serde::{Deserialize, Serialize};

// -- Request types --

/// Chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRequest {
    /// Model identifier
    pub model: String,
    /// Conversation messages
    pub messages: Vec<WireMessage>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Maximum completion tokens (Groq's name for the same limit)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    /// Stop sequences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    /// Whether to stream the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Tool definitions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<WireTool>>,
    /// Tool choice ("auto", "none", "required")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
    /// Service tier (Groq)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_tier: Option<String>,
    /// Request vendor-side parallel tool calls (Groq)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,
    /// Reasoning effort hint (Groq)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
}

/// Message within a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    /// Message role
    pub role: String,
    /// Content (string or array of content parts)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<WireContent>,
    /// Participant or tool name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Reasoning text (DeepSeek requires this on assistant messages that
    /// carry tool calls)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
    /// Tool calls made by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    /// Tool call ID this message responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// Content can be a string or array of content parts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireContent {
    /// Plain text content
    Text(String),
    /// Array of content parts
    Parts(Vec<WireContentPart>),
}

/// Individual content part in a message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireContentPart {
    /// Text content
    Text {
        /// The text string
        text: String,
    },
    /// Image content via URL
    ImageUrl {
        /// Image URL specification
        image_url: WireImageUrl,
    },
}

/// Image URL specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireImageUrl {
    /// Image URL or base64 data URI
    pub url: String,
    /// Detail level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Tool definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireTool {
    /// Tool type (always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function specification
    pub function: WireFunction,
}

/// Function specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFunction {
    /// Function name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// Tool call within a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireToolCall {
    /// Unique tool call identifier
    pub id: String,
    /// Tool type (always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function call details
    pub function: WireFunctionCall,
}

/// Function call details within a tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFunctionCall {
    /// Function name
    pub name: String,
    /// JSON-encoded arguments
    pub arguments: String,
}

// -- Response types --

/// Chat completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireResponse {
    /// Response identifier
    pub id: String,
    /// Creation timestamp
    #[serde(default)]
    pub created: u64,
    /// Model used
    pub model: String,
    /// Generated choices
    pub choices: Vec<WireChoice>,
    /// Token usage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<WireUsage>,
}

/// Choice within a response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireChoice {
    /// Choice index
    pub index: u32,
    /// Generated message
    pub message: WireChoiceMessage,
    /// Why generation stopped
    pub finish_reason: Option<String>,
}

/// Message within a response choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireChoiceMessage {
    /// Role (always "assistant")
    pub role: String,
    /// Text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Reasoning text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
    /// Tool calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
}

/// Token usage in a response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireUsage {
    /// Prompt tokens
    pub prompt_tokens: u32,
    /// Completion tokens
    pub completion_tokens: u32,
    /// Total tokens
    pub total_tokens: u32,
}

// -- Streaming types --

/// Streaming chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireStreamChunk {
    /// Chunk identifier
    pub id: String,
    /// Creation timestamp
    #[serde(default)]
    pub created: u64,
    /// Model used
    #[serde(default)]
    pub model: String,
    /// Delta choices
    pub choices: Vec<WireStreamChoice>,
    /// Usage (present on final chunk for some vendors)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<WireUsage>,
}

/// Choice within a streaming chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireStreamChoice {
    /// Choice index
    pub index: u32,
    /// Incremental delta
    pub delta: WireStreamDelta,
    /// Finish reason (present on final chunk)
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Delta content within a streaming choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireStreamDelta {
    /// Role (present on first chunk)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Incremental text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Incremental reasoning text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
    /// Incremental tool calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireStreamToolCall>>,
}

/// Tool call within a streaming delta
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireStreamToolCall {
    /// Index within the `tool_calls` array
    #[serde(default)]
    pub index: u32,
    /// Tool call ID (first chunk only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Tool type (first chunk only)
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "type")]
    pub tool_type: Option<String>,
    /// Partial function call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<WireStreamFunctionCall>,
}

/// Partial function call within a streaming tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireStreamFunctionCall {
    /// Function name (first chunk only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Incremental arguments fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

// -- Error response --

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireErrorResponse {
    /// Error details
    pub error: WireErrorDetail,
}

/// Error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireErrorDetail {
    /// Error message
    pub message: String,
    /// Error type
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    /// Error code
    #[serde(default)]
    pub code: Option<String>,
}
