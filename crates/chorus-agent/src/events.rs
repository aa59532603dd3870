use chorus_llm::types::{ErrorCode, ToolCall, ToolResult};
use serde::Serialize;

/// Events published through the `Broadcast` collaborator
///
/// The channel is append-only; consumers see each event at most once and
/// in emission order.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Batched text tokens
    TokenBatch {
        /// Concatenated token text
        text: String,
    },
    /// Incremental reasoning text
    Reasoning {
        /// Reasoning delta
        text: String,
    },
    /// The model requested tool calls this round
    ToolCallsAnnounced {
        /// Complete accumulated calls, in first-seen order
        calls: Vec<ToolCall>,
    },
    /// A tool finished executing
    ToolResult {
        /// Normalized, truncated result
        result: ToolResult,
    },
    /// A generate→execute round finished
    RoundComplete {
        /// Zero-based round index
        round: u32,
    },
    /// The turn produced its final answer
    Done {
        /// Final assistant text
        content: String,
    },
    /// The turn failed fatally
    Error {
        /// Failure classification
        code: ErrorCode,
        /// Human-readable description
        message: String,
    },
}
