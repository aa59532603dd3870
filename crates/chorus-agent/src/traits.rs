//! Collaborator traits injected into the orchestrator
//!
//! The engine owns none of these concerns. Tool execution, persistence,
//! and the outbound event channel are all supplied by the embedding
//! application; tests supply in-process mocks.

use async_trait::async_trait;
use chorus_llm::types::{ErrorCode, Message};
use thiserror::Error;

use crate::events::AgentEvent;

/// Failure reported by a tool executor
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ToolExecutionError {
    /// Explicit classification; when absent the error text is classified
    pub code: Option<ErrorCode>,
    /// Human-readable description
    pub message: String,
}

impl ToolExecutionError {
    /// Unclassified failure; the orchestrator classifies the text
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// Failure with an explicit code, which always wins over classification
    pub fn with_code(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }
}

/// Executes named tools on behalf of the agent
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Run `name` with JSON `arguments`
    ///
    /// Success values are opaque JSON to the orchestrator.
    async fn execute(
        &self,
        name: &str,
        arguments: serde_json::Value,
        auth_token: Option<&str>,
    ) -> Result<serde_json::Value, ToolExecutionError>;
}

/// Append-only message store
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Append a message to the session history
    async fn add_message(&self, session_id: &str, message: &Message) -> anyhow::Result<()>;
}

/// Outbound event channel toward the consuming application
#[async_trait]
pub trait Broadcast: Send + Sync {
    /// Publish one event
    async fn send(&self, event: &AgentEvent) -> anyhow::Result<()>;
}
