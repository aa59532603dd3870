use chorus_llm::LlmError;
use thiserror::Error;

/// Fatal orchestrator errors
///
/// Everything recoverable (tool failures, malformed stream chunks, dialect
/// drops) is handled in place and fed back to the model. This enum only
/// covers conditions the loop cannot continue past: the model call failed
/// and the non-streaming safety net failed too, or persistence refused an
/// append (durability precedes progress).
#[derive(Debug, Error)]
pub enum AgentError {
    /// The model call and its safety-net retry both failed
    #[error(transparent)]
    Model(#[from] LlmError),

    /// The persistence collaborator rejected an append
    #[error("persistence failed: {0}")]
    Persistence(#[source] anyhow::Error),
}
