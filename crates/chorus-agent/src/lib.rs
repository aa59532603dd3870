//! Round orchestration for Chorus
//!
//! Drives the bounded generate → execute tools → relaunch loop over a
//! `chorus-llm` provider: reassembles fragmented streaming tool calls,
//! executes them sequentially through an injected executor, classifies
//! and caps their results, and guarantees the turn never ends with a
//! silent empty answer.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod accumulator;
pub mod batcher;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod prompts;
pub mod result;
pub mod traits;

pub use accumulator::ToolCallAccumulator;
pub use error::AgentError;
pub use events::AgentEvent;
pub use orchestrator::{Orchestrator, TurnOutcome, TurnRequest};
pub use traits::{Broadcast, Persistence, ToolExecutionError, ToolExecutor};
