//! Vendor wire format types
//!
//! Serde representations of what actually travels over HTTP, kept separate
//! from the canonical types so wire quirks never leak into the engine.

pub mod openai;
