use serde::{Deserialize, Serialize};
use strum::Display;

/// Failure classification attached to tool results and surfaced errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Row-level security denied the operation
    RlsDenied,
    /// Execution exceeded its deadline
    Timeout,
    /// Input failed validation
    ValidationError,
    /// Caller lacks permission
    Forbidden,
    /// Target resource does not exist
    NotFound,
    /// Upstream rate limit hit
    RateLimit,
    /// Network-level failure
    NetworkError,
    /// Unclassified failure
    Unknown,
}

impl ErrorCode {
    /// Classify an error message by keyword matching
    ///
    /// Best-effort and total: every input maps to a code, falling back to
    /// `Unknown`. An explicit code supplied by the caller always takes
    /// precedence over this heuristic.
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();

        if lower.contains("row-level security") || lower.contains("row level security") || lower.contains("rls") {
            Self::RlsDenied
        } else if lower.contains("timeout") || lower.contains("timed out") || lower.contains("deadline") {
            Self::Timeout
        } else if lower.contains("validation") || lower.contains("invalid argument") || lower.contains("schema") {
            Self::ValidationError
        } else if lower.contains("forbidden") || lower.contains("permission denied") || lower.contains("not allowed")
        {
            Self::Forbidden
        } else if lower.contains("not found") || lower.contains("404") || lower.contains("does not exist") {
            Self::NotFound
        } else if lower.contains("rate limit") || lower.contains("too many requests") || lower.contains("429") {
            Self::RateLimit
        } else if lower.contains("network") || lower.contains("connection") || lower.contains("fetch failed") {
            Self::NetworkError
        } else {
            Self::Unknown
        }
    }
}
