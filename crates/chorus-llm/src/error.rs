use thiserror::Error;

use crate::types::ErrorCode;

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// Named provider does not exist in the registry
    #[error("provider not found: {provider}")]
    ProviderNotFound {
        /// Requested provider name
        provider: String,
    },

    /// Provider exists but lacks credentials or configuration
    #[error("provider not configured: {provider}")]
    NotConfigured {
        /// Provider name
        provider: String,
    },

    /// Upstream provider returned an error response
    #[error("{provider} returned {status}: {message}")]
    Upstream {
        /// Provider name
        provider: String,
        /// HTTP status code from the vendor
        status: u16,
        /// Vendor error message
        message: String,
    },

    /// Network-level failure reaching the provider
    #[error("request to {provider} failed: {message}")]
    Network {
        /// Provider name
        provider: String,
        /// Transport error description
        message: String,
    },

    /// Error during streaming response
    #[error("streaming error from {provider}: {message}")]
    Streaming {
        /// Provider name
        provider: String,
        /// Stream error description
        message: String,
    },

    /// Request was rejected before transmission
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl LlmError {
    /// HTTP status carried by the failure, when the vendor supplied one
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Provider the failure originated from
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::ProviderNotFound { provider }
            | Self::NotConfigured { provider }
            | Self::Upstream { provider, .. }
            | Self::Network { provider, .. }
            | Self::Streaming { provider, .. } => Some(provider),
            Self::InvalidRequest(_) | Self::Internal(_) => None,
        }
    }

    /// Classification of the failure for surfacing to callers
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::ProviderNotFound { .. } => ErrorCode::NotFound,
            Self::NotConfigured { .. } | Self::InvalidRequest(_) => ErrorCode::ValidationError,
            Self::Upstream { status, message, .. } => match status {
                401 | 403 => ErrorCode::Forbidden,
                404 => ErrorCode::NotFound,
                429 => ErrorCode::RateLimit,
                _ => ErrorCode::classify(message),
            },
            Self::Network { .. } => ErrorCode::NetworkError,
            Self::Streaming { message, .. } => ErrorCode::classify(message),
            Self::Internal(_) => ErrorCode::Unknown,
        }
    }

    /// Whether retrying the call may succeed
    ///
    /// Retryable errors indicate a transient vendor issue; the safety-net
    /// non-streaming call is only attempted for these.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Upstream { .. } | Self::Network { .. } | Self::Streaming { .. } | Self::Internal(_)
        )
    }
}
