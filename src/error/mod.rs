//! Error types for trakt-auth.

use thiserror::Error;

use crate::auth::AuthError;

/// Primary error type for configuration and API operations.
#[derive(Error, Debug)]
pub enum TraktError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(#[from] AuthError),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },
}

impl TraktError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Network(_) => true,
            Self::Api { status, .. } => matches!(status, 500..=599),
            Self::Authentication(AuthError::Network(_)) => true,
            _ => false,
        }
    }

    /// The authentication failure behind this error, if any.
    pub fn as_auth(&self) -> Option<&AuthError> {
        match self {
            Self::Authentication(err) => Some(err),
            _ => None,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, TraktError>;
