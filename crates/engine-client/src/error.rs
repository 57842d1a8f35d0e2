//! Error types for talking to the trading engine.

use thiserror::Error;

/// Errors that can occur when calling the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine answered with a non-2xx status.
    #[error("engine error: {status_code} - {}", .detail.as_deref().unwrap_or("no detail"))]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// `detail` field of the error body, if the engine sent one.
        detail: Option<String>,
    },

    /// Connection-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Response body could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Client could not be built from its configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl EngineError {
    /// Creates an API error from status code and optional detail.
    pub fn api(status_code: u16, detail: Option<String>) -> Self {
        Self::Api {
            status_code,
            detail,
        }
    }

    /// Returns the engine-supplied `detail` text, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Api { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Returns the HTTP status for API errors.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Returns true if the failure is likely to clear up on its own.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Api { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for engine calls.
pub type Result<T> = std::result::Result<T, EngineError>;
