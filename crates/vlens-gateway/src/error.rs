//! Gateway error types.

use std::time::Duration;
use thiserror::Error;

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failure of a single transport attempt.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Rate limited: {message}")]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Request rejected {status}: {message}")]
    Client { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    /// Map an HTTP status and body to a transport error.
    pub fn from_http_status(status: u16, body: impl Into<String>, retry_after: Option<Duration>) -> Self {
        let message = body.into();
        match status {
            429 => Self::RateLimited {
                retry_after,
                message,
            },
            500..=599 => Self::Server { status, message },
            _ => Self::Client { status, message },
        }
    }

    /// Check if the attempt may succeed when retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::RateLimited { .. }
                | TransportError::Server { .. }
                | TransportError::Network(_)
                | TransportError::Timeout(_)
        )
    }

    /// Server-supplied retry hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TransportError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// HTTP status associated with the error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            TransportError::RateLimited { .. } => Some(429),
            TransportError::Server { status, .. } | TransportError::Client { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::RateLimited { .. } => "rate_limited",
            TransportError::Server { .. } => "server",
            TransportError::Client { .. } => "client",
            TransportError::Network(_) => "network",
            TransportError::Timeout(_) => "timeout",
            TransportError::InvalidResponse(_) => "invalid_response",
        }
    }
}

/// Errors returned by [`crate::InferenceGateway`].
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Inference call '{label}' failed after {attempts} attempt(s): {source}")]
    Transport {
        label: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Gateway unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Number of attempts made before giving up (0 when no call was issued).
    pub fn attempts(&self) -> u32 {
        match self {
            GatewayError::Transport { attempts, .. } => *attempts,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status_429() {
        let err = TransportError::from_http_status(429, "slow down", Some(Duration::from_secs(3)));
        assert!(matches!(err, TransportError::RateLimited { .. }));
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_from_http_status_503() {
        let err = TransportError::from_http_status(503, "unavailable", None);
        assert!(matches!(err, TransportError::Server { status: 503, .. }));
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn test_from_http_status_400() {
        let err = TransportError::from_http_status(400, "bad request", None);
        assert!(matches!(err, TransportError::Client { status: 400, .. }));
        assert!(!err.is_retryable());
        assert_eq!(err.http_status(), Some(400));
    }

    #[test]
    fn test_invalid_response_not_retryable() {
        assert!(!TransportError::InvalidResponse("no candidates".into()).is_retryable());
        assert!(TransportError::Timeout(Duration::from_secs(1)).is_retryable());
    }
}
