//! Transport seam between the gateway and the remote service.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::request::InferenceRequest;

/// Raw reply from one attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportReply {
    /// Concatenated text parts of the first candidate
    pub text: String,
    /// Safety block reported by the service, if any
    pub block_reason: Option<String>,
}

impl TransportReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            block_reason: None,
        }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            block_reason: Some(reason.into()),
        }
    }
}

/// A single attempt against the remote multimodal service.
#[async_trait]
pub trait InferenceTransport: Send + Sync {
    async fn send(&self, model: &str, request: &InferenceRequest) -> Result<TransportReply, TransportError>;
}
