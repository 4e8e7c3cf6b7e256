//! Gateway to the remote multimodal inference service.
//!
//! Every AI call in the pipeline goes through [`InferenceGateway::invoke`],
//! which owns:
//! - Admission control (serialized single-flight lane with minimum spacing,
//!   or a bounded parallel lane)
//! - Exponential backoff with `Retry-After` overrides
//! - Refusal detection, retried like transport failures and reported as a
//!   typed [`InferenceOutcome::Declined`] once the budget is spent
//! - Metrics for requests, retries and refusals

pub mod config;
pub mod error;
pub mod gateway;
pub mod gemini;
pub mod limiter;
pub mod metrics;
pub mod refusal;
pub mod request;
pub mod retry;
pub mod transport;

pub use config::{GatewayConfig, TierModels};
pub use error::{GatewayError, GatewayResult, TransportError};
pub use gateway::InferenceGateway;
pub use gemini::GeminiTransport;
pub use limiter::AdmissionControl;
pub use refusal::RefusalDetector;
pub use request::{
    Declined, InferenceOutcome, InferenceReply, InferenceRequest, Lane, ModelTier, Payload,
    RefusalScope, ResponseFormat,
};
pub use retry::RetryPolicy;
pub use transport::{InferenceTransport, TransportReply};
