//! Pipeline error types.

use thiserror::Error;
use vlens_gateway::GatewayError;
use vlens_media::MediaError;
use vlens_models::JobId;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Extraction failed: {0}")]
    ExtractionFailure(#[from] MediaError),

    #[error("Inference failed: {0}")]
    InferenceTransport(#[from] GatewayError),

    #[error("Inference declined for '{label}': {reason}")]
    InferenceDeclined { label: String, reason: String },

    #[error("Unrecognized response: {0}")]
    ParseFailure(String),

    #[error("Insufficient credits: {required} required, {available} available")]
    InsufficientCredits { required: u32, available: u64 },

    #[error("Credit ledger error: {0}")]
    Ledger(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected failure: {0}")]
    Unknown(String),
}

impl PipelineError {
    pub fn declined(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InferenceDeclined {
            label: label.into(),
            reason: reason.into(),
        }
    }

    pub fn parse_failure(msg: impl Into<String>) -> Self {
        Self::ParseFailure(msg.into())
    }

    pub fn ledger(msg: impl Into<String>) -> Self {
        Self::Ledger(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }

    /// Errors absorbed into degraded output rather than failing the job.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::InferenceDeclined { .. }
                | PipelineError::ParseFailure(_)
                | PipelineError::InferenceTransport(GatewayError::Transport { .. })
        )
    }

    pub fn is_insufficient_credits(&self) -> bool {
        matches!(self, PipelineError::InsufficientCredits { .. })
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::ExtractionFailure(_) => "extraction",
            PipelineError::InferenceTransport(_) => "inference_transport",
            PipelineError::InferenceDeclined { .. } => "inference_declined",
            PipelineError::ParseFailure(_) => "parse",
            PipelineError::InsufficientCredits { .. } => "insufficient_credits",
            PipelineError::Ledger(_) => "ledger",
            PipelineError::InvalidRequest(_) => "invalid_request",
            PipelineError::Configuration(_) => "configuration",
            PipelineError::Io(_) => "io",
            PipelineError::Unknown(_) => "unknown",
        }
    }
}

/// A job-level failure, tagged with the job id for correlation.
#[derive(Debug, Error)]
#[error("Job {job_id} failed: {error}")]
pub struct JobFailure {
    pub job_id: JobId,
    #[source]
    pub error: PipelineError,
}

impl JobFailure {
    pub fn new(job_id: JobId, error: PipelineError) -> Self {
        Self { job_id, error }
    }
}
