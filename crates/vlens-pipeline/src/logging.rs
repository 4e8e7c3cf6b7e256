//! Structured job logging.

use std::time::{Duration, Instant};

use tracing::{error, info, warn, Span};
use vlens_models::{AnalysisMode, AnalysisRequest, JobId};

/// Per-job logger.
///
/// Every event carries the job id, user and mode, and terminal events add
/// the elapsed wall time since the logger was created.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: JobId,
    user_id: String,
    mode: AnalysisMode,
    started: Instant,
}

impl JobLogger {
    pub fn new(job_id: &JobId, request: &AnalysisRequest) -> Self {
        Self {
            job_id: job_id.clone(),
            user_id: request.user_id.clone(),
            mode: request.mode,
            started: Instant::now(),
        }
    }

    pub fn log_start(&self, source: &str) {
        info!(
            job_id = %self.job_id,
            user_id = %self.user_id,
            mode = %self.mode,
            source,
            "Analysis started"
        );
    }

    /// Intermediate step worth a line in the job log.
    pub fn log_step(&self, message: &str) {
        info!(job_id = %self.job_id, mode = %self.mode, "{}", message);
    }

    /// Degradation that lets the job continue.
    pub fn log_warning(&self, message: &str) {
        warn!(job_id = %self.job_id, mode = %self.mode, "{}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            user_id = %self.user_id,
            mode = %self.mode,
            elapsed_ms = self.elapsed().as_millis() as u64,
            "Analysis failed: {}", message
        );
    }

    pub fn log_completion(&self, frames: usize, scenes: usize, credits: u32) {
        info!(
            job_id = %self.job_id,
            user_id = %self.user_id,
            mode = %self.mode,
            frames,
            scenes,
            credits,
            elapsed_ms = self.elapsed().as_millis() as u64,
            "Analysis completed"
        );
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Span the orchestrator instruments a whole run with.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id, mode = %self.mode)
    }
}
