//! Analysis job definitions.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

/// Unique identifier for an analysis job (the request id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sampling density of an analysis.
///
/// The mode controls how many frames per second are sampled from the
/// source and how many credits the analysis costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Dense sampling (4 fps), double cost
    Fine,
    /// Default sampling (2 fps)
    #[default]
    Standard,
    /// Sparse sampling (1 fps)
    Broad,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Fine => "fine",
            AnalysisMode::Standard => "standard",
            AnalysisMode::Broad => "broad",
        }
    }

    /// Frames sampled per second of video.
    pub fn frames_per_second(&self) -> u32 {
        match self {
            AnalysisMode::Fine => 4,
            AnalysisMode::Standard => 2,
            AnalysisMode::Broad => 1,
        }
    }

    /// Seconds between two sampled frames.
    pub fn sampling_interval(&self) -> f64 {
        1.0 / self.frames_per_second() as f64
    }

    /// Multiplier applied to the base credit cost.
    pub fn cost_multiplier(&self) -> u32 {
        match self {
            AnalysisMode::Fine => 2,
            AnalysisMode::Standard | AnalysisMode::Broad => 1,
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an analysis mode string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown analysis mode: {0}")]
pub struct ParseModeError(pub String);

impl FromStr for AnalysisMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fine" => Ok(AnalysisMode::Fine),
            "standard" => Ok(AnalysisMode::Standard),
            "broad" => Ok(AnalysisMode::Broad),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

/// Lifecycle state of an analysis job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Job accepted, pipeline not yet started
    #[default]
    Created,
    /// Pipeline is running
    Running,
    /// Report produced and credits settled
    Completed,
    /// Pipeline aborted
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Created => "created",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// Submission payload handed to the orchestrator by the outer surface.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct AnalysisRequest {
    /// Caller-supplied request id; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,

    /// Local path or http(s) URL of the video
    #[validate(length(min = 1, max = 4096))]
    pub source: String,

    /// User charged for the analysis
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,

    /// Sampling density
    #[serde(default)]
    pub mode: AnalysisMode,
}

impl AnalysisRequest {
    pub fn new(source: impl Into<String>, user_id: impl Into<String>, mode: AnalysisMode) -> Self {
        Self {
            job_id: None,
            source: source.into(),
            user_id: user_id.into(),
            mode,
        }
    }

    /// Use an explicit request id instead of a generated one.
    pub fn with_job_id(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }
}

/// An analysis job owned by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisJob {
    /// Request id
    pub id: JobId,

    /// Source reference (path or URL)
    pub source: String,

    /// User charged for the analysis
    pub user_id: String,

    /// Sampling density
    pub mode: AnalysisMode,

    /// Lifecycle state
    #[serde(default)]
    pub state: JobState,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Completion (or failure) timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AnalysisJob {
    /// Create a job from a submission, generating an id when none was supplied.
    pub fn from_request(request: &AnalysisRequest) -> Self {
        let now = Utc::now();
        Self {
            id: request.job_id.clone().unwrap_or_default(),
            source: request.source.clone(),
            user_id: request.user_id.clone(),
            mode: request.mode,
            state: JobState::Created,
            created_at: now,
            updated_at: now,
            finished_at: None,
            error_message: None,
        }
    }

    /// Mark job as running.
    pub fn start(&mut self) {
        self.state = JobState::Running;
        self.updated_at = Utc::now();
    }

    /// Mark job as completed.
    pub fn complete(&mut self) {
        let now = Utc::now();
        self.state = JobState::Completed;
        self.updated_at = now;
        self.finished_at = Some(now);
    }

    /// Mark job as failed.
    pub fn fail(&mut self, error: impl Into<String>) {
        let now = Utc::now();
        self.state = JobState::Failed;
        self.error_message = Some(error.into());
        self.updated_at = now;
        self.finished_at = Some(now);
    }

    /// True when the job finished more than `ttl` ago.
    pub fn is_expired(&self, ttl: chrono::Duration, now: DateTime<Utc>) -> bool {
        match self.finished_at {
            Some(finished) if self.state.is_terminal() => now - finished > ttl,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_sampling() {
        assert_eq!(AnalysisMode::Standard.frames_per_second(), 2);
        assert!((AnalysisMode::Standard.sampling_interval() - 0.5).abs() < f64::EPSILON);
        assert!((AnalysisMode::Fine.sampling_interval() - 0.25).abs() < f64::EPSILON);
        assert_eq!(AnalysisMode::Fine.cost_multiplier(), 2);
        assert_eq!(AnalysisMode::Broad.cost_multiplier(), 1);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("Fine".parse::<AnalysisMode>(), Ok(AnalysisMode::Fine));
        assert_eq!(" broad ".parse::<AnalysisMode>(), Ok(AnalysisMode::Broad));
        assert!("ultra".parse::<AnalysisMode>().is_err());
    }

    #[test]
    fn test_job_state_transitions() {
        let request = AnalysisRequest::new("/tmp/video.mp4", "user123", AnalysisMode::Standard);
        let mut job = AnalysisJob::from_request(&request);
        assert_eq!(job.state, JobState::Created);

        job.start();
        assert_eq!(job.state, JobState::Running);
        assert!(job.finished_at.is_none());

        job.complete();
        assert_eq!(job.state, JobState::Completed);
        assert!(job.finished_at.is_some());
    }

    #[test]
    fn test_job_keeps_caller_id() {
        let request = AnalysisRequest::new("a.mp4", "u", AnalysisMode::Broad)
            .with_job_id(JobId::from_string("req-42"));
        let job = AnalysisJob::from_request(&request);
        assert_eq!(job.id.as_str(), "req-42");
    }

    #[test]
    fn test_job_expiry() {
        let request = AnalysisRequest::new("a.mp4", "u", AnalysisMode::Broad);
        let mut job = AnalysisJob::from_request(&request);
        let ttl = chrono::Duration::seconds(60);

        assert!(!job.is_expired(ttl, Utc::now() + chrono::Duration::hours(2)));

        job.fail("boom");
        assert!(!job.is_expired(ttl, Utc::now()));
        assert!(job.is_expired(ttl, Utc::now() + chrono::Duration::seconds(61)));
    }

    #[test]
    fn test_request_validation() {
        let ok = AnalysisRequest::new("a.mp4", "u", AnalysisMode::Standard);
        assert!(ok.validate().is_ok());

        let missing_user = AnalysisRequest::new("a.mp4", "", AnalysisMode::Standard);
        assert!(missing_user.validate().is_err());
    }
}
