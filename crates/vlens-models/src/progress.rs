//! Progress entries exposed to polling clients.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::JobId;

/// Pipeline phase, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initializing,
    Extracting,
    FrameAnalysis,
    AudioAnalysis,
    Cleanup,
    Synthesis,
    Settlement,
    Complete,
    Failed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Initializing => "initializing",
            Phase::Extracting => "extracting",
            Phase::FrameAnalysis => "frame_analysis",
            Phase::AudioAnalysis => "audio_analysis",
            Phase::Cleanup => "cleanup",
            Phase::Synthesis => "synthesis",
            Phase::Settlement => "settlement",
            Phase::Complete => "complete",
            Phase::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Complete | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest progress of a job. Overwritten on every update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressEntry {
    pub job_id: JobId,
    pub phase: Phase,
    /// Overall completion (0-100)
    pub percent: u8,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
    /// Time of the first update for this job
    pub started_at: DateTime<Utc>,
    /// Time of the latest update
    pub updated_at: DateTime<Utc>,
    /// Estimated seconds until completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta_seconds: Option<u64>,
}

impl ProgressEntry {
    /// Estimate remaining seconds from elapsed time and completion.
    pub fn estimate_remaining(started_at: DateTime<Utc>, now: DateTime<Utc>, percent: u8) -> Option<u64> {
        if percent == 0 {
            return None;
        }
        if percent >= 100 {
            return Some(0);
        }
        let elapsed = (now - started_at).num_milliseconds().max(0) as f64 / 1000.0;
        let remaining = elapsed * f64::from(100 - percent) / f64::from(percent);
        Some(remaining.round() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        assert!(Phase::Extracting < Phase::FrameAnalysis);
        assert!(Phase::Synthesis < Phase::Settlement);
        assert!(Phase::Complete.is_terminal());
        assert!(!Phase::Cleanup.is_terminal());
    }

    #[test]
    fn test_estimate_remaining() {
        let start = Utc::now();
        let now = start + chrono::Duration::seconds(30);

        assert_eq!(ProgressEntry::estimate_remaining(start, now, 0), None);
        assert_eq!(ProgressEntry::estimate_remaining(start, now, 50), Some(30));
        assert_eq!(ProgressEntry::estimate_remaining(start, now, 25), Some(90));
        assert_eq!(ProgressEntry::estimate_remaining(start, now, 100), Some(0));
    }
}
