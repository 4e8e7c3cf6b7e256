//! Pipeline metrics.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Jobs by final status (completed, failed).
    pub const JOBS_TOTAL: &str = "vlens_jobs_total";

    /// Failed jobs by error kind.
    pub const JOB_FAILURES_TOTAL: &str = "vlens_job_failures_total";

    /// Job wall time in seconds.
    pub const JOB_DURATION_SECONDS: &str = "vlens_job_duration_seconds";

    /// Frame batches by outcome (analyzed, declined, failed).
    pub const BATCHES_TOTAL: &str = "vlens_frame_batches_total";

    /// Frame records by status.
    pub const FRAME_RECORDS_TOTAL: &str = "vlens_frame_records_total";

    /// Scenes produced by segmentation.
    pub const SCENES_TOTAL: &str = "vlens_scenes_total";

    /// Synthesis steps that fell back to a canned structure, by step.
    pub const SYNTHESIS_FALLBACKS_TOTAL: &str = "vlens_synthesis_fallbacks_total";

    /// Credits debited at settlement.
    pub const CREDITS_CHARGED_TOTAL: &str = "vlens_credits_charged_total";
}

pub fn record_job(status: &'static str, duration_secs: f64) {
    counter!(names::JOBS_TOTAL, "status" => status).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "status" => status).record(duration_secs);
}

pub fn record_job_failure(kind: &'static str) {
    counter!(names::JOB_FAILURES_TOTAL, "kind" => kind).increment(1);
}

pub fn record_batch(outcome: &'static str) {
    counter!(names::BATCHES_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_frame_record(status: &'static str) {
    counter!(names::FRAME_RECORDS_TOTAL, "status" => status).increment(1);
}

pub fn record_scenes(count: usize) {
    counter!(names::SCENES_TOTAL).increment(count as u64);
}

pub fn record_synthesis_fallback(step: &'static str) {
    counter!(names::SYNTHESIS_FALLBACKS_TOTAL, "step" => step).increment(1);
}

pub fn record_credits_charged(amount: u32) {
    counter!(names::CREDITS_CHARGED_TOTAL).increment(u64::from(amount));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::JOBS_TOTAL.starts_with("vlens_"));
        assert!(names::BATCHES_TOTAL.contains("batches"));
        assert!(names::JOB_DURATION_SECONDS.ends_with("_seconds"));
    }
}
