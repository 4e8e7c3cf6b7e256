//! Gateway metrics.
//!
//! - Requests by tier and outcome
//! - Attempt latency
//! - Retries and refusals

use metrics::{counter, histogram};

use crate::request::ModelTier;

/// Metric name constants for consistency.
pub mod names {
    /// Logical calls by tier and outcome (completed, declined, failed).
    pub const REQUESTS_TOTAL: &str = "vlens_gateway_requests_total";

    /// Retries by tier and reason.
    pub const RETRIES_TOTAL: &str = "vlens_gateway_retries_total";

    /// Attempts classified as refusals, by tier.
    pub const REFUSALS_TOTAL: &str = "vlens_gateway_refusals_total";

    /// Single-attempt latency in seconds, by tier.
    pub const ATTEMPT_LATENCY_SECONDS: &str = "vlens_gateway_attempt_latency_seconds";
}

/// Record the final outcome of a logical call.
pub fn record_request(tier: ModelTier, outcome: &'static str) {
    counter!(
        names::REQUESTS_TOTAL,
        "tier" => tier.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a retry.
pub fn record_retry(tier: ModelTier, reason: &'static str) {
    counter!(
        names::RETRIES_TOTAL,
        "tier" => tier.as_str(),
        "reason" => reason
    )
    .increment(1);
}

/// Record an attempt classified as a refusal.
pub fn record_refusal(tier: ModelTier) {
    counter!(names::REFUSALS_TOTAL, "tier" => tier.as_str()).increment(1);
}

/// Record attempt latency.
pub fn record_attempt_latency(tier: ModelTier, latency_ms: f64) {
    histogram!(names::ATTEMPT_LATENCY_SECONDS, "tier" => tier.as_str()).record(latency_ms / 1000.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::REQUESTS_TOTAL.starts_with("vlens_gateway_"));
        assert!(names::RETRIES_TOTAL.contains("retries"));
        assert!(names::REFUSALS_TOTAL.contains("refusals"));
        assert!(names::ATTEMPT_LATENCY_SECONDS.ends_with("_seconds"));
    }
}
