//! Credit cost calculation for analyses.
//!
//! One credit covers [`SECONDS_PER_CREDIT`] seconds of video at standard
//! density; the analysis mode scales the base cost.

use crate::AnalysisMode;

/// Seconds of video covered by one credit.
pub const SECONDS_PER_CREDIT: u32 = 15;

/// Credits charged for analysing `duration_seconds` of video in `mode`.
///
/// The base cost is `ceil(duration / seconds_per_credit)`, never below 1.
pub fn analysis_credit_cost(duration_seconds: f64, mode: AnalysisMode, seconds_per_credit: u32) -> u32 {
    let per_credit = f64::from(seconds_per_credit.max(1));
    let duration = if duration_seconds.is_finite() {
        duration_seconds.max(0.0)
    } else {
        0.0
    };
    let base = ((duration / per_credit).ceil() as u32).max(1);
    base.saturating_mul(mode.cost_multiplier())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_cost_is_ceil() {
        assert_eq!(analysis_credit_cost(15.0, AnalysisMode::Standard, SECONDS_PER_CREDIT), 1);
        assert_eq!(analysis_credit_cost(15.1, AnalysisMode::Standard, SECONDS_PER_CREDIT), 2);
        assert_eq!(analysis_credit_cost(60.0, AnalysisMode::Broad, SECONDS_PER_CREDIT), 4);
    }

    #[test]
    fn test_fine_mode_doubles() {
        assert_eq!(analysis_credit_cost(31.0, AnalysisMode::Fine, SECONDS_PER_CREDIT), 6);
    }

    #[test]
    fn test_minimum_one_credit() {
        assert_eq!(analysis_credit_cost(0.0, AnalysisMode::Standard, SECONDS_PER_CREDIT), 1);
        assert_eq!(analysis_credit_cost(f64::NAN, AnalysisMode::Standard, SECONDS_PER_CREDIT), 1);
    }
}
