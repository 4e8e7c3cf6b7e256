//! Retry budget and backoff schedule.

use std::time::Duration;

/// Retry behaviour for a logical inference call.
///
/// A call makes at most `retry_budget + 1` attempts. The delay after the
/// k-th failed attempt (0-based) is `base_delay × 2^k`, capped at
/// `max_delay`. When the server supplies a retry hint it replaces the
/// computed delay, plus `retry_after_margin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt
    pub retry_budget: u32,
    /// First backoff delay
    pub base_delay: Duration,
    /// Cap for computed delays
    pub max_delay: Duration,
    /// Added to server-supplied retry hints
    pub retry_after_margin: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_budget: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            retry_after_margin: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Set the retry budget.
    pub fn with_retry_budget(mut self, retry_budget: u32) -> Self {
        self.retry_budget = retry_budget;
        self
    }

    /// Set the base delay for exponential backoff.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Set the delay cap.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Maximum attempts for one logical call.
    pub fn max_attempts(&self) -> u32 {
        self.retry_budget.saturating_add(1)
    }

    /// Computed backoff after the failed attempt `attempt` (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Delay before the next attempt, honouring a server hint when present.
    pub fn delay_before_retry(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(hint) => hint.saturating_add(self.retry_after_margin),
            None => self.delay_for_attempt(attempt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::default().with_base_delay(Duration::from_millis(100));

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(800));
    }

    #[test]
    fn test_delay_non_decreasing_and_capped() {
        let policy = RetryPolicy::default()
            .with_base_delay(Duration::from_millis(700))
            .with_max_delay(Duration::from_secs(5));

        let delays: Vec<_> = (0..40).map(|k| policy.delay_for_attempt(k)).collect();
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*delays.last().unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn test_retry_after_overrides_backoff() {
        let policy = RetryPolicy::default();
        let delay = policy.delay_before_retry(0, Some(Duration::from_secs(7)));
        assert_eq!(delay, Duration::from_millis(7500));
    }

    #[test]
    fn test_max_attempts() {
        assert_eq!(RetryPolicy::default().max_attempts(), 3);
        assert_eq!(RetryPolicy::default().with_retry_budget(0).max_attempts(), 1);
    }
}
