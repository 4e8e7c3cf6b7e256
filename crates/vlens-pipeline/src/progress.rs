//! Request-scoped progress store polled by clients.
//!
//! The tracker is an injected handle, not a global: the orchestrator owns
//! one and hands clones to whoever needs to read it. Updates are synchronous
//! so entries written from concurrently settling batches are applied in the
//! order the writers ran.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use vlens_models::{JobId, Phase, ProgressEntry};

use crate::sweeper::Sweeper;

#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    entries: Arc<RwLock<HashMap<JobId, ProgressEntry>>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the entry for `job_id`.
    ///
    /// Phase, message and detail are last-write-wins; the percentage never
    /// moves backwards while the job is live, so out-of-order writes from
    /// concurrently settling batches cannot regress it. `started_at` is kept
    /// from the first update. An entry left in a terminal phase is replaced
    /// outright, which lets a request id be reused.
    pub fn update(
        &self,
        job_id: &JobId,
        phase: Phase,
        percent: u8,
        message: impl Into<String>,
        detail: Option<serde_json::Value>,
    ) -> ProgressEntry {
        self.update_at(job_id, phase, percent, message, detail, Utc::now())
    }

    fn update_at(
        &self,
        job_id: &JobId,
        phase: Phase,
        percent: u8,
        message: impl Into<String>,
        detail: Option<serde_json::Value>,
        now: DateTime<Utc>,
    ) -> ProgressEntry {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        let live = entries.get(job_id).filter(|e| !e.phase.is_terminal());
        let started_at = live.map(|e| e.started_at).unwrap_or(now);
        let percent = live.map_or(percent, |e| percent.max(e.percent)).min(100);
        let eta_seconds = match phase {
            Phase::Failed => None,
            _ => ProgressEntry::estimate_remaining(started_at, now, percent),
        };

        let entry = ProgressEntry {
            job_id: job_id.clone(),
            phase,
            percent,
            message: message.into(),
            detail,
            started_at,
            updated_at: now,
            eta_seconds,
        };
        entries.insert(job_id.clone(), entry.clone());
        entry
    }

    /// Latest entry for `job_id`.
    pub fn read(&self, job_id: &JobId) -> Option<ProgressEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job_id)
            .cloned()
    }

    pub fn remove(&self, job_id: &JobId) -> Option<ProgressEntry> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(job_id)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict entries not updated within `ttl`. Returns the number removed.
    pub fn sweep_expired(&self, ttl: Duration, now: DateTime<Utc>) -> usize {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::weeks(5200));
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| now - entry.updated_at <= ttl);
        before - entries.len()
    }

    /// Spawn a background task evicting idle entries every `interval`.
    pub fn spawn_sweeper(&self, interval: Duration, ttl: Duration) -> JoinHandle<()> {
        Sweeper::new(self.clone(), interval, ttl).spawn()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_and_read() {
        let tracker = ProgressTracker::new();
        let job = JobId::from_string("job-1");

        tracker.update(&job, Phase::Extracting, 5, "Extracting frames", None);
        let entry = tracker.read(&job).unwrap();
        assert_eq!(entry.phase, Phase::Extracting);
        assert_eq!(entry.percent, 5);
        assert_eq!(entry.message, "Extracting frames");
        assert!(tracker.read(&JobId::from_string("other")).is_none());
    }

    #[test]
    fn test_last_write_wins_and_started_at_kept() {
        let tracker = ProgressTracker::new();
        let job = JobId::from_string("job-1");
        let t0 = Utc::now();

        tracker.update_at(&job, Phase::Initializing, 0, "start", None, t0);
        let later = t0 + chrono::Duration::seconds(20);
        let entry = tracker.update_at(
            &job,
            Phase::FrameAnalysis,
            50,
            "Analyzed 2/4 batches",
            Some(serde_json::json!({"completed": 2, "total": 4})),
            later,
        );

        assert_eq!(entry.started_at, t0);
        assert_eq!(entry.eta_seconds, Some(20));
        assert_eq!(tracker.read(&job).unwrap().detail.unwrap()["completed"], 2);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_percent_never_regresses() {
        let tracker = ProgressTracker::new();
        let job = JobId::from_string("job-1");

        tracker.update(&job, Phase::FrameAnalysis, 40, "Analyzed 2/4 batches", None);
        let entry = tracker.update(&job, Phase::FrameAnalysis, 25, "Analyzed 1/4 batches", None);
        assert_eq!(entry.percent, 40);
        assert_eq!(entry.message, "Analyzed 1/4 batches");

        tracker.update(&job, Phase::Failed, 40, "boom", None);
        let rerun = tracker.update(&job, Phase::Initializing, 0, "Job accepted", None);
        assert_eq!(rerun.percent, 0);
        assert_eq!(rerun.phase, Phase::Initializing);
    }

    #[test]
    fn test_percent_clamped() {
        let tracker = ProgressTracker::new();
        let job = JobId::new();
        let entry = tracker.update(&job, Phase::Complete, 150, "done", None);
        assert_eq!(entry.percent, 100);
        assert_eq!(entry.eta_seconds, Some(0));
    }

    #[test]
    fn test_sweep_expired() {
        let tracker = ProgressTracker::new();
        let old = JobId::from_string("old");
        let fresh = JobId::from_string("fresh");
        let now = Utc::now();

        tracker.update_at(&old, Phase::Complete, 100, "done", None, now - chrono::Duration::hours(2));
        tracker.update_at(&fresh, Phase::Synthesis, 80, "working", None, now);

        let removed = tracker.sweep_expired(Duration::from_secs(3600), now);
        assert_eq!(removed, 1);
        assert!(tracker.read(&old).is_none());
        assert!(tracker.read(&fresh).is_some());
    }

    #[tokio::test]
    async fn test_concurrent_jobs() {
        let tracker = ProgressTracker::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let tracker = tracker.clone();
                tokio::spawn(async move {
                    let job = JobId::from_string(format!("job-{}", i));
                    for p in [10u8, 40, 70, 100] {
                        tracker.update(&job, Phase::FrameAnalysis, p, "tick", None);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(tracker.len(), 8);
        assert_eq!(tracker.read(&JobId::from_string("job-3")).unwrap().percent, 100);
    }
}
