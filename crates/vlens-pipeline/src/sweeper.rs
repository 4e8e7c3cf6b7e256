//! Background eviction of idle progress entries and finished jobs.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::progress::ProgressTracker;
use crate::registry::JobRegistry;

/// Periodic sweeper over the progress map and, optionally, the job registry.
#[derive(Debug, Clone)]
pub struct Sweeper {
    progress: ProgressTracker,
    registry: Option<JobRegistry>,
    interval: Duration,
    progress_ttl: Duration,
    job_ttl: Duration,
}

impl Sweeper {
    pub fn new(progress: ProgressTracker, interval: Duration, progress_ttl: Duration) -> Self {
        Self {
            progress,
            registry: None,
            interval,
            progress_ttl,
            job_ttl: progress_ttl,
        }
    }

    /// Also evict finished jobs older than `job_ttl`.
    pub fn with_registry(mut self, registry: JobRegistry, job_ttl: Duration) -> Self {
        self.registry = Some(registry);
        self.job_ttl = job_ttl;
        self
    }

    /// Spawn the loop on the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Run indefinitely.
    pub async fn run(&self) {
        info!(
            "Starting progress sweeper (interval: {:?}, ttl: {:?})",
            self.interval, self.progress_ttl
        );

        let mut ticker = interval(self.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.sweep_once();
        }
    }

    /// Run a single sweep. Returns the progress entries and jobs removed.
    pub fn sweep_once(&self) -> (usize, usize) {
        let now = Utc::now();
        let progress_removed = self.progress.sweep_expired(self.progress_ttl, now);
        let jobs_removed = self
            .registry
            .as_ref()
            .map(|registry| registry.evict_expired(self.job_ttl, now))
            .unwrap_or(0);

        if progress_removed > 0 || jobs_removed > 0 {
            info!(
                progress_removed,
                jobs_removed, "Swept idle progress entries and finished jobs"
            );
        } else {
            debug!("Sweep found nothing to evict");
        }
        (progress_removed, jobs_removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlens_models::{AnalysisJob, AnalysisMode, AnalysisRequest, JobId, JobState, Phase};

    #[test]
    fn test_sweep_once_zero_ttl_evicts() {
        let tracker = ProgressTracker::new();
        tracker.update(&JobId::from_string("a"), Phase::Complete, 100, "done", None);

        let sweeper = Sweeper::new(tracker.clone(), Duration::from_secs(300), Duration::ZERO);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(sweeper.sweep_once(), (1, 0));
        assert!(tracker.is_empty());
        assert_eq!(sweeper.sweep_once(), (0, 0));
    }

    #[test]
    fn test_sweep_once_counts_finished_jobs() {
        let tracker = ProgressTracker::new();
        let registry = JobRegistry::new();
        for id in ["done", "running"] {
            let request = AnalysisRequest::new("clip.mp4", "u1", AnalysisMode::Standard)
                .with_job_id(JobId::from_string(id));
            registry.insert(AnalysisJob::from_request(&request));
        }
        registry.modify(&JobId::from_string("done"), |j| j.complete());
        registry.modify(&JobId::from_string("running"), |j| j.start());
        tracker.update(&JobId::from_string("running"), Phase::FrameAnalysis, 40, "frames", None);

        let sweeper = Sweeper::new(tracker.clone(), Duration::from_secs(300), Duration::from_secs(3600))
            .with_registry(registry.clone(), Duration::ZERO);
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(sweeper.sweep_once(), (0, 1));
        assert_eq!(tracker.len(), 1);
        assert_eq!(registry.state(&JobId::from_string("running")), Some(JobState::Running));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_sweeper_runs_on_interval() {
        let tracker = ProgressTracker::new();
        tracker.update(&JobId::from_string("a"), Phase::Complete, 100, "done", None);

        let handle = tracker.spawn_sweeper(Duration::from_secs(300), Duration::ZERO);
        std::thread::sleep(Duration::from_millis(5));
        tokio::time::sleep(Duration::from_secs(301)).await;

        assert!(tracker.is_empty());
        handle.abort();
    }
}
