//! In-memory registry of analysis jobs.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use vlens_models::{AnalysisJob, JobId, JobState};

/// Jobs owned by the orchestrator, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<JobId, AnalysisJob>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job. Returns false when a non-terminal job with the same
    /// id is already running.
    pub fn insert(&self, job: AnalysisJob) -> bool {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        if jobs.get(&job.id).is_some_and(|existing| !existing.state.is_terminal()) {
            return false;
        }
        jobs.insert(job.id.clone(), job);
        true
    }

    pub fn get(&self, job_id: &JobId) -> Option<AnalysisJob> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job_id)
            .cloned()
    }

    pub fn state(&self, job_id: &JobId) -> Option<JobState> {
        self.get(job_id).map(|job| job.state)
    }

    /// Apply `f` to the job, if present.
    pub fn modify<F>(&self, job_id: &JobId, f: F) -> bool
    where
        F: FnOnce(&mut AnalysisJob),
    {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        match jobs.get_mut(job_id) {
            Some(job) => {
                f(job);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict finished jobs older than `ttl`. Returns the number removed.
    pub fn evict_expired(&self, ttl: Duration, now: DateTime<Utc>) -> usize {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::weeks(5200));
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let before = jobs.len();
        jobs.retain(|_, job| !job.is_expired(ttl, now));
        before - jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlens_models::{AnalysisMode, AnalysisRequest};

    fn job(id: &str) -> AnalysisJob {
        let request = AnalysisRequest::new("clip.mp4", "user-1", AnalysisMode::Standard)
            .with_job_id(JobId::from_string(id));
        AnalysisJob::from_request(&request)
    }

    #[test]
    fn test_insert_rejects_running_duplicate() {
        let registry = JobRegistry::new();
        assert!(registry.insert(job("a")));
        registry.modify(&JobId::from_string("a"), |j| j.start());
        assert!(!registry.insert(job("a")));

        registry.modify(&JobId::from_string("a"), |j| j.complete());
        assert!(registry.insert(job("a")));
    }

    #[test]
    fn test_evict_only_expired_terminal_jobs() {
        let registry = JobRegistry::new();
        registry.insert(job("done"));
        registry.insert(job("running"));
        registry.modify(&JobId::from_string("done"), |j| j.complete());
        registry.modify(&JobId::from_string("running"), |j| j.start());

        let later = Utc::now() + chrono::Duration::hours(2);
        assert_eq!(registry.evict_expired(Duration::from_secs(3600), later), 1);
        assert!(registry.get(&JobId::from_string("done")).is_none());
        assert_eq!(registry.state(&JobId::from_string("running")), Some(JobState::Running));
    }
}
