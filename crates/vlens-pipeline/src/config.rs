//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use vlens_models::SECONDS_PER_CREDIT;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Base directory for per-job workspaces
    pub work_dir: PathBuf,
    /// Frames per inference batch
    pub batch_size: usize,
    /// Minimum scene length in seconds
    pub min_scene_secs: f64,
    /// Maximum scene length in seconds
    pub max_scene_secs: f64,
    /// Change score that opens a new scene
    pub change_threshold: f64,
    /// Scenes per contextual-analysis call
    pub scene_context_batch: usize,
    /// Idle time before a progress entry is swept
    pub progress_ttl: Duration,
    /// Sweep interval for progress entries and finished jobs
    pub sweep_interval: Duration,
    /// Time a finished job stays in the registry
    pub job_ttl: Duration,
    /// Seconds of video covered by one credit
    pub seconds_per_credit: u32,
    /// Timeout for each media tool invocation
    pub media_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("vlens"),
            batch_size: 3,
            min_scene_secs: 2.0,
            max_scene_secs: 8.0,
            change_threshold: 1.0,
            scene_context_batch: 4,
            progress_ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(300),
            job_ttl: Duration::from_secs(3600),
            seconds_per_credit: SECONDS_PER_CREDIT,
            media_timeout_secs: 900,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            work_dir: std::env::var("VLENS_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            batch_size: env_parse("VLENS_BATCH_SIZE", defaults.batch_size),
            min_scene_secs: env_parse("VLENS_MIN_SCENE_SECS", defaults.min_scene_secs),
            max_scene_secs: env_parse("VLENS_MAX_SCENE_SECS", defaults.max_scene_secs),
            change_threshold: env_parse("VLENS_CHANGE_THRESHOLD", defaults.change_threshold),
            scene_context_batch: env_parse("VLENS_SCENE_CONTEXT_BATCH", defaults.scene_context_batch),
            progress_ttl: Duration::from_secs(env_parse("VLENS_PROGRESS_TTL_SECS", 3600)),
            sweep_interval: Duration::from_secs(env_parse("VLENS_PROGRESS_SWEEP_SECS", 300)),
            job_ttl: Duration::from_secs(env_parse("VLENS_JOB_TTL_SECS", 3600)),
            seconds_per_credit: env_parse("VLENS_SECONDS_PER_CREDIT", defaults.seconds_per_credit),
            media_timeout_secs: env_parse("VLENS_MEDIA_TIMEOUT_SECS", defaults.media_timeout_secs),
        }
        .normalized()
    }

    /// Clamp invalid combinations to usable values.
    pub fn normalized(mut self) -> Self {
        self.batch_size = self.batch_size.max(1);
        self.scene_context_batch = self.scene_context_batch.max(1);
        self.seconds_per_credit = self.seconds_per_credit.max(1);
        if !self.min_scene_secs.is_finite() || self.min_scene_secs < 0.0 {
            self.min_scene_secs = 0.0;
        }
        if !self.max_scene_secs.is_finite() || self.max_scene_secs < self.min_scene_secs {
            self.max_scene_secs = self.min_scene_secs;
        }
        if !self.change_threshold.is_finite() {
            self.change_threshold = 1.0;
        }
        self
    }

    /// Minimum scene length in frames at `fps`; at least 1.
    pub fn min_scene_frames(&self, fps: u32) -> usize {
        ((self.min_scene_secs * f64::from(fps)).round() as usize).max(1)
    }

    /// Maximum scene length in frames at `fps`; never below the minimum.
    pub fn max_scene_frames(&self, fps: u32) -> usize {
        ((self.max_scene_secs * f64::from(fps)).round() as usize).max(self.min_scene_frames(fps))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.min_scene_frames(2), 4);
        assert_eq!(config.max_scene_frames(2), 16);
        assert_eq!(config.seconds_per_credit, 15);
    }

    #[test]
    fn test_normalized_clamps() {
        let config = PipelineConfig {
            batch_size: 0,
            min_scene_secs: 5.0,
            max_scene_secs: 1.0,
            ..Default::default()
        }
        .normalized();

        assert_eq!(config.batch_size, 1);
        assert_eq!(config.max_scene_secs, 5.0);
        assert!(config.max_scene_frames(1) >= config.min_scene_frames(1));
    }

    #[test]
    fn test_scene_frames_never_zero() {
        let config = PipelineConfig {
            min_scene_secs: 0.0,
            max_scene_secs: 0.0,
            ..Default::default()
        };
        assert_eq!(config.min_scene_frames(4), 1);
        assert_eq!(config.max_scene_frames(4), 1);
    }
}
