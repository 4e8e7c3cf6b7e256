//! Per-job scratch directories.
//!
//! Every job gets its own directory under the configured work dir, named
//! with the job id plus a random suffix, so concurrent jobs never share
//! file names even when a caller reuses a request id.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::MediaResult;

/// Scratch directory owned by a single job.
#[derive(Debug, Clone)]
pub struct JobWorkspace {
    root: PathBuf,
}

impl JobWorkspace {
    /// Create a fresh workspace for `job_id` under `base_dir`.
    pub async fn create(base_dir: impl AsRef<Path>, job_id: &str) -> MediaResult<Self> {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let name = format!("{}-{}", sanitize_component(job_id), &suffix[..8]);
        let root = base_dir.as_ref().join(name);

        fs::create_dir_all(root.join("frames")).await?;
        debug!("Created job workspace {}", root.display());

        Ok(Self { root })
    }

    /// Workspace root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory receiving sampled frames.
    pub fn frames_dir(&self) -> PathBuf {
        self.root.join("frames")
    }

    /// Destination of the extracted audio track.
    pub fn audio_path(&self) -> PathBuf {
        self.root.join("audio.mp3")
    }

    /// Directory receiving downloaded sources.
    pub fn source_dir(&self) -> PathBuf {
        self.root.join("source")
    }

    /// Remove the workspace and everything in it.
    ///
    /// Best-effort and idempotent: a missing directory is not an error and
    /// other failures are logged, never returned.
    pub async fn cleanup(&self) {
        match fs::remove_dir_all(&self.root).await {
            Ok(()) => debug!("Removed job workspace {}", self.root.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove job workspace {}: {}",
                self.root.display(),
                e
            ),
        }
    }
}

/// Make a job id safe to use as a single path component.
fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(64)
        .collect();
    if cleaned.is_empty() {
        "job".to_string()
    } else {
        cleaned
    }
}
