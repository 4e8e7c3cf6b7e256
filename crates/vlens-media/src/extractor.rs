//! Extraction seam used by the pipeline.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::acquire::{acquire_source, SourceRef};
use crate::error::MediaResult;
use crate::extract::{extract_audio, extract_frames};
use crate::probe::{probe_media, MediaProbe};
use crate::workspace::JobWorkspace;

/// Out-of-process media operations the pipeline depends on.
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Make the source available as a local file.
    async fn acquire(&self, source: &SourceRef, workspace: &JobWorkspace) -> MediaResult<PathBuf>;

    /// Probe duration and streams.
    async fn probe(&self, media: &Path) -> MediaResult<MediaProbe>;

    /// Sample frames; the returned list is in frame-index order.
    async fn extract_frames(
        &self,
        media: &Path,
        fps: u32,
        workspace: &JobWorkspace,
    ) -> MediaResult<Vec<PathBuf>>;

    /// Extract the audio track.
    async fn extract_audio(&self, media: &Path, workspace: &JobWorkspace) -> MediaResult<PathBuf>;
}

/// Production extractor backed by ffprobe, ffmpeg and yt-dlp.
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    timeout_secs: u64,
}

impl FfmpegExtractor {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self::new(900)
    }
}

#[async_trait]
impl MediaExtractor for FfmpegExtractor {
    async fn acquire(&self, source: &SourceRef, workspace: &JobWorkspace) -> MediaResult<PathBuf> {
        acquire_source(source, &workspace.source_dir()).await
    }

    async fn probe(&self, media: &Path) -> MediaResult<MediaProbe> {
        probe_media(media).await
    }

    async fn extract_frames(
        &self,
        media: &Path,
        fps: u32,
        workspace: &JobWorkspace,
    ) -> MediaResult<Vec<PathBuf>> {
        extract_frames(media, fps, &workspace.frames_dir(), self.timeout_secs).await
    }

    async fn extract_audio(&self, media: &Path, workspace: &JobWorkspace) -> MediaResult<PathBuf> {
        extract_audio(media, &workspace.audio_path(), self.timeout_secs).await
    }
}
