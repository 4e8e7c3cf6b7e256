//! Frame sampling and audio extraction.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Longest edge of sampled frames. Keeps inline image payloads small.
pub const FRAME_MAX_WIDTH: u32 = 768;

/// Prefix of sampled frame files.
const FRAME_PREFIX: &str = "frame_";

/// Sample `fps` frames per second from `source` into `frames_dir`.
///
/// Returns the frame files in presentation order; position `i` in the
/// returned list is frame index `i`.
pub async fn extract_frames(
    source: &Path,
    fps: u32,
    frames_dir: &Path,
    timeout_secs: u64,
) -> MediaResult<Vec<PathBuf>> {
    tokio::fs::create_dir_all(frames_dir).await?;

    let pattern = frames_dir.join(format!("{}%06d.jpg", FRAME_PREFIX));
    let filter = format!("fps={},scale=w='min({},iw)':h=-2", fps.max(1), FRAME_MAX_WIDTH);

    let cmd = FfmpegCommand::new(source, &pattern)
        .input_arg("-an")
        .video_filter(filter)
        .image_quality(4);

    FfmpegRunner::new().with_timeout(timeout_secs).run(&cmd).await?;

    let frames = list_frames(frames_dir).await?;
    if frames.is_empty() {
        return Err(MediaError::NoFramesExtracted(source.to_path_buf()));
    }

    info!(
        "Extracted {} frames at {} fps from {}",
        frames.len(),
        fps,
        source.display()
    );
    Ok(frames)
}

/// Extract the audio track of `source` as mono 16 kHz mp3.
pub async fn extract_audio(source: &Path, output: &Path, timeout_secs: u64) -> MediaResult<PathBuf> {
    let cmd = FfmpegCommand::new(source, output)
        .no_video()
        .audio_channels(1)
        .sample_rate(16_000)
        .audio_codec("libmp3lame")
        .audio_bitrate("64k");

    FfmpegRunner::new().with_timeout(timeout_secs).run(&cmd).await?;

    if !output.is_file() {
        return Err(MediaError::FileNotFound(output.to_path_buf()));
    }

    info!("Extracted audio track to {}", output.display());
    Ok(output.to_path_buf())
}

/// List sampled frame files in `dir`, sorted by name.
///
/// FFmpeg numbers frames with zero padding, so name order is index order.
pub async fn list_frames(dir: &Path) -> MediaResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut frames = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_frame = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(FRAME_PREFIX) && n.ends_with(".jpg"))
            .unwrap_or(false);
        if is_frame {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_frames_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["frame_000003.jpg", "frame_000001.jpg", "frame_000002.jpg", "notes.txt"] {
            tokio::fs::write(dir.path().join(name), b"x").await.unwrap();
        }

        let frames = list_frames(dir.path()).await.unwrap();
        let names: Vec<_> = frames
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["frame_000001.jpg", "frame_000002.jpg", "frame_000003.jpg"]);
    }
}
