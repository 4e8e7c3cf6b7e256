//! FFmpeg CLI wrapper for frame and audio extraction.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Source acquisition (local files, yt-dlp for URLs)
//! - FFprobe duration / stream probing
//! - Frame sampling and audio track extraction
//! - Per-job scratch workspaces with best-effort cleanup

pub mod acquire;
pub mod command;
pub mod error;
pub mod extract;
pub mod extractor;
pub mod probe;
pub mod workspace;

pub use acquire::{acquire_source, SourceRef};
pub use command::{check_ffmpeg, check_ffprobe, check_ytdlp, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use extract::{extract_audio, extract_frames};
pub use extractor::{FfmpegExtractor, MediaExtractor};
pub use probe::{probe_media, MediaProbe};
pub use workspace::JobWorkspace;
