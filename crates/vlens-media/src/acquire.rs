//! Source acquisition.
//!
//! Local files are used in place. Remote URLs are downloaded with yt-dlp
//! into the job workspace.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};
use url::Url;

use crate::command::{check_ytdlp, truncate_stderr};
use crate::error::{MediaError, MediaResult};

/// yt-dlp format selector: cap resolution, analysis does not need more.
const YTDLP_FORMAT: &str = "bv*[height<=720]+ba/b[height<=720]/b";

/// A parsed source reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// File on the local filesystem
    Local(PathBuf),
    /// http(s) URL fetched with yt-dlp
    Remote(Url),
}

impl SourceRef {
    /// Parse a caller-supplied source string.
    pub fn parse(raw: &str) -> MediaResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(MediaError::invalid_source("empty source reference"));
        }

        if raw.contains("://") {
            let url = Url::parse(raw)
                .map_err(|e| MediaError::invalid_source(format!("{}: {}", raw, e)))?;
            return match url.scheme() {
                "http" | "https" => Ok(SourceRef::Remote(url)),
                "file" => url
                    .to_file_path()
                    .map(SourceRef::Local)
                    .map_err(|_| MediaError::invalid_source(raw.to_string())),
                other => Err(MediaError::invalid_source(format!(
                    "unsupported scheme '{}'",
                    other
                ))),
            };
        }

        Ok(SourceRef::Local(PathBuf::from(raw)))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, SourceRef::Remote(_))
    }
}

/// Make the source available as a local file, downloading when needed.
pub async fn acquire_source(source: &SourceRef, dest_dir: &Path) -> MediaResult<PathBuf> {
    match source {
        SourceRef::Local(path) => {
            if !path.is_file() {
                return Err(MediaError::FileNotFound(path.clone()));
            }
            Ok(path.clone())
        }
        SourceRef::Remote(url) => download_with_ytdlp(url, dest_dir).await,
    }
}

async fn download_with_ytdlp(url: &Url, dest_dir: &Path) -> MediaResult<PathBuf> {
    check_ytdlp()?;
    tokio::fs::create_dir_all(dest_dir).await?;

    let template = dest_dir.join("source.%(ext)s");
    info!("Downloading {} with yt-dlp", url);

    let output = Command::new("yt-dlp")
        .args([
            "--no-playlist",
            "--no-progress",
            "-f",
            YTDLP_FORMAT,
            "--merge-output-format",
            "mp4",
            "-o",
        ])
        .arg(&template)
        .arg(url.as_str())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| MediaError::download_failed(format!("Failed to spawn yt-dlp: {}", e)))?;

    if !output.status.success() {
        return Err(MediaError::download_failed(format!(
            "yt-dlp exited with {:?}: {}",
            output.status.code(),
            truncate_stderr(&output.stderr)
        )));
    }

    let downloaded = find_downloaded_file(dest_dir).await?;
    debug!("yt-dlp wrote {}", downloaded.display());
    Ok(downloaded)
}

/// Locate the file yt-dlp produced from the `source.*` template.
async fn find_downloaded_file(dest_dir: &Path) -> MediaResult<PathBuf> {
    let mut entries = tokio::fs::read_dir(dest_dir).await?;
    let mut candidates = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_source = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("source.") && !n.ends_with(".part"))
            .unwrap_or(false);
        if is_source && path.is_file() {
            candidates.push(path);
        }
    }
    candidates.sort();
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| MediaError::download_failed("yt-dlp produced no output file"))
}
