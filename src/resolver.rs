use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;

use crate::data_models::StreamDescriptor;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// Message reported by the media backend, kept as-is.
    #[error("{0}")]
    Failed(String),

    #[error("failed to run yt-dlp: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("unreadable yt-dlp output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("yt-dlp did not report a file path")]
    MissingPath,

    #[error("not a video URL: {0}")]
    InvalidUrl(String),
}

/// Turns a video URL into downloadable media streams.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// List every stream the video is offered in.
    async fn streams(&self, url: &str) -> Result<Vec<StreamDescriptor>, ResolveError>;

    /// Save `stream` into `dir` and return the final file path.
    async fn download(
        &self,
        url: &str,
        stream: &StreamDescriptor,
        dir: &Path,
    ) -> Result<PathBuf, ResolveError>;
}

/// Highest-bitrate audio-only stream. Streams without a known bitrate rank last,
/// and the earliest stream wins a tie.
pub fn select_audio_stream(streams: &[StreamDescriptor]) -> Option<&StreamDescriptor> {
    streams
        .iter()
        .filter(|s| s.audio_only)
        .fold(None, |best: Option<&StreamDescriptor>, candidate| match best {
            Some(current) if candidate.abr.unwrap_or(-1.0) <= current.abr.unwrap_or(-1.0) => {
                Some(current)
            }
            _ => Some(candidate),
        })
}

/// [`MediaResolver`] backed by the `yt-dlp` executable.
pub struct YtDlpResolver {
    binary: PathBuf,
}

#[derive(Debug, Deserialize)]
struct VideoInfo {
    #[serde(default)]
    formats: Vec<FormatInfo>,
}

#[derive(Debug, Deserialize)]
struct FormatInfo {
    format_id: String,
    #[serde(default)]
    ext: String,
    vcodec: Option<String>,
    acodec: Option<String>,
    abr: Option<f64>,
}

impl From<FormatInfo> for StreamDescriptor {
    fn from(format: FormatInfo) -> Self {
        let has_video = format.vcodec.as_deref().is_some_and(|c| c != "none");
        let has_audio = format.acodec.as_deref().is_some_and(|c| c != "none");
        StreamDescriptor {
            format_id: format.format_id,
            ext: format.ext,
            audio_only: has_audio && !has_video,
            abr: format.abr,
        }
    }
}

impl YtDlpResolver {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Runs yt-dlp with `args` followed by `-- <url>`, so the URL can never be
    /// read as an option.
    async fn run(&self, args: &[&str], url: &str) -> Result<String, ResolveError> {
        if url.trim_start().starts_with('-') {
            return Err(ResolveError::InvalidUrl(url.to_string()));
        }

        let output = Command::new(&self.binary)
            .args(args)
            .arg("--")
            .arg(url)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let message = failure_message(&String::from_utf8_lossy(&output.stderr));
            log::debug!("yt-dlp exited with {}: {}", output.status, message);
            return Err(ResolveError::Failed(message));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl MediaResolver for YtDlpResolver {
    async fn streams(&self, url: &str) -> Result<Vec<StreamDescriptor>, ResolveError> {
        let stdout = self
            .run(&["--dump-single-json", "--no-playlist", "--no-warnings"], url)
            .await?;
        let info: VideoInfo = serde_json::from_str(&stdout)?;
        Ok(info.formats.into_iter().map(StreamDescriptor::from).collect())
    }

    async fn download(
        &self,
        url: &str,
        stream: &StreamDescriptor,
        dir: &Path,
    ) -> Result<PathBuf, ResolveError> {
        let dir = dir.to_string_lossy().into_owned();
        let stdout = self
            .run(
                &[
                    "--format",
                    stream.format_id.as_str(),
                    "--no-playlist",
                    "--no-progress",
                    "--no-warnings",
                    "--no-simulate",
                    "--paths",
                    dir.as_str(),
                    "--output",
                    "%(title)s [%(id)s].%(ext)s",
                    "--print",
                    "after_move:filepath",
                ],
                url,
            )
            .await?;

        stdout
            .lines()
            .map(str::trim)
            .rfind(|line| !line.is_empty())
            .map(PathBuf::from)
            .ok_or(ResolveError::MissingPath)
    }
}

/// First `ERROR:` line of yt-dlp's stderr, falling back to the first non-empty line.
fn failure_message(stderr: &str) -> String {
    let mut lines = stderr.lines().map(str::trim).filter(|l| !l.is_empty());
    let first = lines.clone().next();

    lines
        .find_map(|l| l.strip_prefix("ERROR:"))
        .map(|l| l.trim().to_string())
        .or_else(|| first.map(str::to_string))
        .unwrap_or_else(|| "yt-dlp exited without output".to_string())
}
