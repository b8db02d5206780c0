use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// One video returned by the search proxy.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub title: String,
    pub video_url: String,
    pub video_id: String,
    pub description: String,
    pub channel_title: String,
    /// Upstream image descriptor, passed through untouched.
    pub thumbnail: Value,
    pub publish_time: String,
}

impl SearchResult {
    pub fn new(
        video_id: String,
        title: String,
        description: String,
        channel_title: String,
        thumbnail: Value,
        publish_time: String,
    ) -> SearchResult {
        SearchResult {
            video_url: format!("{WATCH_URL}{video_id}"),
            video_id,
            title,
            description,
            channel_title,
            thumbnail,
            publish_time,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub songs: Vec<SearchResult>,
    pub next_page_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Success,
    Error,
}

/// Outcome for a single URL of a download batch.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DownloadResult {
    pub url: String,
    pub status: DownloadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DownloadResult {
    pub fn success(url: String, file_path: &Path) -> DownloadResult {
        DownloadResult {
            url,
            status: DownloadStatus::Success,
            file_path: Some(file_path.to_string_lossy().into_owned()),
            error: None,
        }
    }

    pub fn failure(url: String, error: impl ToString) -> DownloadResult {
        DownloadResult {
            url,
            status: DownloadStatus::Error,
            file_path: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DownloadStatus::Success
    }
}

/// A single media stream a video is offered in.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    pub format_id: String,
    pub ext: String,
    pub audio_only: bool,
    /// Average audio bitrate in kbit/s, when the resolver knows it.
    pub abr: Option<f64>,
}
