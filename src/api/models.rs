use serde::{Deserialize, Serialize};

use crate::data_models::DownloadResult;

/// Raw `/search` query string. Values are validated by the handler so a bad
/// `maxResults` still yields a JSON error body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub query: Option<String>,
    pub max_results: Option<String>,
    pub page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub urls: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub results: Vec<DownloadResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
