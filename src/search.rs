use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::data_models::{SearchPage, SearchResult};

pub const DEFAULT_MAX_RESULTS: u32 = 50;

/// Appended to every user query so the upstream ranks music videos first.
const QUERY_SUFFIX: &str = "music";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("No results found")]
    NoResults,

    #[error("{0}")]
    Http(reqwest::Error),

    #[error("YouTube API responded with {status}: {message}")]
    Status {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("{0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        // the request url carries the api key
        SearchError::Http(err.without_url())
    }
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

/// Thin client for the YouTube Data API `search.list` endpoint.
pub struct SearchClient {
    http: Client,
    config: SearchConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamResponse {
    items: Option<Vec<UpstreamItem>>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpstreamItem {
    id: UpstreamItemId,
    snippet: UpstreamSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamItemId {
    video_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamSnippet {
    title: String,
    description: String,
    channel_title: String,
    publish_time: String,
    thumbnails: UpstreamThumbnails,
}

#[derive(Debug, Deserialize)]
struct UpstreamThumbnails {
    medium: Value,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorBody {
    error: UpstreamErrorDetail,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorDetail {
    message: String,
}

impl From<UpstreamItem> for SearchResult {
    fn from(item: UpstreamItem) -> Self {
        SearchResult::new(
            item.id.video_id,
            item.snippet.title,
            item.snippet.description,
            item.snippet.channel_title,
            item.snippet.thumbnails.medium,
            item.snippet.publish_time,
        )
    }
}

impl SearchClient {
    pub fn new(config: SearchConfig) -> Result<Self, SearchError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Run one upstream search and normalize the page.
    pub async fn search(
        &self,
        query: &str,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<SearchPage, SearchError> {
        let endpoint = format!("{}/search", self.config.base_url.trim_end_matches('/'));
        let search_query = format!("{query} {QUERY_SUFFIX}");
        let max_results_param = max_results.to_string();

        let mut params = vec![
            ("part", "snippet"),
            ("type", "video"),
            ("q", search_query.as_str()),
            ("key", self.config.api_key.as_str()),
            ("maxResults", max_results_param.as_str()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        log::info!("searching upstream for {search_query:?} (maxResults={max_results})");

        let response = self.http.get(&endpoint).query(&params).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<UpstreamErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("request failed").to_string());
            return Err(SearchError::Status { status, message });
        }

        let upstream: UpstreamResponse = serde_json::from_str(&body)?;
        let items = upstream.items.ok_or(SearchError::NoResults)?;

        // The upstream cursor points past everything it sent, so items over
        // the cap are not reachable from `nextPageUrl` either.
        if items.len() > max_results as usize {
            log::debug!(
                "upstream sent {} items for maxResults={max_results}, dropping {}",
                items.len(),
                items.len() - max_results as usize
            );
        }
        let songs: Vec<SearchResult> = items
            .into_iter()
            .take(max_results as usize)
            .map(SearchResult::from)
            .collect();

        log::debug!("upstream returned {} songs for {query:?}", songs.len());

        let next_page_url = upstream
            .next_page_token
            .filter(|t| !t.is_empty())
            .map(|token| next_page_url(query, max_results, &token));

        Ok(SearchPage {
            songs,
            next_page_url,
        })
    }
}

/// Continuation link back to this service's `/search` endpoint.
pub fn next_page_url(query: &str, max_results: u32, page_token: &str) -> String {
    let params = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("query", query)
        .append_pair("maxResults", &max_results.to_string())
        .append_pair("pageToken", page_token)
        .finish();
    format!("/search?{params}")
}

#[test]
fn test_next_page_url() {
    assert_eq!(
        next_page_url("lofi", 2, "abc"),
        "/search?query=lofi&maxResults=2&pageToken=abc"
    );
    assert_eq!(
        next_page_url("drum & bass", 10, "CAoQAA"),
        "/search?query=drum+%26+bass&maxResults=10&pageToken=CAoQAA"
    );
}

#[test]
fn test_upstream_item_conversion() {
    let raw = r#"{
        "kind": "youtube#searchResult",
        "id": {"kind": "youtube#video", "videoId": "abc123"},
        "snippet": {
            "title": "Café del Mar",
            "description": "chill",
            "channelTitle": "Ibiza",
            "publishTime": "2020-01-01T00:00:00Z",
            "thumbnails": {"medium": {"url": "https://i.ytimg.com/vi/abc123/mqdefault.jpg", "width": 320, "height": 180}}
        }
    }"#;
    let item: UpstreamItem = serde_json::from_str(raw).unwrap();
    let result = SearchResult::from(item);

    assert_eq!(result.title, "Café del Mar");
    assert_eq!(result.video_url, "https://www.youtube.com/watch?v=abc123");
    assert_eq!(result.thumbnail["width"], 320);
}
