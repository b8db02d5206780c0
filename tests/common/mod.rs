#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::Query;
use axum::http::{StatusCode, header};
use axum::routing::get;
use axum::Router;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use songfetch::data_models::StreamDescriptor;
use songfetch::resolver::{MediaResolver, ResolveError};
use songfetch::search::{SearchClient, SearchConfig};

pub const TEST_API_KEY: &str = "test-api-key";

/// Query strings received by a stub upstream, in arrival order.
pub type Calls = Arc<Mutex<Vec<HashMap<String, String>>>>;

pub async fn spawn_server(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Fake YouTube Data API answering every `/search` with `status` and `body`.
pub async fn spawn_upstream(status: StatusCode, body: String) -> (String, Calls) {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = calls.clone();

    let app = Router::new().route(
        "/search",
        get(move |Query(params): Query<HashMap<String, String>>| {
            let recorded = recorded.clone();
            let body = body.clone();
            async move {
                recorded.lock().unwrap().push(params);
                (status, [(header::CONTENT_TYPE, "application/json")], body)
            }
        }),
    );

    (spawn_server(app).await, calls)
}

pub fn upstream_item(video_id: &str, title: &str) -> Value {
    json!({
        "kind": "youtube#searchResult",
        "id": {"kind": "youtube#video", "videoId": video_id},
        "snippet": {
            "publishedAt": "2021-03-04T10:00:00Z",
            "title": title,
            "description": format!("{title} description"),
            "channelTitle": "Lofi Girl",
            "publishTime": "2021-03-04T10:00:00Z",
            "thumbnails": {
                "default": {"url": format!("https://i.ytimg.com/vi/{video_id}/default.jpg"), "width": 120, "height": 90},
                "medium": {"url": format!("https://i.ytimg.com/vi/{video_id}/mqdefault.jpg"), "width": 320, "height": 180}
            }
        }
    })
}

pub fn upstream_page(items: Vec<Value>, next_page_token: Option<&str>) -> String {
    let mut body = json!({"kind": "youtube#searchListResponse", "items": items});
    if let Some(token) = next_page_token {
        body["nextPageToken"] = json!(token);
    }
    body.to_string()
}

pub fn test_search_client(base_url: &str) -> SearchClient {
    SearchClient::new(SearchConfig {
        api_key: TEST_API_KEY.to_string(),
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

pub fn temp_download_dir() -> PathBuf {
    std::env::temp_dir().join(format!("songfetch-test-{}", nanoid::nanoid!()))
}

pub fn cleanup_dir(dir: &Path) {
    let _ = std::fs::remove_dir_all(dir);
}

#[derive(Debug, Clone)]
pub enum StubOutcome {
    /// Offers one muxed and two audio-only streams.
    Audio,
    /// Offers only streams carrying video.
    NoAudio,
    Fail(&'static str),
    Hang,
}

/// In-memory [`MediaResolver`] writing small placeholder files.
#[derive(Default)]
pub struct StubResolver {
    outcomes: HashMap<String, (StubOutcome, Duration)>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    abandoned: AtomicUsize,
}

/// Counts a hanging resolution whose future was dropped before finishing.
struct AbandonGuard<'a>(&'a AtomicUsize);

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl StubResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, outcome: StubOutcome) -> Self {
        self.outcomes
            .insert(url.to_string(), (outcome, Duration::ZERO));
        self
    }

    pub fn with_delay(mut self, url: &str, outcome: StubOutcome, delay: Duration) -> Self {
        self.outcomes.insert(url.to_string(), (outcome, delay));
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn abandoned(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }
}

fn stream(format_id: &str, audio_only: bool, abr: f64) -> StreamDescriptor {
    StreamDescriptor {
        format_id: format_id.to_string(),
        ext: if audio_only { "m4a" } else { "mp4" }.to_string(),
        audio_only,
        abr: Some(abr),
    }
}

#[async_trait]
impl MediaResolver for StubResolver {
    async fn streams(&self, url: &str) -> Result<Vec<StreamDescriptor>, ResolveError> {
        let (outcome, delay) = self
            .outcomes
            .get(url)
            .cloned()
            .unwrap_or((StubOutcome::Fail("unknown url"), Duration::ZERO));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match outcome {
            StubOutcome::Audio => Ok(vec![
                stream("18", false, 96.0),
                stream("139", true, 48.0),
                stream("140", true, 129.0),
            ]),
            StubOutcome::NoAudio => Ok(vec![stream("137", false, 0.0)]),
            StubOutcome::Fail(message) => Err(ResolveError::Failed(message.to_string())),
            StubOutcome::Hang => {
                let _guard = AbandonGuard(&self.abandoned);
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(vec![])
            }
        }
    }

    async fn download(
        &self,
        url: &str,
        stream: &StreamDescriptor,
        dir: &Path,
    ) -> Result<PathBuf, ResolveError> {
        let name: String = url
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let path = dir.join(format!("{name}-{}.{}", stream.format_id, stream.ext));
        tokio::fs::write(&path, url.as_bytes()).await?;
        Ok(path)
    }
}
