use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use nanoid::nanoid;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::data_models::DownloadResult;
use crate::resolver::{MediaResolver, ResolveError, select_audio_stream};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("No audio stream available")]
    NoAudioStream,

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// Saves the audio track of each requested video under `download_dir`.
///
/// URLs are worked on concurrently, at most `concurrency` at a time. Every URL
/// produces exactly one [`DownloadResult`], in input order, whatever happens to
/// the others.
pub struct BatchDownloader {
    resolver: Arc<dyn MediaResolver>,
    download_dir: PathBuf,
    concurrency: usize,
    timeout: Duration,
}

impl BatchDownloader {
    pub fn new(
        resolver: Arc<dyn MediaResolver>,
        download_dir: PathBuf,
        concurrency: usize,
        timeout: Duration,
    ) -> BatchDownloader {
        BatchDownloader {
            resolver,
            download_dir,
            concurrency: concurrency.max(1),
            timeout,
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Each batch gets its own subdirectory so two batches never overwrite
    /// each other's files.
    #[tracing::instrument(skip_all, fields(urls = urls.len()))]
    pub async fn download_all(&self, urls: Vec<String>) -> Vec<DownloadResult> {
        let batch_dir = Arc::new(self.download_dir.join(nanoid!()));
        tracing::info!(dir = %batch_dir.display(), "starting download batch");

        let permits = Arc::new(Semaphore::new(self.concurrency));
        let handles = urls
            .into_iter()
            .map(|url| {
                let resolver = self.resolver.clone();
                let batch_dir = batch_dir.clone();
                let permits = permits.clone();
                let timeout = self.timeout;
                let task_url = url.clone();
                let handle = tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await.ok();
                    download_one(resolver.as_ref(), task_url, &batch_dir, timeout).await
                });
                (url, handle)
            })
            .collect();
        let mut tasks = BatchTasks(handles);

        let mut results = Vec::with_capacity(tasks.0.len());
        for (url, handle) in tasks.0.iter_mut() {
            let url = url.clone();
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    log::error!("download task for {url} aborted: {e}");
                    DownloadResult::failure(url, format!("download task failed: {e}"))
                }
            };
            results.push(result);
        }

        let failed = results.iter().filter(|r| !r.is_success()).count();
        tracing::info!(
            succeeded = results.len() - failed,
            failed,
            "download batch finished"
        );
        results
    }
}

/// Spawned per-URL tasks of one batch. Dropping it (say, when the client goes
/// away mid-batch) aborts whatever is still running, which in turn kills the
/// yt-dlp children.
struct BatchTasks(Vec<(String, JoinHandle<DownloadResult>)>);

impl Drop for BatchTasks {
    fn drop(&mut self) {
        for (_, handle) in &self.0 {
            handle.abort();
        }
    }
}

async fn download_one(
    resolver: &dyn MediaResolver,
    url: String,
    dir: &Path,
    timeout: Duration,
) -> DownloadResult {
    let outcome = match tokio::time::timeout(timeout, fetch_audio(resolver, &url, dir)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(DownloadError::TimedOut(timeout)),
    };

    match outcome {
        Ok(path) => {
            log::debug!("saved {url} to {}", path.display());
            DownloadResult::success(url, &path)
        }
        Err(e) => {
            log::warn!("download failed for {url}: {e}");
            DownloadResult::failure(url, e)
        }
    }
}

async fn fetch_audio(
    resolver: &dyn MediaResolver,
    url: &str,
    dir: &Path,
) -> Result<PathBuf, DownloadError> {
    let streams = resolver.streams(url).await?;
    let stream = select_audio_stream(&streams).ok_or(DownloadError::NoAudioStream)?;

    // create_dir_all is a no-op when another worker got there first
    tokio::fs::create_dir_all(dir).await?;

    Ok(resolver.download(url, stream, dir).await?)
}
