use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use songfetch::api::{AppState, create_router};
use songfetch::config::Config;
use songfetch::downloader::BatchDownloader;
use songfetch::resolver::YtDlpResolver;
use songfetch::search::{SearchClient, SearchConfig};

/// Music search proxy and batch audio downloader.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Address to listen on (overrides BIND_ADDR)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Directory downloads are written to (overrides DOWNLOAD_DIR)
    #[arg(long)]
    download_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber (handles both tracing and log crate)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(dir) = args.download_dir {
        config.download_dir = dir;
    }

    tokio::fs::create_dir_all(&config.download_dir)
        .await
        .with_context(|| format!("creating {}", config.download_dir.display()))?;

    let search = SearchClient::new(SearchConfig {
        api_key: config.youtube_api_key.clone(),
        base_url: config.youtube_api_base_url.clone(),
        timeout: config.search_timeout,
    })
    .context("Failed to build search client")?;

    let downloader = BatchDownloader::new(
        Arc::new(YtDlpResolver::new(config.yt_dlp_path.clone())),
        config.download_dir.clone(),
        config.download_concurrency,
        config.resolve_timeout,
    );

    let app = create_router(AppState {
        search: Arc::new(search),
        downloader: Arc::new(downloader),
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
