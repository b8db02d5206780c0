use dotenvy::dotenv;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Process-wide settings, read once at startup and handed to each component.
#[derive(Debug, Clone)]
pub struct Config {
    pub youtube_api_key: String,
    pub youtube_api_base_url: String,
    pub bind_addr: SocketAddr,
    pub download_dir: PathBuf,
    pub download_concurrency: usize,
    pub search_timeout: Duration,
    pub resolve_timeout: Duration,
    pub yt_dlp_path: PathBuf,
}

impl Config {
    /// Load configuration from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Config, ConfigError> {
        dotenv().ok();

        let download_concurrency = get_env_parsed("DOWNLOAD_CONCURRENCY", 4usize)?;
        if download_concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "DOWNLOAD_CONCURRENCY",
                value: "0".to_string(),
            });
        }

        Ok(Config {
            youtube_api_key: get_env("YOUTUBE_API_KEY")?,
            youtube_api_base_url: get_env_or_default("YOUTUBE_API_BASE_URL", DEFAULT_API_BASE_URL),
            bind_addr: get_env_parsed("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 5000)))?,
            download_dir: PathBuf::from(get_env_or_default("DOWNLOAD_DIR", "downloads")),
            download_concurrency,
            search_timeout: Duration::from_secs(get_env_parsed("SEARCH_TIMEOUT_SECS", 10u64)?),
            resolve_timeout: Duration::from_secs(get_env_parsed("RESOLVE_TIMEOUT_SECS", 300u64)?),
            yt_dlp_path: PathBuf::from(get_env_or_default("YT_DLP_PATH", "yt-dlp")),
        })
    }
}

fn get_env(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_parsed<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

#[test]
fn test_get_env_parsed() {
    // SAFETY: these keys are only touched by this test.
    unsafe {
        env::set_var("SONGFETCH_TEST_PARSED_OK", " 8 ");
        env::set_var("SONGFETCH_TEST_PARSED_BAD", "eight");
    }

    assert_eq!(get_env_parsed("SONGFETCH_TEST_PARSED_OK", 1usize).unwrap(), 8);
    assert_eq!(get_env_parsed("SONGFETCH_TEST_PARSED_MISSING", 3usize).unwrap(), 3);
    assert!(matches!(
        get_env_parsed("SONGFETCH_TEST_PARSED_BAD", 1usize),
        Err(ConfigError::Invalid { key: "SONGFETCH_TEST_PARSED_BAD", .. })
    ));
    assert!(matches!(
        get_env("SONGFETCH_TEST_REQUIRED_MISSING"),
        Err(ConfigError::Missing("SONGFETCH_TEST_REQUIRED_MISSING"))
    ));
}
