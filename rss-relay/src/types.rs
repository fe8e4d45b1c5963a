use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;

pub use interfaces::defs::{Destination, Entry, FeedSource, NotifyError, ParseFailure, Summary};

/// Spread applied to each fetch retry delay, as a fraction of the delay.
pub const RETRY_JITTER: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Per request.
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "RSS-Relay/1.0".to_string(),
            timeout_seconds: 30,
            max_retries: 2,
            retry_delay_ms: 2_000,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    /// Longest a fetch can take when every attempt times out and every
    /// backoff sleep lands at the top of its jitter range.
    pub fn retry_budget(&self) -> Duration {
        let initial = Duration::from_millis(self.retry_delay_ms);
        let max_delay = initial * 32;

        let sleeps: Duration = (0..self.max_retries)
            .map(|i| {
                initial
                    .checked_mul(2u32.saturating_pow(i))
                    .unwrap_or(max_delay)
                    .min(max_delay)
                    .mul_f64(1.0 + RETRY_JITTER)
            })
            .sum();

        Duration::from_secs(self.timeout_seconds) * (self.max_retries + 1) + sleeps
    }
}

#[derive(Debug)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<ParsedEntry>,
}

#[derive(Debug, Clone)]
pub struct ParsedEntry {
    pub guid: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    /// RSS `<description>` or Atom `<summary>`.
    pub summary: Option<String>,
    /// RSS `<content:encoded>` or Atom `<content>`, else a media description.
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Feed size exceeds limit: {size_mb}MB")]
    FeedTooLarge { size_mb: usize },

    #[error("State file {} is unreadable: {reason}", .path.display())]
    StorageUnavailable { path: PathBuf, reason: String },

    #[error("Failed to write state file {} after {attempts} attempt(s): {reason}", .path.display())]
    StorageWriteFailed {
        path: PathBuf,
        attempts: u32,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;
