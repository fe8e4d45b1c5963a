use crate::fetcher::Fetcher;
use crate::parser::FeedParser;
use crate::types::{Entry, FeedSource, ParseFailure};
use async_trait::async_trait;
use interfaces::FeedPoller;
use tracing::{debug, info};

/// Feed poller backed by HTTP and feed-rs.
pub struct RssFeedPoller {
    fetcher: Fetcher,
}

impl RssFeedPoller {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl FeedPoller for RssFeedPoller {
    async fn poll(&self, source: &FeedSource) -> Result<Entry, ParseFailure> {
        info!("Parsing RSS feed: {}", source);

        let content = self
            .fetcher
            .fetch_feed(source.as_str())
            .await
            .map_err(|e| ParseFailure::new(format!("fetch failed: {}", e)))?;

        let parsed = FeedParser::parse_feed(&content).map_err(|e| ParseFailure::new(e.to_string()))?;

        if let Some(first) = parsed.entries.first() {
            debug!(
                feed_title = parsed.title.as_deref().unwrap_or(""),
                guid = first.guid.as_deref().unwrap_or(""),
                published_at = ?first.published_at,
                "Latest entry located"
            );
        }

        FeedParser::latest_entry(parsed)
    }
}
