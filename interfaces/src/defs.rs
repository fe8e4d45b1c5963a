use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use async_trait::async_trait;

/// A chat channel that receives relayed articles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Destination(pub u64);

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Destination {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Destination)
    }
}

/// URL of a syndication feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedSource(String);

impl FeedSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The newest item of a feed. `link` is its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub title: String,
    pub link: String,
    pub content: String,
}

/// A feed that could not be fetched or did not yield a usable entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct ParseFailure {
    pub reason: String,
}

impl ParseFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    #[error("insufficient permissions to send messages to channel {destination}")]
    PermissionDenied { destination: Destination },

    #[error("failed to send message to channel {destination}: {reason}")]
    DeliveryFailed { destination: Destination, reason: String },
}

/// `None` means no summary could be produced and the entry must not be sent.
pub type Summary = Option<String>;

// Object style note:
// Implementations are long lived handles shared by every cycle, so they are
// used behind `Arc<dyn Trait>` and must be `Send + Sync`. None of them may
// touch delivery state; recording what was sent is the cycle's job.

#[async_trait]
pub trait FeedPoller: Send + Sync {
    /// Fetch `source` and return its first entry in document order.
    async fn poll(&self, source: &FeedSource) -> Result<Entry, ParseFailure>;
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Never fails; errors are reported by the implementation and mapped to `None`.
    async fn summarize(&self, content: &str) -> Summary;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, destination: Destination, message: &str) -> Result<(), NotifyError>;

    /// Human readable channel name, for logs only.
    async fn describe(&self, destination: Destination) -> Option<String> {
        let _ = destination;
        None
    }
}
