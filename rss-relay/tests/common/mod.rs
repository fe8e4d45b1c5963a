#![allow(dead_code)]

use async_trait::async_trait;
use rss_relay::{CycleConfig, Destination, Entry, FeedPoller, FeedSource, Notifier, NotifyError, ParseFailure, Summarizer, Summary};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};
use std::time::Duration;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn entry(title: &str, link: &str, content: &str) -> Entry {
    Entry {
        title: title.to_string(),
        link: link.to_string(),
        content: content.to_string(),
    }
}

pub fn fast_config() -> CycleConfig {
    CycleConfig {
        max_concurrent_polls: 2,
        poll_timeout: Duration::from_secs(5),
        call_timeout: Duration::from_secs(5),
        persist_max_attempts: 3,
        persist_initial_delay: Duration::from_millis(5),
        persist_max_delay: Duration::from_millis(20),
    }
}

/// Feed results keyed by URL; unknown URLs fail to parse.
#[derive(Default)]
pub struct FakePoller {
    feeds: Mutex<HashMap<String, Result<Entry, ParseFailure>>>,
    polls: Mutex<Vec<String>>,
}

impl FakePoller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_entry(&self, source: &str, entry: Entry) {
        self.feeds.lock().unwrap().insert(source.to_string(), Ok(entry));
    }

    pub fn set_failure(&self, source: &str, reason: &str) {
        self.feeds
            .lock()
            .unwrap()
            .insert(source.to_string(), Err(ParseFailure::new(reason)));
    }

    pub fn polls(&self) -> Vec<String> {
        self.polls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedPoller for FakePoller {
    async fn poll(&self, source: &FeedSource) -> Result<Entry, ParseFailure> {
        self.polls.lock().unwrap().push(source.to_string());
        self.feeds
            .lock()
            .unwrap()
            .get(source.as_str())
            .cloned()
            .unwrap_or_else(|| Err(ParseFailure::new("unknown feed")))
    }
}

/// Returns a fixed reply, or `None` when constructed with `failing()`.
pub struct FakeSummarizer {
    reply: Mutex<Summary>,
    calls: AtomicUsize,
}

impl FakeSummarizer {
    pub fn replying(summary: &str) -> Self {
        Self {
            reply: Mutex::new(Some(summary.to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_reply(&self, summary: Summary) {
        *self.reply.lock().unwrap() = summary;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, _content: &str) -> Summary {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.lock().unwrap().clone()
    }
}

/// Records every successful send; destinations can be set to fail.
/// Channel names come from `name_channel`.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Destination, String)>>,
    failures: Mutex<HashMap<Destination, NotifyError>>,
    names: Mutex<HashMap<Destination, String>>,
    lookups: AtomicUsize,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, destination: Destination, error: NotifyError) {
        self.failures.lock().unwrap().insert(destination, error);
    }

    pub fn heal(&self, destination: Destination) {
        self.failures.lock().unwrap().remove(&destination);
    }

    pub fn sent(&self) -> Vec<(Destination, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn name_channel(&self, destination: Destination, name: &str) {
        self.names.lock().unwrap().insert(destination, name.to_string());
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, destination: Destination, message: &str) -> Result<(), NotifyError> {
        if let Some(error) = self.failures.lock().unwrap().get(&destination) {
            return Err(error.clone());
        }
        self.sent.lock().unwrap().push((destination, message.to_string()));
        Ok(())
    }

    async fn describe(&self, destination: Destination) -> Option<String> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.names.lock().unwrap().get(&destination).cloned()
    }
}
