use crate::notifier::compose_message;
use crate::store::{DedupStore, DeliveryLedger};
use crate::types::{Destination, Entry, FeedSource, FetchConfig, NotifyError, ParseFailure, RelayError, Result, Summary};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use futures::stream::{self, StreamExt};
use interfaces::{FeedPoller, Notifier, Summarizer};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CycleConfig {
    /// Feeds fetched at the same time.
    pub max_concurrent_polls: usize,
    /// Upper bound on one poll, including the fetcher's own retries.
    pub poll_timeout: Duration,
    /// Upper bound on any single summarize, send or channel lookup.
    pub call_timeout: Duration,
    pub persist_max_attempts: u32,
    pub persist_initial_delay: Duration,
    pub persist_max_delay: Duration,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            max_concurrent_polls: 4,
            poll_timeout: FetchConfig::default().retry_budget(),
            call_timeout: Duration::from_secs(60),
            persist_max_attempts: 5,
            persist_initial_delay: Duration::from_secs(1),
            persist_max_delay: Duration::from_secs(16),
        }
    }
}

/// What happened to one (destination, source) pair in a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Delivered,
    Duplicate,
    ParseFailure,
    SummaryFailure,
    SendFailure,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub delivered: usize,
    pub duplicates: usize,
    pub parse_failures: usize,
    pub summary_failures: usize,
    pub send_failures: usize,
}

impl CycleReport {
    fn tally(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Delivered => self.delivered += 1,
            Outcome::Duplicate => self.duplicates += 1,
            Outcome::ParseFailure => self.parse_failures += 1,
            Outcome::SummaryFailure => self.summary_failures += 1,
            Outcome::SendFailure => self.send_failures += 1,
        }
    }

    pub fn evaluated(&self) -> usize {
        self.delivered + self.duplicates + self.parse_failures + self.summary_failures + self.send_failures
    }
}

/// One pass of poll → dedup → summarize → send → record over every
/// destination and source, followed by a single persist.
pub struct CycleRunner {
    poller: Arc<dyn FeedPoller>,
    summarizer: Arc<dyn Summarizer>,
    notifier: Arc<dyn Notifier>,
    store_path: PathBuf,
    config: CycleConfig,
    /// Ledger of a cycle whose persist gave up. Used instead of the file
    /// until a later persist succeeds.
    unsaved: Mutex<Option<DeliveryLedger>>,
    channel_names: Mutex<HashMap<Destination, String>>,
}

impl CycleRunner {
    pub fn new(
        poller: Arc<dyn FeedPoller>,
        summarizer: Arc<dyn Summarizer>,
        notifier: Arc<dyn Notifier>,
        store_path: impl Into<PathBuf>,
        config: CycleConfig,
    ) -> Self {
        Self {
            poller,
            summarizer,
            notifier,
            store_path: store_path.into(),
            config,
            unsaved: Mutex::new(None),
            channel_names: Mutex::new(HashMap::new()),
        }
    }

    pub async fn run_cycle(&self, destinations: &[Destination], sources: &[FeedSource]) -> Result<CycleReport> {
        let span = info_span!("cycle", cycle_id = %Uuid::new_v4());
        self.run_cycle_inner(destinations, sources).instrument(span).await
    }

    async fn run_cycle_inner(&self, destinations: &[Destination], sources: &[FeedSource]) -> Result<CycleReport> {
        let mut store = self.load_store().await;
        let polls = self.poll_all(sources).await;

        // Computed once per link per cycle; a `None` is not retried until the next cycle.
        let mut summaries: HashMap<String, Summary> = HashMap::new();
        let mut report = CycleReport::default();

        for &destination in destinations {
            match self.describe(destination).await {
                Some(name) => info!("Target channel: {} (ID: {})", name, destination),
                None => info!("Target channel ID: {}", destination),
            }

            for (source, polled) in sources.iter().zip(&polls) {
                let outcome = self
                    .evaluate(&mut store, &mut summaries, destination, source, polled)
                    .await;
                report.tally(outcome);
            }
        }

        let persisted = self.persist_with_retry(&store).await;
        if let Err(e) = persisted {
            *self.unsaved.lock().await = Some(store.into_ledger());
            return Err(e);
        }

        info!(
            delivered = report.delivered,
            duplicates = report.duplicates,
            parse_failures = report.parse_failures,
            summary_failures = report.summary_failures,
            send_failures = report.send_failures,
            "Cycle complete"
        );
        Ok(report)
    }

    async fn load_store(&self) -> DedupStore {
        if let Some(ledger) = self.unsaved.lock().await.take() {
            warn!(
                "Last write of {} failed; continuing from the delivery history held in memory",
                self.store_path.display()
            );
            return DedupStore::with_ledger(&self.store_path, ledger);
        }

        let mut store = DedupStore::new(&self.store_path);

        if let Err(e) = store.load().await {
            error!("{}; continuing with no delivery history", e);
            match store.quarantine().await {
                Ok(moved_to) => warn!("Moved unreadable state file to {}", moved_to.display()),
                Err(e) => error!("Could not move unreadable state file aside: {}", e),
            }
        }

        store
    }

    /// Poll every source once, concurrently, keeping configured order.
    async fn poll_all(&self, sources: &[FeedSource]) -> Vec<std::result::Result<Entry, ParseFailure>> {
        let poll_timeout = self.config.poll_timeout;

        let polls: Vec<_> = stream::iter(sources.iter().map(|source| async move {
            match timeout(poll_timeout, self.poller.poll(source)).await {
                Ok(result) => result,
                Err(_) => Err(ParseFailure::new(format!("timed out after {:?}", poll_timeout))),
            }
        }))
        .buffered(self.config.max_concurrent_polls.max(1))
        .collect()
        .await;

        for (source, polled) in sources.iter().zip(&polls) {
            match polled {
                Ok(entry) => debug!("Parsing complete for {}: latest is {}", source, entry.link),
                Err(failure) => warn!("Error parsing RSS feed {}: {}", source, failure),
            }
        }

        polls
    }

    async fn evaluate(
        &self,
        store: &mut DedupStore,
        summaries: &mut HashMap<String, Summary>,
        destination: Destination,
        source: &FeedSource,
        polled: &std::result::Result<Entry, ParseFailure>,
    ) -> Outcome {
        let entry = match polled {
            Ok(entry) => entry,
            Err(_) => {
                debug!("Skipping {} for channel {}: feed failed this cycle", source, destination);
                return Outcome::ParseFailure;
            }
        };

        if store.contains(destination, &entry.link) {
            debug!("Already sent {} to channel {}", entry.link, destination);
            return Outcome::Duplicate;
        }

        info!("New article: {}", entry.title);
        info!("Link: {}", entry.link);

        let summary = match summaries.get(&entry.link) {
            Some(cached) => cached.clone(),
            None => {
                let summary = self.summarize(&entry.content).await;
                summaries.insert(entry.link.clone(), summary.clone());
                summary
            }
        };

        let Some(summary) = summary else {
            warn!("No summary for {}; will retry next cycle", entry.link);
            return Outcome::SummaryFailure;
        };

        let message = compose_message(entry, &summary);
        match self.send(destination, &message).await {
            Ok(()) => {
                store.record(destination, &entry.link);
                info!("Article sent to channel {} successfully", destination);
                Outcome::Delivered
            }
            Err(e @ NotifyError::PermissionDenied { .. }) => {
                error!("Error: {}", e);
                Outcome::SendFailure
            }
            Err(e) => {
                error!("Error sending message to the channel: {}", e);
                Outcome::SendFailure
            }
        }
    }

    async fn summarize(&self, content: &str) -> Summary {
        match timeout(self.config.call_timeout, self.summarizer.summarize(content)).await {
            Ok(summary) => summary,
            Err(_) => {
                warn!("Summarization timed out after {:?}", self.config.call_timeout);
                None
            }
        }
    }

    async fn send(&self, destination: Destination, message: &str) -> std::result::Result<(), NotifyError> {
        match timeout(self.config.call_timeout, self.notifier.send(destination, message)).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::DeliveryFailed {
                destination,
                reason: format!("timed out after {:?}", self.config.call_timeout),
            }),
        }
    }

    /// Channel name, looked up once per destination. Failed lookups are
    /// retried next cycle.
    async fn describe(&self, destination: Destination) -> Option<String> {
        if let Some(name) = self.channel_names.lock().await.get(&destination) {
            return Some(name.clone());
        }

        let name = timeout(self.config.call_timeout, self.notifier.describe(destination))
            .await
            .ok()
            .flatten()?;
        self.channel_names.lock().await.insert(destination, name.clone());
        Some(name)
    }

    async fn persist_with_retry(&self, store: &DedupStore) -> Result<()> {
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: self.config.persist_initial_delay,
            initial_interval: self.config.persist_initial_delay,
            max_interval: self.config.persist_max_delay,
            multiplier: 2.0,
            randomization_factor: 0.0,
            max_elapsed_time: None,
            ..Default::default()
        };

        let attempts = self.config.persist_max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match store.persist().await {
                Ok(()) => {
                    if attempt > 1 {
                        info!("Sent articles written on attempt {}", attempt);
                    }
                    return Ok(());
                }
                Err(e) => {
                    warn!("Error writing sent articles (attempt {}/{}): {}", attempt, attempts, e);
                    last_error = Some(e);

                    if attempt < attempts {
                        let delay = backoff.next_backoff().unwrap_or(self.config.persist_max_delay);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        let reason = match last_error {
            Some(RelayError::StorageWriteFailed { reason, .. }) => reason,
            Some(other) => other.to_string(),
            None => "unknown error".to_string(),
        };
        error!(
            "Giving up writing {} after {} attempts; delivery history is at risk",
            store.path().display(),
            attempts
        );

        Err(RelayError::StorageWriteFailed {
            path: store.path().to_path_buf(),
            attempts,
            reason,
        })
    }
}
