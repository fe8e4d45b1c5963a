use crate::cycle::{CycleReport, CycleRunner};
use crate::types::{Destination, FeedSource, Result};
use std::time::Duration;
use tracing::{error, info};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(600);

/// Runs cycles back to back with a fixed sleep in between. The sleep starts
/// when a cycle finishes, so a slow cycle pushes every later one back.
pub struct Scheduler {
    runner: CycleRunner,
    destinations: Vec<Destination>,
    sources: Vec<FeedSource>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(runner: CycleRunner, destinations: Vec<Destination>, sources: Vec<FeedSource>, interval: Duration) -> Self {
        Self {
            runner,
            destinations,
            sources,
            interval,
        }
    }

    pub async fn run_once(&self) -> Result<CycleReport> {
        self.runner.run_cycle(&self.destinations, &self.sources).await
    }

    /// Never returns; stop it by dropping the future.
    pub async fn run(&self) {
        info!(
            "Watching {} feed(s) for {} channel(s) every {:?}",
            self.sources.len(),
            self.destinations.len(),
            self.interval
        );

        loop {
            if let Err(e) = self.run_once().await {
                error!("Cycle failed: {}", e);
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}
