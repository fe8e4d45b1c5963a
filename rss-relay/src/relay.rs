use crate::config::RelayConfig;
use crate::cycle::{CycleReport, CycleRunner};
use crate::fetcher::Fetcher;
use crate::notifier::DiscordNotifier;
use crate::poller::RssFeedPoller;
use crate::scheduler::Scheduler;
use crate::summarizer::OpenAiSummarizer;
use crate::types::Result;
use reqwest::Client;
use std::sync::Arc;
use tracing::info;

/// Everything the bot needs, wired once at startup and passed down
/// explicitly.
pub struct RssRelay {
    notifier: Arc<DiscordNotifier>,
    scheduler: Scheduler,
}

impl RssRelay {
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let api_client = Client::builder()
            .user_agent(&config.fetch.user_agent)
            .timeout(config.cycle.call_timeout)
            .build()?;

        let notifier = Arc::new(DiscordNotifier::new(
            api_client.clone(),
            config.discord_token.clone(),
            config.discord_api_base.clone(),
        ));
        let summarizer = Arc::new(OpenAiSummarizer::new(
            api_client,
            config.openai_api_key.clone(),
            config.openai_model.clone(),
            config.openai_base_url.clone(),
        ));
        let poller = Arc::new(RssFeedPoller::new(Fetcher::new(config.fetch.clone())?));

        let runner = CycleRunner::new(
            poller,
            summarizer,
            notifier.clone(),
            config.state_file.clone(),
            config.cycle.clone(),
        );
        let scheduler = Scheduler::new(
            runner,
            config.destinations.clone(),
            config.sources.clone(),
            config.interval,
        );

        info!(
            "Relay configured: {} channel(s), {} feed(s), state file {}",
            config.destinations.len(),
            config.sources.len(),
            config.state_file.display()
        );

        Ok(Self { notifier, scheduler })
    }

    /// Check the bot token; returns the bot's user name.
    pub async fn login(&self) -> Result<String> {
        self.notifier.current_user().await
    }

    pub async fn run_once(&self) -> Result<CycleReport> {
        self.scheduler.run_once().await
    }

    pub async fn run(&self) {
        self.scheduler.run().await
    }
}
