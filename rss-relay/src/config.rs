use crate::cycle::CycleConfig;
use crate::notifier;
use crate::summarizer;
use crate::types::{Destination, FeedSource, FetchConfig, RelayError, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Relay new RSS/Atom entries, with an AI summary, to Discord channels.
///
/// Every option can also be set through the environment (or a `.env` file).
#[derive(Debug, Clone, Parser)]
#[command(name = "rss-relay", version)]
pub struct RelayArgs {
    /// Discord channel ids, comma separated
    #[arg(long, env = "DISCORD_CHANNEL_IDS", value_delimiter = ',')]
    pub channel_ids: Vec<String>,

    /// Feed URLs, comma separated
    #[arg(long, env = "RSS_FEED_URLS", value_delimiter = ',')]
    pub feed_urls: Vec<String>,

    #[arg(long, env = "DISCORD_BOT_TOKEN", hide_env_values = true)]
    pub discord_token: String,

    #[arg(long, env = "DISCORD_API_BASE", default_value = notifier::DEFAULT_API_BASE)]
    pub discord_api_base: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: String,

    #[arg(long, env = "OPENAI_MODEL", default_value = summarizer::DEFAULT_MODEL)]
    pub openai_model: String,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = summarizer::DEFAULT_BASE_URL)]
    pub openai_base_url: String,

    /// Where delivered links are remembered
    #[arg(long, env = "SENT_ARTICLES_FILE", default_value = "sent_articles.yaml")]
    pub state_file: PathBuf,

    /// Seconds to sleep between cycles
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 600)]
    pub interval_secs: u64,

    #[arg(long, env = "MAX_CONCURRENT_POLLS", default_value_t = 4)]
    pub max_concurrent_polls: usize,

    /// Timeout for each feed request, summary and message
    #[arg(long, env = "CALL_TIMEOUT_SECS", default_value_t = 60)]
    pub call_timeout_secs: u64,

    #[arg(long, env = "PERSIST_MAX_ATTEMPTS", default_value_t = 5)]
    pub persist_max_attempts: u32,

    /// Run a single cycle and exit
    #[arg(long)]
    pub once: bool,
}

/// Validated settings, built once at startup.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub destinations: Vec<Destination>,
    pub sources: Vec<FeedSource>,
    pub discord_token: String,
    pub discord_api_base: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub state_file: PathBuf,
    pub interval: Duration,
    pub cycle: CycleConfig,
    pub fetch: FetchConfig,
    pub once: bool,
}

impl RelayConfig {
    pub fn from_args(args: RelayArgs) -> Result<Self> {
        let destinations = parse_destinations(&args.channel_ids)?;
        let sources = parse_sources(&args.feed_urls)?;

        if args.discord_token.trim().is_empty() {
            return Err(RelayError::Config("DISCORD_BOT_TOKEN is empty".to_string()));
        }
        if args.openai_api_key.trim().is_empty() {
            return Err(RelayError::Config("OPENAI_API_KEY is empty".to_string()));
        }
        if args.interval_secs == 0 {
            return Err(RelayError::Config("POLL_INTERVAL_SECS must be positive".to_string()));
        }
        if args.max_concurrent_polls == 0 {
            return Err(RelayError::Config("MAX_CONCURRENT_POLLS must be positive".to_string()));
        }
        if args.call_timeout_secs == 0 {
            return Err(RelayError::Config("CALL_TIMEOUT_SECS must be positive".to_string()));
        }
        if args.persist_max_attempts == 0 {
            return Err(RelayError::Config("PERSIST_MAX_ATTEMPTS must be positive".to_string()));
        }

        let fetch = FetchConfig {
            timeout_seconds: args.call_timeout_secs,
            ..FetchConfig::default()
        };
        // A poll is a whole retrying fetch, so it gets the fetch's full budget.
        let cycle = CycleConfig {
            max_concurrent_polls: args.max_concurrent_polls,
            poll_timeout: fetch.retry_budget(),
            call_timeout: Duration::from_secs(args.call_timeout_secs),
            persist_max_attempts: args.persist_max_attempts,
            ..CycleConfig::default()
        };

        Ok(Self {
            destinations,
            sources,
            discord_token: args.discord_token,
            discord_api_base: args.discord_api_base,
            openai_api_key: args.openai_api_key,
            openai_model: args.openai_model,
            openai_base_url: args.openai_base_url,
            state_file: args.state_file,
            interval: Duration::from_secs(args.interval_secs),
            cycle,
            fetch,
            once: args.once,
        })
    }
}

fn parse_destinations(raw: &[String]) -> Result<Vec<Destination>> {
    let destinations = raw
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<Destination>()
                .map_err(|e| RelayError::Config(format!("invalid channel id {:?}: {}", id, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    if destinations.is_empty() {
        return Err(RelayError::Config("DISCORD_CHANNEL_IDS lists no channels".to_string()));
    }
    Ok(destinations)
}

fn parse_sources(raw: &[String]) -> Result<Vec<FeedSource>> {
    let sources = raw
        .iter()
        .map(|url| url.trim())
        .filter(|url| !url.is_empty())
        .map(|url| -> Result<FeedSource> {
            let parsed = Url::parse(url)?;
            match parsed.scheme() {
                "http" | "https" => Ok(FeedSource::new(url)),
                scheme => Err(RelayError::Config(format!("unsupported scheme {:?} in feed URL {}", scheme, url))),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    if sources.is_empty() {
        return Err(RelayError::Config("RSS_FEED_URLS lists no feeds".to_string()));
    }
    Ok(sources)
}
