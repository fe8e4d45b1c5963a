pub mod types;
pub mod fetcher;
pub mod parser;
pub mod poller;
pub mod store;
pub mod summarizer;
pub mod notifier;
pub mod cycle;
pub mod scheduler;
pub mod config;
pub mod relay;

pub use types::*;
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use poller::RssFeedPoller;
pub use store::{DedupStore, DeliveryLedger};
pub use summarizer::OpenAiSummarizer;
pub use notifier::{compose_message, DiscordNotifier};
pub use cycle::{CycleConfig, CycleReport, CycleRunner, Outcome};
pub use scheduler::Scheduler;
pub use config::{RelayArgs, RelayConfig};
pub use relay::RssRelay;
pub use interfaces::{FeedPoller, Notifier, Summarizer};
