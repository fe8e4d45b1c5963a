pub mod defs;

pub use defs::{Destination, Entry, FeedPoller, FeedSource, NotifyError, Notifier, ParseFailure, Summarizer, Summary};
