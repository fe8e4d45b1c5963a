use crate::types::{Entry, ParseFailure, ParsedEntry, ParsedFeed, RelayError, Result};
use chrono::Utc;
use feed_rs::parser;
use tracing::debug;

const UNTITLED: &str = "Untitled";

pub struct FeedParser;

impl FeedParser {
    pub fn parse_feed(content: &str) -> Result<ParsedFeed> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| RelayError::Parse(format!("Failed to parse feed: {}", e)))?;

        let title = feed.title.map(|t| t.content);
        let entries: Vec<ParsedEntry> = feed.entries.into_iter().map(Self::parse_entry).collect();

        debug!("Parsed feed with {} entries", entries.len());

        Ok(ParsedFeed { title, entries })
    }

    fn parse_entry(entry: feed_rs::model::Entry) -> ParsedEntry {
        let guid = if entry.id.is_empty() { None } else { Some(entry.id.clone()) };
        let url = entry.links.first().map(|link| link.href.clone());
        let title = entry.title.map(|t| t.content);
        let summary = entry.summary.map(|s| s.content);

        let description = entry
            .content
            .and_then(|content| content.body)
            .or_else(|| {
                entry
                    .media
                    .into_iter()
                    .find_map(|media| media.description.map(|d| d.content))
            });

        ParsedEntry {
            guid,
            url,
            title,
            summary,
            description,
            published_at: entry.published.map(|dt| dt.with_timezone(&Utc)),
        }
    }

    /// Reduce a parsed feed to its newest entry: the first one in document order.
    pub fn latest_entry(feed: ParsedFeed) -> std::result::Result<Entry, ParseFailure> {
        let first = feed
            .entries
            .into_iter()
            .next()
            .ok_or_else(|| ParseFailure::new("feed has no entries"))?;

        first.into_entry()
    }
}

impl ParsedEntry {
    /// Summary if present, otherwise description. Blank text counts as missing.
    pub fn content(&self) -> Option<&str> {
        non_blank(&self.summary).or_else(|| non_blank(&self.description))
    }

    pub fn into_entry(self) -> std::result::Result<Entry, ParseFailure> {
        let link = self
            .url
            .clone()
            .filter(|link| !link.trim().is_empty())
            .ok_or_else(|| ParseFailure::new("latest entry has no link"))?;

        let content = self
            .content()
            .map(str::to_string)
            .ok_or_else(|| ParseFailure::new(format!("latest entry {} has no summary or description", link)))?;

        let title = self
            .title
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());

        Ok(Entry { title, link, content })
    }
}

fn non_blank(text: &Option<String>) -> Option<&str> {
    text.as_deref().filter(|t| !t.trim().is_empty())
}
