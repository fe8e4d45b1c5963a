use clap::Parser;
use rss_relay::{Destination, FeedSource, RelayArgs, RelayConfig, RelayError};
use std::path::PathBuf;
use std::time::Duration;

fn args(extra: &[&str]) -> RelayArgs {
    let mut argv = vec![
        "rss-relay",
        "--discord-token",
        "token",
        "--openai-api-key",
        "sk-test",
    ];
    argv.extend_from_slice(extra);
    RelayArgs::try_parse_from(argv).expect("arguments should parse")
}

#[test]
fn test_comma_separated_lists_and_defaults() {
    let config = RelayConfig::from_args(args(&[
        "--channel-ids",
        "1001, 2002",
        "--feed-urls",
        "https://a.example/rss,https://b.example/atom",
    ]))
    .unwrap();

    assert_eq!(config.destinations, vec![Destination(1001), Destination(2002)]);
    assert_eq!(
        config.sources,
        vec![
            FeedSource::new("https://a.example/rss"),
            FeedSource::new("https://b.example/atom")
        ]
    );
    assert_eq!(config.interval, Duration::from_secs(600));
    assert_eq!(config.state_file, PathBuf::from("sent_articles.yaml"));
    assert_eq!(config.openai_model, "gpt-4o");
    assert_eq!(config.cycle.persist_max_attempts, 5);
    assert!(!config.once);
}

#[test]
fn test_rejects_bad_channel_ids() {
    let result = RelayConfig::from_args(args(&[
        "--channel-ids",
        "1001,general",
        "--feed-urls",
        "https://a.example/rss",
    ]));

    assert!(matches!(result, Err(RelayError::Config(_))));
}

#[test]
fn test_rejects_empty_lists() {
    let no_channels = RelayConfig::from_args(args(&["--feed-urls", "https://a.example/rss"]));
    assert!(matches!(no_channels, Err(RelayError::Config(_))));

    let no_feeds = RelayConfig::from_args(args(&["--channel-ids", "1001", "--feed-urls", " , "]));
    assert!(matches!(no_feeds, Err(RelayError::Config(_))));
}

#[test]
fn test_rejects_non_http_feeds() {
    let ftp = RelayConfig::from_args(args(&["--channel-ids", "1001", "--feed-urls", "ftp://a.example/rss"]));
    assert!(matches!(ftp, Err(RelayError::Config(_))));

    let relative = RelayConfig::from_args(args(&["--channel-ids", "1001", "--feed-urls", "feeds/rss.xml"]));
    assert!(matches!(relative, Err(RelayError::InvalidUrl(_))));
}

#[test]
fn test_rejects_zero_interval() {
    let result = RelayConfig::from_args(args(&[
        "--channel-ids",
        "1001",
        "--feed-urls",
        "https://a.example/rss",
        "--interval-secs",
        "0",
    ]));

    assert!(matches!(result, Err(RelayError::Config(_))));
}

#[test]
fn test_poll_timeout_covers_every_fetch_retry() {
    let config = RelayConfig::from_args(args(&[
        "--channel-ids",
        "1001",
        "--feed-urls",
        "https://a.example/rss",
        "--call-timeout-secs",
        "60",
    ]))
    .unwrap();

    assert_eq!(config.fetch.timeout_seconds, 60);
    assert_eq!(config.cycle.call_timeout, Duration::from_secs(60));
    // Three 60 s attempts plus the 2 s and 4 s backoff sleeps at full jitter.
    assert_eq!(config.cycle.poll_timeout, Duration::from_secs(3 * 60 + 3 + 6));
    assert!(config.cycle.poll_timeout > config.cycle.call_timeout * (config.fetch.max_retries + 1));
}
