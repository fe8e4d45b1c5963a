mod common;

use common::init_tracing;
use rss_relay::{DedupStore, DeliveryLedger, Destination, RelayError, Result};
use tempfile::TempDir;

#[tokio::test]
async fn test_missing_file_loads_empty() -> Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let mut store = DedupStore::new(dir.path().join("sent_articles.yaml"));

    store.load().await?;

    assert!(store.ledger().is_empty());
    assert!(!store.contains(Destination(1), "https://x/1"));
    Ok(())
}

#[tokio::test]
async fn test_persist_then_load_round_trips_in_order() -> Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let path = dir.path().join("sent_articles.yaml");

    let mut store = DedupStore::new(&path);
    store.record(Destination(300), "https://x/3");
    store.record(Destination(100), "https://x/1");
    store.record(Destination(300), "https://x/2");
    store.persist().await?;

    let mut reloaded = DedupStore::new(&path);
    reloaded.load().await?;

    assert_eq!(reloaded.ledger(), store.ledger());
    let order: Vec<Destination> = reloaded.ledger().destinations().collect();
    assert_eq!(order, vec![Destination(300), Destination(100)]);
    assert_eq!(
        reloaded.ledger().links(Destination(300)),
        &["https://x/3".to_string(), "https://x/2".to_string()]
    );

    // Writing what was read produces the same document.
    let first = std::fs::read_to_string(&path)?;
    reloaded.persist().await?;
    assert_eq!(std::fs::read_to_string(&path)?, first);
    Ok(())
}

#[test]
fn test_record_is_append_once() {
    let mut ledger = DeliveryLedger::new();

    assert!(ledger.record(Destination(1), "https://x/1"));
    assert!(!ledger.record(Destination(1), "https://x/1"));
    assert!(ledger.record(Destination(2), "https://x/1"));

    assert_eq!(ledger.links(Destination(1)).len(), 1);
    assert!(ledger.contains(Destination(2), "https://x/1"));
}

#[test]
fn test_yaml_layout_uses_integer_keys_and_link_lists() {
    let mut ledger = DeliveryLedger::new();
    ledger.record(Destination(123456789012345678), "https://x/1");
    ledger.record(Destination(123456789012345678), "https://x/2");

    let yaml = ledger.to_yaml().unwrap();

    assert_eq!(yaml, "123456789012345678:\n- https://x/1\n- https://x/2\n");
}

#[test]
fn test_reads_documents_written_by_earlier_versions() {
    let yaml = "\
1001:
- https://x/1
- https://x/2
- https://x/1
'2002':
3003:
";

    let ledger = DeliveryLedger::from_yaml(yaml).unwrap();

    assert_eq!(ledger.links(Destination(1001)), &["https://x/1".to_string(), "https://x/2".to_string()]);
    assert!(ledger.links(Destination(2002)).is_empty());
    assert_eq!(ledger.len(), 3);
    assert!(DeliveryLedger::from_yaml("").unwrap().is_empty());
}

#[test]
fn test_rejects_malformed_documents() {
    assert!(DeliveryLedger::from_yaml("- just\n- a list\n").is_err());
    assert!(DeliveryLedger::from_yaml("channel: [https://x/1]\n").is_err());
    assert!(DeliveryLedger::from_yaml("1001: https://x/1\n").is_err());
    assert!(DeliveryLedger::from_yaml("1001: [1, 2]\n").is_err());
}

#[tokio::test]
async fn test_corrupt_file_reports_storage_unavailable() -> Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let path = dir.path().join("sent_articles.yaml");
    std::fs::write(&path, "1001: {unterminated")?;

    let mut store = DedupStore::new(&path);
    let err = store.load().await.unwrap_err();

    assert!(matches!(err, RelayError::StorageUnavailable { .. }));
    assert!(store.ledger().is_empty());

    let moved = store.quarantine().await?;
    assert!(!path.exists());
    assert!(moved.exists());
    Ok(())
}
