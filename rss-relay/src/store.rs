use crate::types::{Destination, RelayError, Result};
use chrono::Utc;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_yaml::Value;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Links delivered to one destination, in delivery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryRecord {
    links: Vec<String>,
    index: HashSet<String>,
}

impl DeliveryRecord {
    pub fn links(&self) -> &[String] {
        &self.links
    }

    fn insert(&mut self, link: &str) -> bool {
        if self.index.contains(link) {
            return false;
        }
        self.index.insert(link.to_string());
        self.links.push(link.to_string());
        true
    }
}

/// Destination → delivered links. Destinations keep the order in which they
/// were first recorded (or read from disk).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryLedger {
    records: Vec<(Destination, DeliveryRecord)>,
}

impl DeliveryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, destination: Destination, link: &str) -> bool {
        self.record_for(destination)
            .map(|record| record.index.contains(link))
            .unwrap_or(false)
    }

    /// Returns `false` when the link was already recorded.
    pub fn record(&mut self, destination: Destination, link: &str) -> bool {
        let position = match self.records.iter().position(|(d, _)| *d == destination) {
            Some(position) => position,
            None => {
                self.records.push((destination, DeliveryRecord::default()));
                self.records.len() - 1
            }
        };
        self.records[position].1.insert(link)
    }

    pub fn links(&self, destination: Destination) -> &[String] {
        self.record_for(destination).map(DeliveryRecord::links).unwrap_or(&[])
    }

    pub fn destinations(&self) -> impl Iterator<Item = Destination> + '_ {
        self.records.iter().map(|(d, _)| *d)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Accepts an empty document, integer or numeric-string keys, and null
    /// values. Duplicate links collapse to their first occurrence.
    pub fn from_yaml(text: &str) -> std::result::Result<Self, String> {
        let value: Value = serde_yaml::from_str(text).map_err(|e| e.to_string())?;
        let mapping = match value {
            Value::Null => return Ok(Self::new()),
            Value::Mapping(mapping) => mapping,
            other => return Err(format!("expected a mapping at the top level, found {}", describe(&other))),
        };

        let mut ledger = Self::new();
        for (key, links) in mapping {
            let destination = match &key {
                Value::Number(n) => n.as_u64().map(Destination),
                Value::String(s) => s.parse().ok(),
                _ => None,
            }
            .ok_or_else(|| format!("invalid channel id key: {}", describe(&key)))?;

            if ledger.record_for(destination).is_none() {
                ledger.records.push((destination, DeliveryRecord::default()));
            }

            match links {
                Value::Null => {}
                Value::Sequence(items) => {
                    for item in items {
                        let link = item
                            .as_str()
                            .ok_or_else(|| format!("channel {} has a non-string link: {}", destination, describe(&item)))?;
                        ledger.record(destination, link);
                    }
                }
                other => return Err(format!("channel {} maps to {}, expected a list", destination, describe(&other))),
            }
        }

        Ok(ledger)
    }

    fn record_for(&self, destination: Destination) -> Option<&DeliveryRecord> {
        self.records
            .iter()
            .find(|(d, _)| *d == destination)
            .map(|(_, record)| record)
    }
}

impl Serialize for DeliveryLedger {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.records.len()))?;
        for (destination, record) in &self.records {
            map.serialize_entry(&destination.0, &record.links)?;
        }
        map.end()
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("{:?}", s),
        Value::Sequence(_) => "a list".to_string(),
        Value::Mapping(_) => "a mapping".to_string(),
        Value::Tagged(_) => "a tagged value".to_string(),
    }
}

/// The YAML file of delivered links. Owned by one cycle at a time.
#[derive(Debug)]
pub struct DedupStore {
    path: PathBuf,
    ledger: DeliveryLedger,
}

impl DedupStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ledger: DeliveryLedger::new(),
        }
    }

    /// A store whose in-memory ledger is already known, e.g. one that was
    /// recorded into but never written.
    pub fn with_ledger(path: impl Into<PathBuf>, ledger: DeliveryLedger) -> Self {
        Self {
            path: path.into(),
            ledger,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ledger(&self) -> &DeliveryLedger {
        &self.ledger
    }

    pub fn into_ledger(self) -> DeliveryLedger {
        self.ledger
    }

    /// Replace the in-memory ledger with the file contents. A missing file
    /// yields an empty ledger; on error the ledger is left empty.
    pub async fn load(&mut self) -> Result<()> {
        self.ledger = DeliveryLedger::new();

        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No sent articles file at {}, starting empty", self.path.display());
                return Ok(());
            }
            Err(e) => {
                return Err(RelayError::StorageUnavailable {
                    path: self.path.clone(),
                    reason: e.to_string(),
                })
            }
        };

        self.ledger = DeliveryLedger::from_yaml(&text).map_err(|reason| RelayError::StorageUnavailable {
            path: self.path.clone(),
            reason,
        })?;

        debug!("Loaded sent articles for {} channel(s)", self.ledger.len());
        Ok(())
    }

    pub fn contains(&self, destination: Destination, link: &str) -> bool {
        self.ledger.contains(destination, link)
    }

    pub fn record(&mut self, destination: Destination, link: &str) -> bool {
        self.ledger.record(destination, link)
    }

    /// Write the whole ledger, replacing the file atomically.
    pub async fn persist(&self) -> Result<()> {
        let write_failed = |reason: String| RelayError::StorageWriteFailed {
            path: self.path.clone(),
            attempts: 1,
            reason,
        };

        let yaml = self.ledger.to_yaml().map_err(|e| write_failed(e.to_string()))?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomically(&path, &yaml))
            .await
            .map_err(|e| write_failed(e.to_string()))?
            .map_err(|e| write_failed(e.to_string()))?;

        debug!("Wrote sent articles to {}", self.path.display());
        Ok(())
    }

    /// Move an unreadable file out of the way so the next persist does not
    /// overwrite it. Returns the new location.
    pub async fn quarantine(&self) -> Result<PathBuf> {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%SZ")));
        let target = PathBuf::from(name);

        tokio::fs::rename(&self.path, &target).await?;
        Ok(target)
    }
}

fn write_atomically(path: &Path, contents: &str) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
