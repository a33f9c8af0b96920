//! Wisdom: persisted hints mapping a transform configuration to the family that measured fastest.
//!
//! Wisdom is advisory. A missing entry is never an error, and the resolver still validates every
//! hint before using it. Files are JSON Lines, one record per entry:
//!
//! ```text
//! {"Size":1024,"PrecisionTag":1,"CPUFeatureMask":5,"Algorithm":"recursive","Timestamp":1700000000}
//! ```
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::precision::Precision;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WisdomKey {
    pub size: usize,
    pub precision: Precision,
    /// [`CapabilityVector::mask`](crate::CapabilityVector::mask) of the measuring session
    pub capability_mask: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WisdomEntry {
    pub algorithm: String,
    /// Unix seconds; informational only
    pub timestamp: i64,
}

#[derive(Debug, Error)]
pub enum WisdomError {
    #[error("wisdom I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed wisdom record on line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid wisdom record on line {line}: {reason}")]
    InvalidRecord { line: usize, reason: String },
}

/// One line of a wisdom file
#[derive(Debug, Serialize, Deserialize)]
struct WisdomRecord {
    #[serde(rename = "Size")]
    size: usize,
    #[serde(rename = "PrecisionTag")]
    precision: Precision,
    #[serde(rename = "CPUFeatureMask")]
    capability_mask: u32,
    #[serde(rename = "Algorithm")]
    algorithm: String,
    #[serde(rename = "Timestamp")]
    timestamp: i64,
}

impl WisdomRecord {
    fn into_parts(self) -> (WisdomKey, WisdomEntry) {
        (
            WisdomKey {
                size: self.size,
                precision: self.precision,
                capability_mask: self.capability_mask,
            },
            WisdomEntry {
                algorithm: self.algorithm,
                timestamp: self.timestamp,
            },
        )
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs() as i64)
}

/// Thread-safe wisdom map. Writers are serialized; readers run concurrently.
#[derive(Debug, Default)]
pub struct WisdomCache {
    entries: RwLock<HashMap<WisdomKey, WisdomEntry>>,
}

impl WisdomCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; the last write wins.
    pub fn store(&self, key: WisdomKey, entry: WisdomEntry) {
        self.entries.write().insert(key, entry);
    }

    /// [`Self::store`] stamped with the current time.
    pub fn record(&self, key: WisdomKey, algorithm: impl Into<String>) {
        self.store(
            key,
            WisdomEntry {
                algorithm: algorithm.into(),
                timestamp: unix_now(),
            },
        );
    }

    pub fn lookup(&self, key: &WisdomKey) -> Option<WisdomEntry> {
        self.entries.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// All keys, sorted
    pub fn keys(&self) -> Vec<WisdomKey> {
        let mut keys: Vec<WisdomKey> = self.entries.read().keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Write every entry as one JSON line, sorted by key.
    pub fn export_to_writer<W: Write>(&self, mut writer: W) -> Result<(), WisdomError> {
        let mut records: Vec<(WisdomKey, WisdomEntry)> = self
            .entries
            .read()
            .iter()
            .map(|(key, entry)| (*key, entry.clone()))
            .collect();
        records.sort_unstable_by_key(|(key, _)| *key);

        for (key, entry) in records {
            let record = WisdomRecord {
                size: key.size,
                precision: key.precision,
                capability_mask: key.capability_mask,
                algorithm: entry.algorithm,
                timestamp: entry.timestamp,
            };
            serde_json::to_writer(&mut writer, &record).map_err(std::io::Error::from)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Parse every record of `reader`, then upsert them all.
    ///
    /// Blank lines are skipped. On any error the cache is left untouched. Returns the number of
    /// records imported.
    pub fn import_from_reader<R: Read>(&self, reader: R) -> Result<usize, WisdomError> {
        let mut parsed = Vec::new();

        for (index, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let line_number = index + 1;

            let record: WisdomRecord =
                serde_json::from_str(&line).map_err(|source| WisdomError::Malformed {
                    line: line_number,
                    source,
                })?;
            if record.size == 0 {
                return Err(WisdomError::InvalidRecord {
                    line: line_number,
                    reason: "size must be positive".to_string(),
                });
            }
            parsed.push(record.into_parts());
        }

        let count = parsed.len();
        self.entries.write().extend(parsed);
        Ok(count)
    }

    pub fn export<P: AsRef<Path>>(&self, path: P) -> Result<(), WisdomError> {
        let file = File::create(path)?;
        self.export_to_writer(BufWriter::new(file))
    }

    pub fn import<P: AsRef<Path>>(&self, path: P) -> Result<usize, WisdomError> {
        let file = File::open(path)?;
        self.import_from_reader(file)
    }
}
