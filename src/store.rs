//! Append-only content store.
//!
//! All challenges ever generated live in one JSON array (`challenges.json`
//! by default), oldest first. The array is the single source of truth for
//! every published page; nothing else is persisted between runs.
//!
//! ## Write discipline
//!
//! [`ContentStore::append`] serializes the *new* sequence and writes it as
//! one blob before touching the in-memory copy. If the write fails, the
//! store still holds exactly what is on disk and the caller aborts the run,
//! so no page is ever rendered from a record that was not persisted.
//!
//! The on-disk format is pretty-printed JSON with a trailing newline so each
//! day's append is a small, reviewable diff.

use crate::blob::BlobStore;
use crate::types::ContentRecord;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed store {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("A challenge for {0} already exists")]
    DuplicateDate(String),
}

/// Ordered, append-only sequence of challenge entries backed by one blob.
///
/// Entries are kept as raw JSON so that an entry this version cannot decode
/// (hand-edited, or written by an older generator) is carried through every
/// append untouched. Decoding into [`ContentRecord`] happens on read.
#[derive(Debug)]
pub struct ContentStore<B> {
    blobs: B,
    key: String,
    entries: Vec<Value>,
}

impl<B: BlobStore> ContentStore<B> {
    /// Load the store from `key`. A missing or blank blob is an empty store.
    ///
    /// Only a blob that is not a JSON array is an error; individual entries
    /// are not validated here.
    pub fn load(blobs: B, key: impl Into<String>) -> Result<Self, StoreError> {
        let key = key.into();
        let bytes = blobs.read(&key).map_err(|source| StoreError::Io {
            key: key.clone(),
            source,
        })?;
        let entries = match bytes {
            Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => {
                serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
                    key: key.clone(),
                    source,
                })?
            }
            _ => Vec::new(),
        };
        Ok(Self {
            blobs,
            key,
            entries,
        })
    }

    /// Append a record and persist the whole sequence.
    ///
    /// On error the in-memory sequence is unchanged.
    pub fn append(&mut self, record: ContentRecord) -> Result<(), StoreError> {
        if self.contains_date(&record.date) {
            return Err(StoreError::DuplicateDate(record.date));
        }
        let json_err = |source| StoreError::Json {
            key: self.key.clone(),
            source,
        };

        let mut next = Vec::with_capacity(self.entries.len() + 1);
        next.extend(self.entries.iter().cloned());
        next.push(serde_json::to_value(&record).map_err(json_err)?);

        let bytes = serialize(&next).map_err(json_err)?;
        self.blobs
            .write(&self.key, &bytes)
            .map_err(|source| StoreError::Io {
                key: self.key.clone(),
                source,
            })?;

        self.entries = next;
        Ok(())
    }

    /// Most recent entry, if it decodes.
    pub fn latest(&self) -> Option<ContentRecord> {
        self.entries
            .last()
            .and_then(|entry| ContentRecord::from_entry(entry).ok())
    }

    /// Every raw entry, oldest first.
    pub fn entries(&self) -> &[Value] {
        &self.entries
    }

    /// Every entry that decodes, oldest first. Malformed entries are left out.
    pub fn records(&self) -> Vec<ContentRecord> {
        self.entries
            .iter()
            .filter_map(|entry| match ContentRecord::from_entry(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(key = %self.key, error = %e, "Ignoring malformed store entry");
                    None
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any entry, decodable or not, carries this date.
    pub fn contains_date(&self, date: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.get("date").and_then(Value::as_str) == Some(date))
    }

    /// Blob key this store persists to.
    pub fn key(&self) -> &str {
        &self.key
    }
}

fn serialize(entries: &[Value]) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = serde_json::to_vec_pretty(entries)?;
    bytes.push(b'\n');
    Ok(bytes)
}
