//! Ledger document model and JSON encoding.

use crate::error::{LedgerError, LedgerResult};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

/// One durable entry per delivered photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRecord {
    /// Stable identifier assigned by the photo source.
    pub photo_id: String,
    /// Collection the photo was most recently delivered from.
    pub collection_name: String,
    /// When the delivery was committed (UTC).
    pub delivered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredRecord {
    album: String,
    #[serde(serialize_with = "serialize_timestamp")]
    #[serde(deserialize_with = "deserialize_timestamp")]
    synced_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerDocument {
    #[serde(default)]
    synced_photos: BTreeMap<String, StoredRecord>,
}

/// The full ledger: one record per photo id, last write wins.
///
/// A photo id with no entry has never been delivered from any collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    records: BTreeMap<String, StoredRecord>,
}

impl Ledger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a ledger document.
    ///
    /// Blank text is treated as an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Corrupted`] if the text is not a valid ledger.
    pub fn from_json(text: &str) -> LedgerResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        let document: LedgerDocument =
            serde_json::from_str(text).map_err(|e| LedgerError::Corrupted(e.to_string()))?;
        Ok(Self {
            records: document.synced_photos,
        })
    }

    /// Encodes the ledger as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Serialize`] if encoding fails.
    pub fn to_json(&self) -> LedgerResult<String> {
        #[derive(Serialize)]
        struct DocumentRef<'a> {
            synced_photos: &'a BTreeMap<String, StoredRecord>,
        }

        serde_json::to_string_pretty(&DocumentRef {
            synced_photos: &self.records,
        })
        .map_err(|e| LedgerError::Serialize(e.to_string()))
    }

    /// Number of tracked photos.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no photo is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the record for a photo, if any.
    pub fn get(&self, photo_id: &str) -> Option<SyncRecord> {
        self.records
            .get(photo_id)
            .map(|stored| to_record(photo_id, stored))
    }

    /// Inserts a record, replacing any previous record for the same photo.
    pub fn insert(&mut self, record: SyncRecord) {
        self.records.insert(
            record.photo_id,
            StoredRecord {
                album: record.collection_name,
                synced_at: record.delivered_at,
            },
        );
    }

    /// True iff the photo's current record names `collection_name`.
    pub fn is_synced(&self, photo_id: &str, collection_name: &str) -> bool {
        self.records
            .get(photo_id)
            .is_some_and(|stored| stored.album == collection_name)
    }

    /// Photo ids, optionally restricted to one collection.
    pub fn photo_ids(&self, collection_name: Option<&str>) -> BTreeSet<String> {
        self.records
            .iter()
            .filter(|(_, stored)| collection_name.map_or(true, |name| stored.album == name))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Removes every record of a collection and returns how many were removed.
    pub fn remove_collection(&mut self, collection_name: &str) -> usize {
        let before = self.records.len();
        self.records.retain(|_, stored| stored.album != collection_name);
        before - self.records.len()
    }

    /// Iterates over all records in photo id order.
    pub fn records(&self) -> impl Iterator<Item = SyncRecord> + '_ {
        self.records
            .iter()
            .map(|(id, stored)| to_record(id, stored))
    }
}

fn to_record(photo_id: &str, stored: &StoredRecord) -> SyncRecord {
    SyncRecord {
        photo_id: photo_id.to_string(),
        collection_name: stored.album.clone(),
        delivered_at: stored.synced_at,
    }
}

fn serialize_timestamp<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

// Older ledgers carry naive ISO-8601 timestamps that were written in UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&text) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {:?}: {}", text, e)))
}
