//! Ledger store: the dedup ledger on top of a backend.

use crate::backend::LedgerBackend;
use crate::document::{Ledger, SyncRecord};
use crate::error::LedgerResult;
use crate::short_id;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Durable map of photo id to its most recent delivery.
///
/// Every operation loads the full document, works on it in memory and, for
/// mutations, writes the full document back. There is no caching between
/// calls, so each answer reflects the store as it is now.
///
/// # Failure semantics
///
/// - Reads (`is_synced`, `list_synced`, `record`) never fail. An unreachable
///   or malformed document is logged and treated as an empty ledger, which
///   favors redelivering a photo over silently skipping it.
/// - Writes (`mark_synced`, `clear`) propagate persistence errors. A corrupt
///   document is replaced by a fresh one; an unreachable store aborts the
///   write instead of overwriting records that could not be read.
pub struct LedgerStore<B: LedgerBackend> {
    backend: B,
}

impl<B: LedgerBackend> LedgerStore<B> {
    /// Creates a store over the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Loads the full ledger without degrading errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be loaded or parsed.
    pub fn snapshot(&self) -> LedgerResult<Ledger> {
        let ledger = match self.backend.load()? {
            Some(text) => Ledger::from_json(&text)?,
            None => Ledger::new(),
        };
        debug!(
            backend = %self.backend.describe(),
            tracked = ledger.len(),
            "loaded ledger"
        );
        Ok(ledger)
    }

    fn load_degraded(&self) -> Ledger {
        match self.snapshot() {
            Ok(ledger) => ledger,
            Err(e) => {
                warn!(
                    backend = %self.backend.describe(),
                    error = %e,
                    "ledger unreadable, treating every photo as unsynced"
                );
                Ledger::new()
            }
        }
    }

    fn load_for_write(&self) -> LedgerResult<Ledger> {
        match self.snapshot() {
            Err(e) if e.is_corruption() => {
                warn!(
                    backend = %self.backend.describe(),
                    error = %e,
                    "ledger document corrupted, starting a fresh one"
                );
                Ok(Ledger::new())
            }
            other => other,
        }
    }

    fn persist(&self, ledger: &Ledger) -> LedgerResult<()> {
        let text = ledger.to_json()?;
        self.backend.save(&text)?;
        debug!(backend = %self.backend.describe(), tracked = ledger.len(), "saved ledger");
        Ok(())
    }

    /// True iff the photo's current record names `collection_name`.
    ///
    /// A photo delivered from another collection is reported as not synced.
    pub fn is_synced(&self, photo_id: &str, collection_name: &str) -> bool {
        let ledger = self.load_degraded();
        let synced = ledger.is_synced(photo_id, collection_name);
        if synced {
            if let Some(record) = ledger.get(photo_id) {
                debug!(
                    photo = short_id(photo_id),
                    synced_at = %record.delivered_at,
                    "photo already synced"
                );
            }
        }
        synced
    }

    /// Records a successful delivery, stamped with the current UTC time.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be loaded or written. The caller
    /// must not assume the mark happened unless this returns `Ok`.
    pub fn mark_synced(&self, photo_id: &str, collection_name: &str) -> LedgerResult<SyncRecord> {
        self.mark_synced_at(photo_id, collection_name, Utc::now())
    }

    /// Records a delivery with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Same as [`LedgerStore::mark_synced`].
    pub fn mark_synced_at(
        &self,
        photo_id: &str,
        collection_name: &str,
        delivered_at: DateTime<Utc>,
    ) -> LedgerResult<SyncRecord> {
        info!(
            photo = short_id(photo_id),
            collection = collection_name,
            "marking photo as synced"
        );
        let mut ledger = self.load_for_write()?;
        let record = SyncRecord {
            photo_id: photo_id.to_string(),
            collection_name: collection_name.to_string(),
            delivered_at,
        };
        ledger.insert(record.clone());
        self.persist(&ledger)?;
        Ok(record)
    }

    /// All tracked photo ids, optionally restricted to one collection.
    pub fn list_synced(&self, collection_name: Option<&str>) -> BTreeSet<String> {
        let ids = self.load_degraded().photo_ids(collection_name);
        match collection_name {
            Some(name) => info!(collection = name, count = ids.len(), "listed synced photos"),
            None => info!(count = ids.len(), "listed all synced photos"),
        }
        ids
    }

    /// The current record of a photo, if any.
    pub fn record(&self, photo_id: &str) -> Option<SyncRecord> {
        self.load_degraded().get(photo_id)
    }

    /// Forgets every delivery from a collection and returns how many records were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be loaded or written.
    pub fn clear(&self, collection_name: &str) -> LedgerResult<usize> {
        info!(collection = collection_name, "clearing sync history");
        let mut ledger = self.load_for_write()?;
        let removed = ledger.remove_collection(collection_name);
        self.persist(&ledger)?;
        info!(collection = collection_name, removed, "cleared sync history");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryBackend;
    use std::sync::Arc;

    fn store() -> LedgerStore<Arc<InMemoryBackend>> {
        LedgerStore::new(Arc::new(InMemoryBackend::new()))
    }

    #[test]
    fn empty_ledger_has_nothing_synced() {
        let store = store();
        assert!(!store.is_synced("p1", "A"));
        assert!(store.list_synced(None).is_empty());
        assert_eq!(store.record("p1"), None);
    }

    #[test]
    fn mark_then_query_same_collection() {
        let store = store();
        store.mark_synced("p1", "A").unwrap();
        assert!(store.is_synced("p1", "A"));
    }

    #[test]
    fn collections_are_isolated() {
        let store = store();
        store.mark_synced("p1", "A").unwrap();
        assert!(!store.is_synced("p1", "B"));
    }

    #[test]
    fn later_mark_overwrites_collection() {
        let store = store();
        store.mark_synced("p1", "A").unwrap();
        store.mark_synced("p1", "B").unwrap();

        assert!(!store.is_synced("p1", "A"));
        assert!(store.is_synced("p1", "B"));
        assert_eq!(store.list_synced(None).len(), 1);
    }

    #[test]
    fn list_synced_filters_by_collection() {
        let store = store();
        store.mark_synced("p1", "A").unwrap();
        store.mark_synced("p2", "B").unwrap();
        store.mark_synced("p3", "A").unwrap();

        let a: Vec<_> = store.list_synced(Some("A")).into_iter().collect();
        assert_eq!(a, vec!["p1", "p3"]);
        assert_eq!(store.list_synced(None).len(), 3);
    }

    #[test]
    fn clear_removes_only_that_collection() {
        let store = store();
        store.mark_synced("p1", "A").unwrap();
        store.mark_synced("p2", "B").unwrap();

        assert_eq!(store.clear("A").unwrap(), 1);
        assert!(!store.is_synced("p1", "A"));
        assert!(store.is_synced("p2", "B"));
    }

    #[test]
    fn clear_unknown_collection_still_persists() {
        let store = store();
        assert_eq!(store.clear("nothing").unwrap(), 0);
        assert_eq!(store.backend().save_count(), 1);
    }

    #[test]
    fn corrupt_document_reads_as_empty() {
        let store = LedgerStore::new(InMemoryBackend::with_document("{ definitely not json"));
        assert!(!store.is_synced("p1", "A"));
        assert!(store.list_synced(None).is_empty());
        assert!(store.snapshot().is_err());
    }

    #[test]
    fn mark_after_corruption_replaces_document() {
        let store = LedgerStore::new(InMemoryBackend::with_document("garbage"));
        store.mark_synced("p1", "A").unwrap();

        assert!(store.is_synced("p1", "A"));
        assert_eq!(store.snapshot().unwrap().len(), 1);
    }

    #[test]
    fn unreachable_store_reads_as_empty() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = LedgerStore::new(Arc::clone(&backend));
        store.mark_synced("p1", "A").unwrap();

        backend.set_fail_reads(true);
        assert!(!store.is_synced("p1", "A"));
    }

    #[test]
    fn unreachable_store_rejects_writes() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = LedgerStore::new(Arc::clone(&backend));
        store.mark_synced("p1", "A").unwrap();

        backend.set_fail_reads(true);
        assert!(store.mark_synced("p2", "A").is_err());

        backend.set_fail_reads(false);
        assert!(store.is_synced("p1", "A"));
        assert!(!store.is_synced("p2", "A"));
    }

    #[test]
    fn failed_write_propagates() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = LedgerStore::new(Arc::clone(&backend));

        backend.set_fail_writes(true);
        assert!(store.mark_synced("p1", "A").is_err());
        assert!(store.clear("A").is_err());

        backend.set_fail_writes(false);
        assert!(!store.is_synced("p1", "A"));
    }

    #[test]
    fn record_exposes_timestamp() {
        let store = store();
        let at = DateTime::parse_from_rfc3339("2024-06-01T08:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        store.mark_synced_at("p1", "A", at).unwrap();

        let record = store.record("p1").unwrap();
        assert_eq!(record.collection_name, "A");
        assert_eq!(record.delivered_at, at);
    }
}
