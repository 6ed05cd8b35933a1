//! Integration tests for the ledger store over real backends.

use aura_ledger::{FileBackend, InMemoryBackend, Ledger, LedgerStore, SyncRecord};
use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::BTreeMap;
use tempfile::TempDir;

fn file_store(dir: &TempDir) -> LedgerStore<FileBackend> {
    LedgerStore::new(FileBackend::new(&dir.path().join("synced_photos.json")))
}

#[test]
fn file_ledger_survives_reopen() {
    let dir = TempDir::new().unwrap();

    let store = file_store(&dir);
    store.mark_synced("6F3A9C1E-0B7D", "Family").unwrap();
    store.mark_synced("7A1B2C3D-9E8F", "Holidays").unwrap();
    drop(store);

    let reopened = file_store(&dir);
    assert!(reopened.is_synced("6F3A9C1E-0B7D", "Family"));
    assert!(reopened.is_synced("7A1B2C3D-9E8F", "Holidays"));
    assert_eq!(reopened.list_synced(None).len(), 2);
}

#[test]
fn file_ledger_round_trips_records() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);

    let base = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let mut written = Vec::new();
    for i in 0..5 {
        let at = base + chrono::Duration::microseconds(i * 1_234_567);
        let collection = if i % 2 == 0 { "Even" } else { "Odd" };
        written.push(store.mark_synced_at(&format!("photo-{i}"), collection, at).unwrap());
    }

    let reloaded: Vec<SyncRecord> = file_store(&dir).snapshot().unwrap().records().collect();
    assert_eq!(reloaded, written);
}

#[test]
fn legacy_document_is_readable() {
    let legacy = r#"{
  "synced_photos": {
    "ABCDEF01-2345": {
      "album": "Kids",
      "synced_at": "2024-03-09T17:45:12.503211"
    }
  }
}"#;
    let store = LedgerStore::new(InMemoryBackend::with_document(legacy));

    assert!(store.is_synced("ABCDEF01-2345", "Kids"));
    let record = store.record("ABCDEF01-2345").unwrap();
    assert_eq!(record.delivered_at.timestamp(), 1_710_006_312);
}

#[test]
fn saved_document_uses_wire_layout() {
    let backend = std::sync::Arc::new(InMemoryBackend::new());
    let store = LedgerStore::new(std::sync::Arc::clone(&backend));
    store.mark_synced("p1", "Family").unwrap();

    let document: serde_json::Value =
        serde_json::from_str(&backend.document().unwrap()).unwrap();
    let entry = &document["synced_photos"]["p1"];
    assert_eq!(entry["album"], "Family");
    assert!(DateTime::parse_from_rfc3339(entry["synced_at"].as_str().unwrap()).is_ok());
}

fn arb_records() -> impl Strategy<Value = BTreeMap<String, (String, i64)>> {
    prop::collection::btree_map(
        "[A-F0-9]{8}-[A-F0-9]{4}",
        ("[A-Za-z ]{1,12}", 0i64..4_000_000_000_000_000),
        0..40,
    )
}

proptest! {
    #[test]
    fn ledger_json_round_trip(records in arb_records()) {
        let mut ledger = Ledger::new();
        for (id, (collection, micros)) in &records {
            ledger.insert(SyncRecord {
                photo_id: id.clone(),
                collection_name: collection.clone(),
                delivered_at: DateTime::from_timestamp_micros(*micros).unwrap(),
            });
        }

        let reloaded = Ledger::from_json(&ledger.to_json().unwrap()).unwrap();
        prop_assert_eq!(reloaded.len(), records.len());
        prop_assert_eq!(reloaded, ledger);
    }

    #[test]
    fn clear_removes_exactly_one_collection(records in arb_records(), target in "[A-Za-z ]{1,12}") {
        let store = LedgerStore::new(InMemoryBackend::new());
        for (id, (collection, _)) in &records {
            store.mark_synced(id, collection).unwrap();
        }

        let expected_removed = records.values().filter(|(c, _)| *c == target).count();
        prop_assert_eq!(store.clear(&target).unwrap(), expected_removed);
        prop_assert!(store.list_synced(Some(&target)).is_empty());
        prop_assert_eq!(store.list_synced(None).len(), records.len() - expected_removed);
    }
}
