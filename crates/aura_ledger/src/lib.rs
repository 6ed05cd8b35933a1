//! # Aura Ledger
//!
//! Durable record of which photos have already been delivered, and from
//! which collection.
//!
//! The ledger is a single JSON document that is loaded in full, mutated in
//! memory and written back in full on every operation. Where the document
//! lives is up to a [`LedgerBackend`]:
//!
//! - [`InMemoryBackend`] - For testing and dry runs
//! - [`FileBackend`] - A local JSON file
//! - [`GistBackend`] - A file inside a GitHub Gist
//!
//! ## Document Format
//!
//! ```json
//! {
//!   "synced_photos": {
//!     "<photo_id>": { "album": "<collection>", "synced_at": "<RFC 3339 UTC>" }
//!   }
//! }
//! ```
//!
//! ## Concurrency
//!
//! The read-modify-write cycle has no locking. Only one process may write a
//! given ledger at a time; two concurrent writers can both deliver the same
//! photo and the last writer wins.
//!
//! ## Example
//!
//! ```rust
//! use aura_ledger::{InMemoryBackend, LedgerStore};
//!
//! let store = LedgerStore::new(InMemoryBackend::new());
//! store.mark_synced("A1B2C3D4", "Family").unwrap();
//! assert!(store.is_synced("A1B2C3D4", "Family"));
//! assert!(!store.is_synced("A1B2C3D4", "Holidays"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod document;
mod error;
mod file;
mod gist;
mod memory;
mod store;

pub use backend::LedgerBackend;
pub use document::{Ledger, SyncRecord};
pub use error::{LedgerError, LedgerResult};
pub use file::FileBackend;
pub use gist::{
    GistBackend, GistClient, GistConfig, ReqwestGistClient, DEFAULT_LEDGER_FILE, GITHUB_API_URL,
};
pub use memory::InMemoryBackend;
pub use store::LedgerStore;

/// Shortens an opaque photo identifier for log output.
pub fn short_id(photo_id: &str) -> &str {
    match photo_id.char_indices().nth(8) {
        Some((end, _)) => &photo_id[..end],
        None => photo_id,
    }
}
