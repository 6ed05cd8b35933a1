//! In-memory ledger backend for testing.

use crate::backend::LedgerBackend;
use crate::error::{LedgerError, LedgerResult};
use parking_lot::RwLock;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// An in-memory ledger backend.
///
/// This backend keeps the document in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Dry runs that should not touch the real ledger
///
/// Reads and writes can be made to fail on demand to exercise the degraded
/// paths of [`crate::LedgerStore`].
///
/// # Example
///
/// ```rust
/// use aura_ledger::{InMemoryBackend, LedgerBackend};
///
/// let backend = InMemoryBackend::new();
/// assert_eq!(backend.load().unwrap(), None);
/// backend.save("{}").unwrap();
/// assert_eq!(backend.load().unwrap().as_deref(), Some("{}"));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    document: RwLock<Option<String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    saves: AtomicUsize,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend holding a pre-existing document.
    ///
    /// Useful for testing corrupt or legacy documents.
    #[must_use]
    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: RwLock::new(Some(document.into())),
            ..Self::default()
        }
    }

    /// Returns a copy of the stored document.
    #[must_use]
    pub fn document(&self) -> Option<String> {
        self.document.read().clone()
    }

    /// Makes subsequent loads fail as if the store were unreachable.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent saves fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl LedgerBackend for InMemoryBackend {
    fn load(&self) -> LedgerResult<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LedgerError::Io(io::Error::new(
                io::ErrorKind::NotConnected,
                "in-memory backend set to fail reads",
            )));
        }
        Ok(self.document.read().clone())
    }

    fn save(&self, contents: &str) -> LedgerResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LedgerError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "in-memory backend set to fail writes",
            )));
        }
        *self.document.write() = Some(contents.to_string());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".into()
    }
}
