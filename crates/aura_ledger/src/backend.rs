//! Ledger backend trait definition.

use crate::error::LedgerResult;
use std::sync::Arc;

/// Where the ledger document is kept.
///
/// Backends are **opaque document stores**. They load and save the whole
/// ledger as text and never interpret it; [`crate::LedgerStore`] owns the
/// format.
///
/// # Invariants
///
/// - `load` returns `None` when no document has been written yet
/// - `load` after a successful `save` returns exactly the saved text
/// - `save` replaces the previous document as a whole
///
/// # Implementors
///
/// - [`crate::InMemoryBackend`] - For testing
/// - [`crate::FileBackend`] - For a local JSON file
/// - [`crate::GistBackend`] - For a GitHub Gist
pub trait LedgerBackend: Send + Sync {
    /// Loads the current document.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or read.
    fn load(&self) -> LedgerResult<Option<String>>;

    /// Replaces the stored document.
    ///
    /// After this returns successfully the new document is durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the write is rejected or fails.
    fn save(&self, contents: &str) -> LedgerResult<()>;

    /// Short human-readable description used in log lines.
    fn describe(&self) -> String;
}

impl<B: LedgerBackend + ?Sized> LedgerBackend for Box<B> {
    fn load(&self) -> LedgerResult<Option<String>> {
        (**self).load()
    }

    fn save(&self, contents: &str) -> LedgerResult<()> {
        (**self).save(contents)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<B: LedgerBackend + ?Sized> LedgerBackend for Arc<B> {
    fn load(&self) -> LedgerResult<Option<String>> {
        (**self).load()
    }

    fn save(&self, contents: &str) -> LedgerResult<()> {
        (**self).save(contents)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
