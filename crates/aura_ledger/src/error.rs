//! Error types for ledger operations.

use std::io;
use thiserror::Error;

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur while loading or persisting the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A local I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The request to the remote store could not be completed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote store answered with a non-success status.
    #[error("remote store returned {status}: {message}")]
    RemoteStatus {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// The stored document is not a valid ledger.
    #[error("ledger document corrupted: {0}")]
    Corrupted(String),

    /// The ledger could not be encoded.
    #[error("failed to serialize ledger: {0}")]
    Serialize(String),
}

impl LedgerError {
    /// Creates a remote status error.
    pub fn remote_status(status: u16, message: impl Into<String>) -> Self {
        Self::RemoteStatus {
            status,
            message: message.into(),
        }
    }

    /// Returns true if the document was reachable but unreadable.
    ///
    /// A corrupt document may be replaced by a fresh one on write. Any other
    /// load failure means the store itself is unreachable, and writing a
    /// fresh document would discard records we could not see.
    pub fn is_corruption(&self) -> bool {
        matches!(self, LedgerError::Corrupted(_))
    }
}
