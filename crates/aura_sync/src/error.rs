//! Error types for photo sync.

use aura_ledger::LedgerError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while syncing photos.
///
/// Item-level errors affect a single photo: the photo is skipped, the run
/// continues and its overall result becomes a failure. Everything else aborts
/// the sync of the collection being processed.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The photo source cannot enumerate or resolve collections.
    #[error("photo source unavailable: {0}")]
    SourceUnavailable(String),

    /// No collection carries the requested name.
    #[error("collection '{0}' not found")]
    CollectionNotFound(String),

    /// A photo could not be materialized to a local file.
    #[error("failed to export photo {photo_id}: {reason}")]
    ExportFailure {
        /// Photo identifier.
        photo_id: String,
        /// Why the export failed.
        reason: String,
    },

    /// The transport rejected or could not send a batch.
    #[error("failed to deliver photo {photo_id}: {reason}")]
    DeliveryFailure {
        /// Photo identifier.
        photo_id: String,
        /// Why the delivery failed.
        reason: String,
    },

    /// The photo was delivered but the ledger commit failed.
    ///
    /// The photo will be delivered again by the next run.
    #[error("delivered photo {photo_id} but could not record it: {source}")]
    PersistenceWriteFailure {
        /// Photo identifier.
        photo_id: String,
        /// Underlying ledger error.
        #[source]
        source: LedgerError,
    },

    /// The photo has no identifier and cannot be tracked.
    #[error("photo has no identifier")]
    MissingIdentifier,

    /// Invalid or missing configuration (credentials, addresses).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The scratch directory for exports could not be created.
    #[error("scratch directory error: {0}")]
    Scratch(#[from] std::io::Error),
}

impl SyncError {
    /// Creates an export failure.
    pub fn export(photo_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExportFailure {
            photo_id: photo_id.into(),
            reason: reason.into(),
        }
    }

    /// Creates a delivery failure.
    pub fn delivery(photo_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DeliveryFailure {
            photo_id: photo_id.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error only concerns a single photo.
    pub fn is_item_level(&self) -> bool {
        matches!(
            self,
            SyncError::ExportFailure { .. }
                | SyncError::DeliveryFailure { .. }
                | SyncError::PersistenceWriteFailure { .. }
                | SyncError::MissingIdentifier
        )
    }
}
