//! # Aura Sync
//!
//! Sends new photos from a photo library to a digital frame's upload mailbox,
//! remembering what was sent so nothing is sent twice.
//!
//! ## Overview
//!
//! A [`SyncOrchestrator`] ties together three capabilities:
//!
//! - a [`PhotoSource`] that lists collections and exports photos to files
//! - a [`DeliverySink`] that sends a batch of files as one message
//! - a [`LedgerStore`](aura_ledger::LedgerStore) that records each delivery
//!
//! For every photo of a collection that the ledger has not seen under that
//! collection's name, the orchestrator exports it, delivers it and records
//! it before moving to the next photo. Failures on one photo are logged and
//! counted; the remaining photos are still processed.
//!
//! ## Example
//!
//! ```rust
//! use aura_ledger::{InMemoryBackend, LedgerStore};
//! use aura_sync::{Collection, MemorySink, MemorySource, Photo, SyncOrchestrator};
//!
//! let source = MemorySource::new().with_collection(Collection::new(
//!     "Family",
//!     vec![Photo::new("6F3A9C1E"), Photo::new("7A1B2C3D")],
//! ));
//! let orchestrator = SyncOrchestrator::new(
//!     source,
//!     MemorySink::new(),
//!     LedgerStore::new(InMemoryBackend::new()),
//! );
//!
//! assert!(orchestrator.sync(Some("Family")));
//! assert_eq!(orchestrator.sink().sent().len(), 2);
//!
//! // Nothing new: the second run sends nothing.
//! assert!(orchestrator.sync(Some("Family")));
//! assert_eq!(orchestrator.sink().sent().len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod orchestrator;
mod osxphotos;
pub mod schedule;
mod selection;
mod sink;
mod smtp;
mod source;

pub use config::{
    parse_collections, ScheduleConfig, SmtpConfig, SyncConfig, DEFAULT_BODY, DEFAULT_SUBJECT,
};
pub use error::{SyncError, SyncResult};
pub use orchestrator::{
    sync_collections, sync_photos_to_aura, PhotoOutcome, SyncOrchestrator, SyncReport,
};
pub use osxphotos::OsxPhotosSource;
pub use schedule::Scheduler;
pub use selection::{
    export_first_for_persons, find_collection, photos_for_person, pick_random,
    sample_person_photos,
};
pub use sink::{content_type_for, DeliverySink, MemorySink, SentMessage};
pub use smtp::{compose_message, Attachment, SmtpSink};
pub use source::{
    summarize_collections, Availability, Collection, CollectionKind, CollectionSummary,
    ExportCall, MemorySource, Photo, PhotoSource,
};
