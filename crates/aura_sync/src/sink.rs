//! Delivery sink abstraction.

use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A transport that delivers a batch of image files as one message.
///
/// Implementations decide the wire details; the sync core only needs to know
/// whether the batch was accepted.
pub trait DeliverySink: Send + Sync {
    /// Delivers the files as a single message.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::DeliveryFailure`] if the transport rejects or cannot
    /// send the message.
    fn deliver(&self, attachments: &[PathBuf], subject: &str, body: &str) -> SyncResult<()>;

    /// Delivers the files and reports success as a boolean.
    ///
    /// An empty batch is never sent and reports `false`.
    fn send(&self, attachments: &[PathBuf], subject: &str, body: &str) -> bool {
        if attachments.is_empty() {
            warn!("refusing to send a message without attachments");
            return false;
        }
        match self.deliver(attachments, subject, body) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "delivery failed");
                false
            }
        }
    }
}

impl<S: DeliverySink + ?Sized> DeliverySink for Box<S> {
    fn deliver(&self, attachments: &[PathBuf], subject: &str, body: &str) -> SyncResult<()> {
        (**self).deliver(attachments, subject, body)
    }
}

impl<S: DeliverySink + ?Sized> DeliverySink for std::sync::Arc<S> {
    fn deliver(&self, attachments: &[PathBuf], subject: &str, body: &str) -> SyncResult<()> {
        (**self).deliver(attachments, subject, body)
    }
}

/// MIME type for an attachment, derived from its extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

/// A message accepted by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Message subject.
    pub subject: String,
    /// Message body.
    pub body: String,
    /// File names of the attachments, in order.
    pub attachments: Vec<String>,
}

/// An in-memory sink for testing.
///
/// Records every accepted batch. Calls are numbered from 1 and selected
/// calls can be made to fail.
#[derive(Debug, Default)]
pub struct MemorySink {
    sent: Mutex<Vec<SentMessage>>,
    calls: Mutex<usize>,
    failing_calls: HashSet<usize>,
}

impl MemorySink {
    /// Creates a sink that accepts every batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the n-th call to `deliver` fail (1-based).
    pub fn fail_on_call(mut self, call: usize) -> Self {
        self.failing_calls.insert(call);
        self
    }

    /// Messages accepted so far.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    /// Number of calls to `deliver`, failed ones included.
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

impl DeliverySink for MemorySink {
    fn deliver(&self, attachments: &[PathBuf], subject: &str, body: &str) -> SyncResult<()> {
        let call = {
            let mut calls = self.calls.lock();
            *calls += 1;
            *calls
        };

        let names: Vec<String> = attachments
            .iter()
            .map(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            })
            .collect();

        if self.failing_calls.contains(&call) {
            let first = names.first().cloned().unwrap_or_default();
            return Err(SyncError::delivery(first, format!("call {} rejected", call)));
        }

        self.sent.lock().push(SentMessage {
            subject: subject.to_string(),
            body: body.to_string(),
            attachments: names,
        });
        Ok(())
    }
}
