//! SMTP delivery sink.
//!
//! Each batch becomes one message with the images attached, sent over an
//! authenticated connection that is opened and closed per batch.

use crate::config::SmtpConfig;
use crate::error::{SyncError, SyncResult};
use crate::sink::{content_type_for, DeliverySink};
use mail_builder::MessageBuilder;
use mail_send::SmtpClientBuilder;
use std::fs;
use std::path::PathBuf;
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// A file read into memory, ready to attach.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// File name shown to the recipient.
    pub filename: String,
    /// MIME type.
    pub content_type: &'static str,
    /// File contents.
    pub data: Vec<u8>,
}

impl Attachment {
    /// Reads an attachment from disk.
    ///
    /// # Errors
    ///
    /// Returns a delivery failure if the file cannot be read.
    pub fn read(path: &std::path::Path) -> SyncResult<Self> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        let data = fs::read(path).map_err(|e| SyncError::delivery(&filename, e.to_string()))?;
        Ok(Self {
            content_type: content_type_for(path),
            filename,
            data,
        })
    }
}

/// Builds the message for a batch.
pub fn compose_message<'a>(
    config: &'a SmtpConfig,
    subject: &'a str,
    body: &'a str,
    attachments: &'a [Attachment],
) -> MessageBuilder<'a> {
    let mut message = MessageBuilder::new()
        .from(config.sender.as_str())
        .to(config.recipient.as_str())
        .subject(subject)
        .text_body(body);
    for attachment in attachments {
        message = message.attachment(
            attachment.content_type,
            attachment.filename.as_str(),
            attachment.data.as_slice(),
        );
    }
    message
}

/// Sends batches by mail to the frame's upload address.
///
/// Owns a single-threaded runtime for the mail client so callers stay
/// synchronous. Must not be used from inside another async runtime.
pub struct SmtpSink {
    config: SmtpConfig,
    runtime: Runtime,
}

impl SmtpSink {
    /// Creates a sink after checking the credentials.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Configuration`] if a credential is missing or the
    /// runtime cannot be started.
    pub fn new(config: SmtpConfig) -> SyncResult<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| SyncError::Configuration(format!("cannot start mail runtime: {}", e)))?;
        Ok(Self { config, runtime })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SmtpConfig {
        &self.config
    }

    async fn transmit(&self, message: MessageBuilder<'_>) -> Result<(), mail_send::Error> {
        let mut client = SmtpClientBuilder::new(self.config.host.as_str(), self.config.port)
            .implicit_tls(self.config.implicit_tls)
            .credentials((self.config.sender.as_str(), self.config.password.as_str()))
            .timeout(self.config.timeout)
            .connect()
            .await?;
        client.send(message).await?;
        // The message is already accepted; a failed QUIT changes nothing.
        let _ = client.quit().await;
        Ok(())
    }
}

impl DeliverySink for SmtpSink {
    fn deliver(&self, attachments: &[PathBuf], subject: &str, body: &str) -> SyncResult<()> {
        let label = attachments
            .first()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let files = attachments
            .iter()
            .map(|p| Attachment::read(p))
            .collect::<SyncResult<Vec<_>>>()?;

        debug!(
            host = %self.config.host,
            port = self.config.port,
            attachments = files.len(),
            "sending message"
        );
        let message = compose_message(&self.config, subject, body, &files);
        self.runtime
            .block_on(self.transmit(message))
            .map_err(|e| SyncError::delivery(&label, e.to_string()))?;

        info!(
            recipient = %self.config.recipient,
            attachments = files.len(),
            "message sent"
        );
        Ok(())
    }
}
