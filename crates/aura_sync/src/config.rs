//! Configuration for syncing, mail delivery and scheduling.

use crate::error::{SyncError, SyncResult};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default subject of delivery messages.
pub const DEFAULT_SUBJECT: &str = "Photos for Aura Frame";

/// Default body of delivery messages.
pub const DEFAULT_BODY: &str = "Sent automatically.";

/// Configuration for sync runs.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Subject of every delivery message.
    pub subject: String,
    /// Body text of every delivery message.
    pub body: String,
    /// Cap on exploratory queries such as face samples.
    pub max_samples: usize,
    /// Where scratch directories are created (system temp dir if unset).
    pub scratch_root: Option<PathBuf>,
    /// Keep exported files after the run instead of removing them.
    pub keep_scratch: bool,
}

impl SyncConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            subject: DEFAULT_SUBJECT.into(),
            body: DEFAULT_BODY.into(),
            max_samples: 10,
            scratch_root: None,
            keep_scratch: false,
        }
    }

    /// Sets the message subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the message body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the sample cap for exploratory queries.
    pub fn with_max_samples(mut self, max: usize) -> Self {
        self.max_samples = max;
        self
    }

    /// Sets the directory scratch directories are created in.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Keeps exported files after each run.
    pub fn with_keep_scratch(mut self, keep: bool) -> Self {
        self.keep_scratch = keep;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the SMTP delivery sink.
#[derive(Clone)]
pub struct SmtpConfig {
    /// SMTP server hostname.
    pub host: String,
    /// SMTP server port.
    pub port: u16,
    /// Use implicit TLS (SMTPS) instead of STARTTLS.
    pub implicit_tls: bool,
    /// Sender address, also used as the login name.
    pub sender: String,
    /// Login password (an app password for most providers).
    pub password: String,
    /// Destination mailbox (the frame's upload address).
    pub recipient: String,
    /// Connection and command timeout.
    pub timeout: Duration,
}

impl SmtpConfig {
    /// Creates a configuration for the default provider (`smtp.gmail.com:465`).
    pub fn new(
        sender: impl Into<String>,
        password: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            host: "smtp.gmail.com".into(),
            port: 465,
            implicit_tls: true,
            sender: sender.into(),
            password: password.into(),
            recipient: recipient.into(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Sets the server host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the server port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Uses STARTTLS instead of implicit TLS.
    pub fn with_starttls(mut self) -> Self {
        self.implicit_tls = false;
        self
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Checks that every credential is present.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Configuration`] naming the first missing field.
    pub fn validate(&self) -> SyncResult<()> {
        let required = [
            ("host", &self.host),
            ("sender", &self.sender),
            ("password", &self.password),
            ("recipient", &self.recipient),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(SyncError::Configuration(format!("SMTP {} is not set", field)));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("implicit_tls", &self.implicit_tls)
            .field("sender", &self.sender)
            .field("password", &"<redacted>")
            .field("recipient", &self.recipient)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Configuration for the periodic sync trigger.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Collections synced on every run, in order.
    pub collections: Vec<String>,
    /// Time between two runs.
    pub interval: Duration,
    /// How often the loop checks whether a run is due.
    pub poll_period: Duration,
    /// Pause after an unexpected loop error.
    pub error_backoff: Duration,
}

impl ScheduleConfig {
    /// Creates a schedule for the given collections with default timings.
    pub fn new(collections: Vec<String>) -> Self {
        Self {
            collections,
            interval: Duration::from_secs(30 * 60),
            poll_period: Duration::from_secs(60),
            error_backoff: Duration::from_secs(5 * 60),
        }
    }

    /// Sets the run interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the poll period.
    pub fn with_poll_period(mut self, period: Duration) -> Self {
        self.poll_period = period;
        self
    }

    /// Sets the back-off after loop errors.
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }
}

/// Splits a comma-separated collection list, dropping blank entries.
pub fn parse_collections(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}
