//! CLI command implementations.

pub mod ledger;
pub mod library;
pub mod schedule;
pub mod sync;

use aura_ledger::{
    FileBackend, GistBackend, GistConfig, InMemoryBackend, LedgerBackend, LedgerStore,
};
use aura_sync::{OsxPhotosSource, SmtpConfig, SmtpSink, SyncConfig, SyncOrchestrator};
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::info;

/// Ledger selected at runtime.
pub type CliLedger = LedgerStore<Box<dyn LedgerBackend>>;

/// Orchestrator wired to the real library and mail server.
pub type CliOrchestrator = SyncOrchestrator<OsxPhotosSource, SmtpSink, Box<dyn LedgerBackend>>;

/// Where the delivery ledger lives.
#[derive(Args, Debug, Clone)]
pub struct LedgerArgs {
    /// Keep the ledger in a local JSON file instead of a gist
    #[arg(global = true, long, env = "LEDGER_FILE")]
    pub ledger_file: Option<PathBuf>,

    /// GitHub token with gist scope
    #[arg(global = true, long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Id of the gist holding the ledger
    #[arg(global = true, long, env = "SYNC_GIST_ID")]
    pub gist_id: Option<String>,
}

/// Mail server and destination.
#[derive(Args, Debug, Clone)]
pub struct MailArgs {
    /// Frame upload address
    #[arg(long, env = "AURA_FRAME_EMAIL")]
    pub to: Option<String>,

    /// Sender address, also the SMTP login
    #[arg(long, env = "EMAIL_SENDER")]
    pub sender: Option<String>,

    /// SMTP password
    #[arg(long, env = "EMAIL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// SMTP host
    #[arg(long, env = "EMAIL_SMTP", default_value = "smtp.gmail.com")]
    pub smtp_host: String,

    /// SMTP port
    #[arg(long, env = "EMAIL_PORT", default_value = "465")]
    pub smtp_port: u16,

    /// Use STARTTLS instead of implicit TLS
    #[arg(long)]
    pub starttls: bool,
}

/// Opens the ledger named by the arguments.
pub fn open_ledger(args: &LedgerArgs) -> Result<CliLedger, Box<dyn std::error::Error>> {
    let backend: Box<dyn LedgerBackend> = match (&args.ledger_file, &args.github_token, &args.gist_id)
    {
        (Some(path), _, _) => Box::new(FileBackend::new(path)),
        (None, Some(token), Some(gist_id)) => {
            Box::new(GistBackend::new(GistConfig::new(token, gist_id))?)
        }
        _ => {
            return Err(
                "No ledger configured: set LEDGER_FILE, or GITHUB_TOKEN and SYNC_GIST_ID".into(),
            )
        }
    };
    info!(ledger = %backend.describe(), "using ledger");
    Ok(LedgerStore::new(backend))
}

/// Picks the ledger for a sync run.
///
/// Sending a single random photo never reads or writes the ledger, so it
/// runs against a throwaway in-memory one and needs no ledger settings.
pub fn sync_ledger(
    args: &LedgerArgs,
    album: Option<&str>,
) -> Result<CliLedger, Box<dyn std::error::Error>> {
    match album {
        Some(_) => open_ledger(args),
        None => Ok(LedgerStore::new(Box::new(InMemoryBackend::new()))),
    }
}

/// Builds the mail configuration from the arguments.
pub fn smtp_config(args: &MailArgs) -> SmtpConfig {
    let config = SmtpConfig::new(
        args.sender.clone().unwrap_or_default(),
        args.password.clone().unwrap_or_default(),
        args.to.clone().unwrap_or_default(),
    )
    .with_host(args.smtp_host.clone())
    .with_port(args.smtp_port);
    if args.starttls {
        config.with_starttls()
    } else {
        config
    }
}

/// Builds an orchestrator over the Photos library, the mail server and the ledger.
pub fn build_orchestrator(
    ledger: CliLedger,
    mail: &MailArgs,
    osxphotos: &Path,
    config: SyncConfig,
) -> Result<CliOrchestrator, Box<dyn std::error::Error>> {
    let sink = SmtpSink::new(smtp_config(mail))?;
    let source = OsxPhotosSource::new().with_program(osxphotos);
    Ok(SyncOrchestrator::new(source, sink, ledger).with_config(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail() -> MailArgs {
        MailArgs {
            to: Some("frame@example.com".into()),
            sender: Some("me@example.com".into()),
            password: Some("pw".into()),
            smtp_host: "smtp.example.com".into(),
            smtp_port: 587,
            starttls: true,
        }
    }

    #[test]
    fn smtp_config_from_args() {
        let config = smtp_config(&mail());
        assert_eq!(config.host, "smtp.example.com");
        assert_eq!(config.port, 587);
        assert!(!config.implicit_tls);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_password_is_rejected() {
        let mut args = mail();
        args.password = None;
        assert!(smtp_config(&args).validate().is_err());
    }

    #[test]
    fn ledger_requires_a_location() {
        let args = LedgerArgs {
            ledger_file: None,
            github_token: Some("token".into()),
            gist_id: None,
        };
        assert!(open_ledger(&args).is_err());
    }

    #[test]
    fn random_photo_runs_without_ledger_settings() {
        let args = LedgerArgs {
            ledger_file: None,
            github_token: None,
            gist_id: None,
        };
        assert!(sync_ledger(&args, None).is_ok());
        assert!(sync_ledger(&args, Some("Family")).is_err());
    }

    #[test]
    fn ledger_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let args = LedgerArgs {
            ledger_file: Some(dir.path().join("ledger.json")),
            github_token: Some("token".into()),
            gist_id: Some("abc".into()),
        };
        let store = open_ledger(&args).unwrap();
        store.mark_synced("p1", "Family").unwrap();
        assert!(dir.path().join("ledger.json").exists());
    }
}
