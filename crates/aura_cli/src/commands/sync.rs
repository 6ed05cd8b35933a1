//! On-demand sync command.

use super::{build_orchestrator, sync_ledger, LedgerArgs, MailArgs};
use aura_sync::{sync_photos_to_aura, SyncConfig};
use std::path::Path;

/// Syncs one album, or sends a random photo when `album` is `None`.
///
/// Fails if any photo could not be delivered and recorded.
pub fn run(
    ledger: &LedgerArgs,
    mail: &MailArgs,
    osxphotos: &Path,
    album: Option<&str>,
    keep_scratch: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = SyncConfig::new().with_keep_scratch(keep_scratch);
    let ledger = sync_ledger(ledger, album)?;
    let orchestrator = build_orchestrator(ledger, mail, osxphotos, config)?;

    if !sync_photos_to_aura(&orchestrator, album) {
        return Err(match album {
            Some(name) => format!("Sync failed for album '{}'", name).into(),
            None => "Test photo could not be sent".into(),
        });
    }
    match album {
        Some(name) => println!("Album '{}' is in sync", name),
        None => println!("Test photo sent"),
    }
    Ok(())
}
