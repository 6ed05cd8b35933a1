//! Periodic sync of the configured albums.

use super::{build_orchestrator, open_ledger, LedgerArgs, MailArgs};
use aura_sync::{parse_collections, sync_collections, ScheduleConfig, Scheduler, SyncConfig};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Runs the configured albums immediately and then on every interval, forever.
///
/// A failed album never stops the loop. If the orchestrator cannot be built
/// (for example the ledger client fails to start), the loop waits for the
/// back-off period and tries again.
pub fn run(
    ledger: &LedgerArgs,
    mail: &MailArgs,
    osxphotos: &Path,
    albums: &str,
    interval_minutes: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let collections = parse_collections(albums);
    if collections.is_empty() {
        return Err("No albums configured for sync: set SYNC_ALBUMS".into());
    }
    let config = ScheduleConfig::new(collections).with_interval(interval(interval_minutes)?);

    info!(
        albums = %config.collections.join(", "),
        interval_minutes,
        "starting sync scheduler"
    );

    let mut scheduler = Scheduler::new(config.interval);
    loop {
        let now = Instant::now();
        if scheduler.is_due(now) {
            let built = open_ledger(ledger)
                .and_then(|store| build_orchestrator(store, mail, osxphotos, SyncConfig::new()));
            match built {
                Ok(orchestrator) => {
                    scheduler.mark_ran(now);
                    run_job(&orchestrator, &config.collections);
                }
                Err(e) => {
                    error!(error = %e, backoff_secs = config.error_backoff.as_secs(), "scheduled run could not start");
                    thread::sleep(config.error_backoff);
                    continue;
                }
            }
        }
        let wait = scheduler
            .time_until_due(Instant::now())
            .min(config.poll_period);
        thread::sleep(wait);
    }
}

/// Converts the configured minutes into a run interval.
fn interval(minutes: u64) -> Result<Duration, String> {
    if minutes == 0 {
        return Err("SYNC_INTERVAL_MINUTES must be at least 1".into());
    }
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("SYNC_INTERVAL_MINUTES is too large: {}", minutes))
}

fn run_job(orchestrator: &super::CliOrchestrator, collections: &[String]) {
    info!(count = collections.len(), "starting scheduled sync job");
    let results = sync_collections(orchestrator, collections);
    let failed: Vec<&str> = results
        .iter()
        .filter(|(_, ok)| !ok)
        .map(|(name, _)| name.as_str())
        .collect();
    if failed.is_empty() {
        info!("scheduled sync job completed");
    } else {
        warn!(failed = %failed.join(", "), "scheduled sync job completed with failures");
    }
}
