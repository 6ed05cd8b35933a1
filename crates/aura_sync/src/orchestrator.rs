//! Sync orchestrator: diff, deliver and commit, one photo at a time.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::selection::pick_random;
use crate::sink::DeliverySink;
use crate::source::{Photo, PhotoSource};
use aura_ledger::{short_id, LedgerBackend, LedgerStore};
use std::path::PathBuf;
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

/// What happened to one photo during a sync.
#[derive(Debug)]
pub enum PhotoOutcome {
    /// Delivered and recorded.
    Delivered,
    /// Already recorded for this collection.
    AlreadySynced,
    /// The photo has no identifier.
    SkippedWithoutId,
    /// Export failed or produced no files.
    ExportFailed(SyncError),
    /// The sink rejected the batch.
    DeliveryFailed(SyncError),
    /// Delivered, but the ledger commit failed.
    CommitFailed(SyncError),
}

/// Per-collection bookkeeping of a sync run.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Name of the synced collection.
    pub collection: String,
    /// Photos in the collection.
    pub total: usize,
    /// Photos that went through export.
    pub attempted: usize,
    /// Photos delivered and recorded.
    pub delivered: usize,
    /// Photos skipped because the ledger already has them.
    pub already_synced: usize,
    /// Photos skipped because they cannot be tracked.
    pub skipped_without_id: usize,
    /// Photos that could not be exported.
    pub export_failures: usize,
    /// Photos the sink rejected.
    pub delivery_failures: usize,
    /// Photos delivered but not recorded. These will be delivered again.
    pub commit_failures: usize,
    /// Errors of every failed photo, in processing order.
    pub errors: Vec<SyncError>,
}

impl SyncReport {
    fn new(collection: &str, total: usize) -> Self {
        Self {
            collection: collection.to_string(),
            total,
            ..Self::default()
        }
    }

    /// True if every attempted photo was delivered and recorded.
    pub fn success(&self) -> bool {
        self.export_failures == 0 && self.delivery_failures == 0 && self.commit_failures == 0
    }

    fn record(&mut self, outcome: PhotoOutcome) {
        match outcome {
            PhotoOutcome::Delivered => self.delivered += 1,
            PhotoOutcome::AlreadySynced => self.already_synced += 1,
            PhotoOutcome::SkippedWithoutId => self.skipped_without_id += 1,
            PhotoOutcome::ExportFailed(e) => {
                self.export_failures += 1;
                self.errors.push(e);
            }
            PhotoOutcome::DeliveryFailed(e) => {
                self.delivery_failures += 1;
                self.errors.push(e);
            }
            PhotoOutcome::CommitFailed(e) => {
                self.commit_failures += 1;
                self.errors.push(e);
            }
        }
    }
}

/// Per-run scratch directory for exported files.
struct Scratch {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl Scratch {
    fn create(config: &SyncConfig, prefix: &str) -> SyncResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);
        let dir = match &config.scratch_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        let path = dir.path().to_path_buf();
        debug!(path = %path.display(), "created scratch directory");
        if config.keep_scratch {
            let path = dir.keep();
            return Ok(Self { dir: None, path });
        }
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    fn finish(self) {
        match self.dir {
            Some(dir) => {
                if let Err(e) = dir.close() {
                    warn!(path = %self.path.display(), error = %e, "could not remove scratch directory");
                }
            }
            None => info!(path = %self.path.display(), "kept exported files"),
        }
    }
}

fn scratch_prefix(collection: &str) -> String {
    let safe: String = collection
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("album_{}_", safe)
}

/// Syncs collections from a photo source to a delivery sink.
///
/// Photos are processed strictly one at a time in source order; the ledger
/// commit for one photo completes before the next is exported. A crash
/// between delivery and commit can therefore redeliver at most one photo.
///
/// Two orchestrators must not sync against the same ledger at the same time.
pub struct SyncOrchestrator<S, D, B>
where
    S: PhotoSource,
    D: DeliverySink,
    B: LedgerBackend,
{
    source: S,
    sink: D,
    ledger: LedgerStore<B>,
    config: SyncConfig,
}

impl<S, D, B> SyncOrchestrator<S, D, B>
where
    S: PhotoSource,
    D: DeliverySink,
    B: LedgerBackend,
{
    /// Creates an orchestrator with the default configuration.
    pub fn new(source: S, sink: D, ledger: LedgerStore<B>) -> Self {
        Self {
            source,
            sink,
            ledger,
            config: SyncConfig::default(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// The photo source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The delivery sink.
    pub fn sink(&self) -> &D {
        &self.sink
    }

    /// The ledger store.
    pub fn ledger(&self) -> &LedgerStore<B> {
        &self.ledger
    }

    /// The configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Syncs a collection, or sends one random photo when `collection` is `None`.
    ///
    /// Never fails: returns `true` only if every attempted delivery succeeded
    /// and was recorded. Details go to the log.
    pub fn sync(&self, collection: Option<&str>) -> bool {
        let Some(name) = collection else {
            return self.send_test_photo();
        };

        match self.sync_collection(name) {
            Ok(report) => report.success(),
            Err(e) => {
                error!(collection = name, error = %e, "sync aborted");
                false
            }
        }
    }

    /// Syncs every unsynced photo of a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be resolved or the scratch
    /// directory cannot be created. Per-photo failures are counted in the
    /// report instead.
    pub fn sync_collection(&self, name: &str) -> SyncResult<SyncReport> {
        info!(collection = name, "starting sync");
        let collection = self
            .source
            .resolve_collection(name)?
            .ok_or_else(|| SyncError::CollectionNotFound(name.to_string()))?;

        let mut report = SyncReport::new(name, collection.photos.len());
        if collection.photos.is_empty() {
            info!(collection = name, "collection is empty");
            return Ok(report);
        }

        let scratch = Scratch::create(&self.config, &scratch_prefix(name))?;
        for (index, photo) in collection.photos.iter().enumerate() {
            debug!(
                collection = name,
                photo = index + 1,
                of = report.total,
                "processing photo"
            );
            let outcome = self.sync_photo(name, photo, &scratch, &mut report);
            report.record(outcome);
        }
        scratch.finish();

        if report.success() {
            info!(
                collection = name,
                total = report.total,
                delivered = report.delivered,
                already_synced = report.already_synced,
                skipped_without_id = report.skipped_without_id,
                "sync finished"
            );
        } else {
            warn!(
                collection = name,
                total = report.total,
                delivered = report.delivered,
                export_failures = report.export_failures,
                delivery_failures = report.delivery_failures,
                commit_failures = report.commit_failures,
                "sync finished with failures"
            );
        }
        Ok(report)
    }

    fn sync_photo(
        &self,
        collection: &str,
        photo: &Photo,
        scratch: &Scratch,
        report: &mut SyncReport,
    ) -> PhotoOutcome {
        let Some(id) = photo.id() else {
            warn!(collection, file = %photo.filename, "photo has no identifier, skipping");
            return PhotoOutcome::SkippedWithoutId;
        };
        if self.ledger.is_synced(id, collection) {
            return PhotoOutcome::AlreadySynced;
        }

        report.attempted += 1;
        let paths = match self.source.export(photo, &scratch.path) {
            Ok(paths) if !paths.is_empty() => paths,
            Ok(_) => {
                error!(photo = short_id(id), "export produced no files");
                return PhotoOutcome::ExportFailed(SyncError::export(id, "no files exported"));
            }
            Err(e) => {
                error!(photo = short_id(id), error = %e, "export failed");
                let e = if e.is_item_level() {
                    e
                } else {
                    SyncError::export(id, e.to_string())
                };
                return PhotoOutcome::ExportFailed(e);
            }
        };

        if let Err(e) = self
            .sink
            .deliver(&paths, &self.config.subject, &self.config.body)
        {
            error!(photo = short_id(id), error = %e, "delivery failed");
            let reason = match e {
                SyncError::DeliveryFailure { reason, .. } => reason,
                other => other.to_string(),
            };
            return PhotoOutcome::DeliveryFailed(SyncError::delivery(id, reason));
        }

        match self.ledger.mark_synced(id, collection) {
            Ok(_) => {
                info!(photo = short_id(id), collection, files = paths.len(), "photo delivered");
                PhotoOutcome::Delivered
            }
            Err(source) => {
                error!(
                    photo = short_id(id),
                    collection,
                    error = %source,
                    "photo delivered but not recorded, it will be sent again"
                );
                PhotoOutcome::CommitFailed(SyncError::PersistenceWriteFailure {
                    photo_id: id.to_string(),
                    source,
                })
            }
        }
    }

    /// Exports one random photo from the library and delivers it.
    ///
    /// Checks the transport end to end. The ledger is neither read nor written.
    pub fn send_test_photo(&self) -> bool {
        info!("sending a random photo to test delivery");
        let photos = match self.source.all_photos() {
            Ok(photos) => photos,
            Err(e) => {
                error!(error = %e, "cannot list library photos");
                return false;
            }
        };
        let Some(photo) = pick_random(&photos) else {
            warn!("library has no photos");
            return false;
        };

        let scratch = match Scratch::create(&self.config, "random_photo_") {
            Ok(scratch) => scratch,
            Err(e) => {
                error!(error = %e, "cannot create scratch directory");
                return false;
            }
        };

        let sent = match self.source.export(photo, &scratch.path) {
            Ok(paths) => self.sink.send(&paths, &self.config.subject, &self.config.body),
            Err(e) => {
                error!(file = %photo.filename, error = %e, "export failed");
                false
            }
        };
        scratch.finish();

        if sent {
            info!(file = %photo.filename, "test photo sent");
        }
        sent
    }
}

/// Runs one sync, as invoked by the scheduler or an operator.
pub fn sync_photos_to_aura<S, D, B>(
    orchestrator: &SyncOrchestrator<S, D, B>,
    collection: Option<&str>,
) -> bool
where
    S: PhotoSource,
    D: DeliverySink,
    B: LedgerBackend,
{
    orchestrator.sync(collection)
}

/// Syncs several collections in order.
///
/// A failed or aborted collection does not stop the others.
pub fn sync_collections<S, D, B>(
    orchestrator: &SyncOrchestrator<S, D, B>,
    collections: &[String],
) -> Vec<(String, bool)>
where
    S: PhotoSource,
    D: DeliverySink,
    B: LedgerBackend,
{
    collections
        .iter()
        .map(|name| {
            let ok = orchestrator.sync(Some(name));
            if !ok {
                warn!(collection = %name, "collection sync failed");
            }
            (name.clone(), ok)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use crate::source::{Collection, MemorySource};
    use aura_ledger::InMemoryBackend;
    use tempfile::tempdir;

    fn orchestrator(
        source: MemorySource,
        sink: MemorySink,
    ) -> SyncOrchestrator<MemorySource, MemorySink, InMemoryBackend> {
        SyncOrchestrator::new(source, sink, LedgerStore::new(InMemoryBackend::new()))
    }

    #[test]
    fn scratch_prefix_is_filesystem_safe() {
        assert_eq!(scratch_prefix("Family"), "album_Family_");
        assert_eq!(scratch_prefix("Kids/2024 Trip"), "album_Kids_2024_Trip_");
    }

    #[test]
    fn missing_collection_aborts() {
        let orch = orchestrator(MemorySource::new(), MemorySink::new());
        assert!(matches!(
            orch.sync_collection("Nope"),
            Err(SyncError::CollectionNotFound(_))
        ));
        assert!(!orch.sync(Some("Nope")));
    }

    #[test]
    fn untracked_photos_are_skipped_without_failing() {
        let source = MemorySource::new().with_collection(Collection::new(
            "Family",
            vec![Photo::untracked("scan.jpg"), Photo::new("p1")],
        ));
        let orch = orchestrator(source, MemorySink::new());

        let report = orch.sync_collection("Family").unwrap();
        assert!(report.success());
        assert_eq!(report.skipped_without_id, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(orch.sink().sent().len(), 1);
    }

    #[test]
    fn export_failure_fails_the_run_but_continues() {
        let source = MemorySource::new()
            .with_collection(Collection::new(
                "Family",
                vec![Photo::new("p1"), Photo::new("p2")],
            ))
            .with_failing_export("p1");
        let orch = orchestrator(source, MemorySink::new());

        let report = orch.sync_collection("Family").unwrap();
        assert!(!report.success());
        assert_eq!(report.export_failures, 1);
        assert_eq!(report.delivered, 1);
        match &report.errors[0] {
            SyncError::ExportFailure { photo_id, reason } => {
                assert_eq!(photo_id, "p1");
                assert_eq!(reason, "export failure injected");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(!orch.ledger().is_synced("p1", "Family"));
        assert!(orch.ledger().is_synced("p2", "Family"));
    }

    #[test]
    fn commit_failure_is_reported_distinctly() {
        let backend = std::sync::Arc::new(InMemoryBackend::new());
        backend.set_fail_writes(true);
        let source =
            MemorySource::new().with_collection(Collection::new("Family", vec![Photo::new("p1")]));
        let orch = SyncOrchestrator::new(
            source,
            MemorySink::new(),
            LedgerStore::new(std::sync::Arc::clone(&backend)),
        );

        let report = orch.sync_collection("Family").unwrap();
        assert_eq!(report.commit_failures, 1);
        assert_eq!(report.delivered, 0);
        assert!(matches!(
            report.errors[0],
            SyncError::PersistenceWriteFailure { .. }
        ));
        assert_eq!(orch.sink().sent().len(), 1);
        assert!(!report.success());
    }

    #[test]
    fn edited_variant_is_one_batch() {
        let source = MemorySource::new()
            .with_collection(Collection::new("Family", vec![Photo::new("p1")]))
            .with_edited_variant("p1");
        let orch = orchestrator(source, MemorySink::new());

        assert!(orch.sync(Some("Family")));
        let sent = orch.sink().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].attachments, vec!["p1.jpg", "p1_edited.jpg"]);
    }

    #[test]
    fn messages_use_configured_subject() {
        let source =
            MemorySource::new().with_collection(Collection::new("Family", vec![Photo::new("p1")]));
        let orch = orchestrator(source, MemorySink::new())
            .with_config(SyncConfig::new().with_subject("Frame").with_body("Hi"));

        assert!(orch.sync(Some("Family")));
        let sent = orch.sink().sent();
        assert_eq!(sent[0].subject, "Frame");
        assert_eq!(sent[0].body, "Hi");
    }

    #[test]
    fn scratch_is_removed_unless_kept() {
        let root = tempdir().unwrap();
        let source =
            MemorySource::new().with_collection(Collection::new("Family", vec![Photo::new("p1")]));
        let orch = orchestrator(source, MemorySink::new())
            .with_config(SyncConfig::new().with_scratch_root(root.path()));
        assert!(orch.sync(Some("Family")));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);

        let root = tempdir().unwrap();
        let source =
            MemorySource::new().with_collection(Collection::new("Family", vec![Photo::new("p1")]));
        let orch = orchestrator(source, MemorySink::new()).with_config(
            SyncConfig::new()
                .with_scratch_root(root.path())
                .with_keep_scratch(true),
        );
        assert!(orch.sync(Some("Family")));
        let kept: Vec<_> = std::fs::read_dir(root.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(kept.len(), 1);
        assert!(kept[0].starts_with("album_Family_"));
    }

    #[test]
    fn test_photo_skips_the_ledger() {
        let backend = std::sync::Arc::new(InMemoryBackend::new());
        let source = MemorySource::new().with_loose_photo(Photo::new("only"));
        let orch = SyncOrchestrator::new(
            source,
            MemorySink::new(),
            LedgerStore::new(std::sync::Arc::clone(&backend)),
        );

        assert!(orch.sync(None));
        assert_eq!(orch.sink().sent().len(), 1);
        assert_eq!(backend.save_count(), 0);
        assert!(backend.document().is_none());
    }

    #[test]
    fn test_photo_on_empty_library_fails() {
        let orch = orchestrator(MemorySource::new(), MemorySink::new());
        assert!(!orch.send_test_photo());
        assert_eq!(orch.sink().call_count(), 0);
    }

    #[test]
    fn test_photo_reports_delivery_outcome() {
        let source = MemorySource::new().with_loose_photo(Photo::new("only"));
        let orch = orchestrator(source, MemorySink::new().fail_on_call(1));
        assert!(!sync_photos_to_aura(&orch, None));
    }

    #[test]
    fn multi_collection_runs_are_independent() {
        let source = MemorySource::new()
            .with_collection(Collection::new("A", vec![Photo::new("a1")]))
            .with_collection(Collection::new("C", vec![Photo::new("c1")]));
        let orch = orchestrator(source, MemorySink::new());

        let results = sync_collections(&orch, &["A".into(), "Missing".into(), "C".into()]);
        assert_eq!(
            results,
            vec![
                ("A".to_string(), true),
                ("Missing".to_string(), false),
                ("C".to_string(), true),
            ]
        );
        assert_eq!(orch.sink().sent().len(), 2);
    }
}
