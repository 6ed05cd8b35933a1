//! File-based ledger backend.

use crate::backend::LedgerBackend;
use crate::error::LedgerResult;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A ledger kept in a local JSON file.
///
/// Data survives process restarts. Useful when no remote store is available,
/// or for keeping a ledger next to the photo library.
///
/// # Durability
///
/// `save` writes to a sibling temporary file, calls `File::sync_all()` and
/// then renames it over the ledger, so a crash mid-write leaves either the
/// old or the new document, never a torn one.
///
/// # Example
///
/// ```no_run
/// use aura_ledger::{FileBackend, LedgerStore};
/// use std::path::Path;
///
/// let store = LedgerStore::new(FileBackend::new(Path::new("synced_photos.json")));
/// store.mark_synced("A1B2C3D4", "Family").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// Creates a backend for the file at `path`.
    ///
    /// The file does not have to exist; it is created on the first save.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Returns the path to the ledger file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl LedgerBackend for FileBackend {
    fn load(&self) -> LedgerResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, contents: &str) -> LedgerResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let staging = self.staging_path();
        {
            let mut file = File::create(&staging)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}
