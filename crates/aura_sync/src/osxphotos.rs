//! Photo source backed by the `osxphotos` command-line tool.
//!
//! Every call shells out to the tool and parses its JSON output. The tool
//! reads the Photos library directly, so this only works on macOS with the
//! tool installed and library access granted.

use crate::error::{SyncError, SyncResult};
use crate::source::{
    summarize_collections, Availability, Collection, CollectionKind, CollectionSummary, Photo,
    PhotoSource,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// Placeholder name the tool uses for unnamed faces.
const UNKNOWN_PERSON: &str = "_UNKNOWN_";

/// Photo source that drives `osxphotos`.
#[derive(Debug, Clone)]
pub struct OsxPhotosSource {
    program: PathBuf,
}

impl Default for OsxPhotosSource {
    fn default() -> Self {
        Self::new()
    }
}

impl OsxPhotosSource {
    /// Uses `osxphotos` from `PATH`.
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("osxphotos"),
        }
    }

    /// Uses the given executable.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// The executable being run.
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn run(&self, args: &[OsString]) -> SyncResult<String> {
        debug!(program = %self.program.display(), ?args, "running osxphotos");
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| {
                SyncError::SourceUnavailable(format!(
                    "cannot run {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SyncError::SourceUnavailable(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn query(&self, album: Option<&str>) -> SyncResult<Vec<Photo>> {
        let mut args: Vec<OsString> = vec!["query".into()];
        if let Some(album) = album {
            args.push("--album".into());
            args.push(album.into());
        }
        args.push("--json".into());
        parse_photos(&self.run(&args)?)
    }
}

impl PhotoSource for OsxPhotosSource {
    fn list_collections(&self) -> SyncResult<Vec<CollectionSummary>> {
        let albums = parse_albums(&self.run(&["albums".into(), "--json".into()])?)?;
        let collections = summarize_collections(albums);
        info!(count = collections.len(), "listed albums");
        Ok(collections)
    }

    fn list_persons(&self) -> SyncResult<Vec<String>> {
        parse_persons(&self.run(&["persons".into(), "--json".into()])?)
    }

    fn resolve_collection(&self, name: &str) -> SyncResult<Option<Collection>> {
        let albums = parse_albums(&self.run(&["albums".into(), "--json".into()])?)?;
        let Some(album) = albums.into_iter().find(|a| a.name == name) else {
            return Ok(None);
        };

        let photos = self.query(Some(name))?;
        Ok(Some(Collection {
            id: album.id,
            name: album.name,
            kind: album.kind,
            photos,
        }))
    }

    fn all_photos(&self) -> SyncResult<Vec<Photo>> {
        let photos = self.query(None)?;
        info!(count = photos.len(), "listed library photos");
        Ok(photos)
    }

    fn export(&self, photo: &Photo, dest_dir: &Path) -> SyncResult<Vec<PathBuf>> {
        let key = export_dir_name(photo).ok_or(SyncError::MissingIdentifier)?;
        let label = photo.id().unwrap_or(&photo.filename);
        let target = dest_dir.join(&key);
        fs::create_dir_all(&target).map_err(|e| SyncError::export(label, e.to_string()))?;

        if photo.availability == Availability::RemoteOnly {
            info!(photo = aura_ledger::short_id(label), "photo not on disk, downloading");
        }
        self.run(&export_args(photo, &target))
            .map_err(|e| SyncError::export(label, e.to_string()))?;

        let paths =
            exported_files(&target).map_err(|e| SyncError::export(label, e.to_string()))?;
        if paths.is_empty() {
            warn!(photo = aura_ledger::short_id(label), "export produced no files");
        }
        Ok(paths)
    }
}

/// Directory an export lands in: the photo id, or a name derived from the
/// filename for photos without one.
fn export_dir_name(photo: &Photo) -> Option<String> {
    if let Some(id) = photo.id() {
        return Some(id.to_string());
    }
    let stem = Path::new(photo.filename.trim()).file_stem()?.to_string_lossy();
    let safe: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    Some(format!("name_{}", safe))
}

/// Arguments for exporting one photo as JPEG into `target`.
///
/// Photos are selected by id, or by filename when they have none.
pub fn export_args(photo: &Photo, target: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["export".into(), target.as_os_str().to_owned()];
    match photo.id() {
        Some(id) => args.extend([OsString::from("--uuid"), OsString::from(id)]),
        None => args.extend([OsString::from("--name"), OsString::from(&photo.filename)]),
    }
    args.push("--convert-to-jpeg".into());
    if photo.availability == Availability::RemoteOnly {
        args.push("--download-missing".into());
    }
    args
}

fn exported_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}

#[derive(Debug, Deserialize)]
struct AlbumListing {
    #[serde(default)]
    albums: BTreeMap<String, usize>,
}

/// Parses `albums --json` output. Shared albums are not included.
pub fn parse_albums(json: &str) -> SyncResult<Vec<CollectionSummary>> {
    let listing: AlbumListing = serde_json::from_str(json)
        .map_err(|e| SyncError::SourceUnavailable(format!("unexpected album listing: {}", e)))?;
    Ok(listing
        .albums
        .into_iter()
        .map(|(name, photo_count)| CollectionSummary {
            id: name.clone(),
            name,
            photo_count,
            kind: CollectionKind::Regular,
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct PersonListing {
    #[serde(default)]
    persons: BTreeMap<String, usize>,
}

/// Parses `persons --json` output, dropping unnamed faces.
pub fn parse_persons(json: &str) -> SyncResult<Vec<String>> {
    let listing: PersonListing = serde_json::from_str(json)
        .map_err(|e| SyncError::SourceUnavailable(format!("unexpected person listing: {}", e)))?;
    Ok(listing
        .persons
        .into_keys()
        .filter(|name| name != UNKNOWN_PERSON)
        .collect())
}

#[derive(Debug, Deserialize)]
struct PhotoRecord {
    #[serde(default)]
    uuid: Option<String>,
    #[serde(default)]
    original_filename: Option<String>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    persons: Vec<String>,
    #[serde(default)]
    ismissing: bool,
}

impl From<PhotoRecord> for Photo {
    fn from(record: PhotoRecord) -> Self {
        Photo {
            id: record.uuid,
            filename: record
                .original_filename
                .or(record.filename)
                .unwrap_or_default(),
            persons: record
                .persons
                .into_iter()
                .filter(|p| p != UNKNOWN_PERSON)
                .collect(),
            availability: if record.ismissing {
                Availability::RemoteOnly
            } else {
                Availability::Local
            },
        }
    }
}

/// Parses `query --json` output, preserving order.
pub fn parse_photos(json: &str) -> SyncResult<Vec<Photo>> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let records: Vec<PhotoRecord> = serde_json::from_str(json)
        .map_err(|e| SyncError::SourceUnavailable(format!("unexpected query output: {}", e)))?;
    Ok(records.into_iter().map(Photo::from).collect())
}
