//! Photo source abstraction.
//!
//! The photo library is an external collaborator. The orchestrator only reads
//! photo identity and asks the source to materialize photos as local files;
//! everything it needs to know about a photo is resolved once, here, into
//! plain values.

use crate::error::{SyncError, SyncResult};
use crate::selection;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Whether a photo's original is on this machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Availability {
    /// The original is stored locally.
    #[default]
    Local,
    /// The original must be fetched (e.g. from iCloud) before export.
    RemoteOnly,
}

/// A photo as seen by the sync core.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Photo {
    /// Stable identifier; photos without one cannot be tracked.
    pub id: Option<String>,
    /// Original file name, for logs.
    pub filename: String,
    /// Names of the people tagged in the photo.
    pub persons: Vec<String>,
    /// Whether a remote fetch is needed before export.
    pub availability: Availability,
}

impl Photo {
    /// Creates a local photo with the given identifier.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            filename: format!("{}.jpg", id),
            id: Some(id),
            persons: Vec::new(),
            availability: Availability::Local,
        }
    }

    /// Creates a photo that has no identifier.
    pub fn untracked(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }

    /// Sets the file name.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    /// Sets the tagged persons.
    pub fn with_persons<I, S>(mut self, persons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.persons = persons.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the photo as needing a remote fetch.
    pub fn remote_only(mut self) -> Self {
        self.availability = Availability::RemoteOnly;
        self
    }

    /// Returns the identifier if it is usable.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.trim().is_empty())
    }

    /// Returns true if the person is tagged in this photo.
    pub fn has_person(&self, person: &str) -> bool {
        self.persons.iter().any(|p| p == person)
    }
}

/// Kind of collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum CollectionKind {
    /// A user-curated album.
    #[default]
    Regular,
    /// A rule-based album.
    Smart,
}

impl CollectionKind {
    /// Lower-case label used in listings.
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Regular => "regular",
            CollectionKind::Smart => "smart",
        }
    }
}

/// A named collection together with its photos in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    /// Stable identifier of the collection.
    pub id: String,
    /// Display name; the key used to select the collection.
    pub name: String,
    /// Regular or smart.
    pub kind: CollectionKind,
    /// Photos in the order the source returns them.
    pub photos: Vec<Photo>,
}

impl Collection {
    /// Creates a regular collection whose id is its name.
    pub fn new(name: impl Into<String>, photos: Vec<Photo>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            kind: CollectionKind::Regular,
            photos,
        }
    }

    /// Sets the identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Marks the collection as smart.
    pub fn smart(mut self) -> Self {
        self.kind = CollectionKind::Smart;
        self
    }

    /// Returns the listing entry for this collection.
    pub fn summary(&self) -> CollectionSummary {
        CollectionSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            photo_count: self.photos.len(),
            kind: self.kind,
        }
    }
}

/// Listing entry for a collection.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CollectionSummary {
    /// Stable identifier of the collection.
    #[serde(skip)]
    pub id: String,
    /// Display name.
    #[serde(rename = "title")]
    pub name: String,
    /// Number of photos.
    pub photo_count: usize,
    /// Regular or smart.
    #[serde(rename = "type", serialize_with = "serialize_kind")]
    pub kind: CollectionKind,
}

fn serialize_kind<S: serde::Serializer>(kind: &CollectionKind, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(kind.as_str())
}

/// Deduplicates collections by id and orders them for display.
///
/// When an id appears more than once the last entry wins. Regular collections
/// come before smart ones; within a kind names sort case-insensitively.
pub fn summarize_collections(entries: Vec<CollectionSummary>) -> Vec<CollectionSummary> {
    let mut unique: Vec<CollectionSummary> = Vec::with_capacity(entries.len());
    for entry in entries {
        match unique.iter_mut().find(|existing| existing.id == entry.id) {
            Some(existing) => *existing = entry,
            None => unique.push(entry),
        }
    }
    unique.sort_by(|a, b| {
        a.kind
            .cmp(&b.kind)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    unique
}

/// A read-only photo library.
///
/// Implementations resolve everything about a photo up front into [`Photo`]
/// values. All calls are blocking.
pub trait PhotoSource: Send + Sync {
    /// Lists collections, deduplicated and ordered by [`summarize_collections`].
    fn list_collections(&self) -> SyncResult<Vec<CollectionSummary>>;

    /// Lists the names of all known persons.
    fn list_persons(&self) -> SyncResult<Vec<String>>;

    /// Resolves a collection by exact, case-sensitive name. First match wins.
    fn resolve_collection(&self, name: &str) -> SyncResult<Option<Collection>>;

    /// Every photo in the library.
    fn all_photos(&self) -> SyncResult<Vec<Photo>>;

    /// Materializes a photo as one or more image files under `dest_dir`.
    ///
    /// Remote-only photos must be fetched as part of the export. An error or
    /// an empty list both mean the photo could not be exported.
    fn export(&self, photo: &Photo, dest_dir: &Path) -> SyncResult<Vec<PathBuf>>;
}

/// An in-memory photo library for testing.
///
/// Exports write small placeholder JPEG files. Individual photos can be made
/// to fail export, and the whole source can be made unavailable.
#[derive(Debug, Default)]
pub struct MemorySource {
    collections: Vec<Collection>,
    loose_photos: Vec<Photo>,
    failing_exports: HashSet<String>,
    variants: HashSet<String>,
    unavailable: bool,
    exports: Mutex<Vec<ExportCall>>,
}

/// A recorded call to [`MemorySource::export`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportCall {
    /// The exported photo's identifier.
    pub photo_id: Option<String>,
    /// Whether a remote fetch was requested.
    pub fetched_remote: bool,
}

impl MemorySource {
    /// Creates an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a collection.
    pub fn with_collection(mut self, collection: Collection) -> Self {
        self.collections.push(collection);
        self
    }

    /// Adds a photo that belongs to no collection.
    pub fn with_loose_photo(mut self, photo: Photo) -> Self {
        self.loose_photos.push(photo);
        self
    }

    /// Makes exports of the given photo fail.
    pub fn with_failing_export(mut self, photo_id: impl Into<String>) -> Self {
        self.failing_exports.insert(photo_id.into());
        self
    }

    /// Makes the given photo export to an original and an edited file.
    pub fn with_edited_variant(mut self, photo_id: impl Into<String>) -> Self {
        self.variants.insert(photo_id.into());
        self
    }

    /// Makes every enumeration fail.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Calls made to `export` so far.
    pub fn export_calls(&self) -> Vec<ExportCall> {
        self.exports.lock().clone()
    }

    fn check_available(&self) -> SyncResult<()> {
        if self.unavailable {
            return Err(SyncError::SourceUnavailable("memory source set unavailable".into()));
        }
        Ok(())
    }
}

impl PhotoSource for MemorySource {
    fn list_collections(&self) -> SyncResult<Vec<CollectionSummary>> {
        self.check_available()?;
        Ok(summarize_collections(
            self.collections.iter().map(Collection::summary).collect(),
        ))
    }

    fn list_persons(&self) -> SyncResult<Vec<String>> {
        let mut persons: Vec<String> = Vec::new();
        for photo in self.all_photos()? {
            for person in photo.persons {
                if !persons.contains(&person) {
                    persons.push(person);
                }
            }
        }
        Ok(persons)
    }

    fn resolve_collection(&self, name: &str) -> SyncResult<Option<Collection>> {
        self.check_available()?;
        Ok(selection::find_collection(&self.collections, name).cloned())
    }

    fn all_photos(&self) -> SyncResult<Vec<Photo>> {
        self.check_available()?;
        let mut seen = HashSet::new();
        let mut photos = Vec::new();
        let in_collections = self.collections.iter().flat_map(|c| c.photos.iter());
        for photo in in_collections.chain(self.loose_photos.iter()) {
            let key = photo.id.clone().unwrap_or_else(|| photo.filename.clone());
            if seen.insert(key) {
                photos.push(photo.clone());
            }
        }
        Ok(photos)
    }

    fn export(&self, photo: &Photo, dest_dir: &Path) -> SyncResult<Vec<PathBuf>> {
        self.exports.lock().push(ExportCall {
            photo_id: photo.id.clone(),
            fetched_remote: photo.availability == Availability::RemoteOnly,
        });

        let id = photo.id().unwrap_or("untracked");
        if self.failing_exports.contains(id) {
            return Err(SyncError::export(id, "export failure injected"));
        }

        let stem = Path::new(&photo.filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| id.to_string());

        let mut names = vec![format!("{}.jpg", stem)];
        if self.variants.contains(id) {
            names.push(format!("{}_edited.jpg", stem));
        }

        let mut paths = Vec::with_capacity(names.len());
        for name in names {
            let path = dest_dir.join(name);
            // Minimal JPEG: SOI marker, a comment with the photo id, EOI marker.
            let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xFE];
            bytes.extend_from_slice(id.as_bytes());
            bytes.extend_from_slice(&[0xFF, 0xD9]);
            fs::write(&path, bytes).map_err(|e| SyncError::export(id, e.to_string()))?;
            paths.push(path);
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn summary(id: &str, name: &str, kind: CollectionKind) -> CollectionSummary {
        CollectionSummary {
            id: id.into(),
            name: name.into(),
            photo_count: 0,
            kind,
        }
    }

    #[test]
    fn photo_id_must_be_non_blank() {
        assert_eq!(Photo::new("p1").id(), Some("p1"));
        assert_eq!(Photo::untracked("x.jpg").id(), None);
        assert_eq!(Photo::new("  ").id(), None);
    }

    #[test]
    fn summaries_sort_regular_before_smart() {
        let sorted = summarize_collections(vec![
            summary("1", "zoo", CollectionKind::Regular),
            summary("2", "Favorites", CollectionKind::Smart),
            summary("3", "Beach", CollectionKind::Regular),
            summary("4", "apple", CollectionKind::Regular),
            summary("5", "Recents", CollectionKind::Smart),
        ]);

        let names: Vec<_> = sorted.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["apple", "Beach", "zoo", "Favorites", "Recents"]);
    }

    #[test]
    fn summaries_dedup_by_id() {
        let sorted = summarize_collections(vec![
            summary("1", "Family", CollectionKind::Regular),
            summary("1", "Family (renamed)", CollectionKind::Regular),
            summary("2", "Family", CollectionKind::Regular),
        ]);

        assert_eq!(sorted.len(), 2);
        assert!(sorted.iter().any(|s| s.name == "Family (renamed)"));
    }

    #[test]
    fn summary_serializes_listing_fields() {
        let json = serde_json::to_value(summary("1", "Family", CollectionKind::Smart)).unwrap();
        assert_eq!(json["title"], "Family");
        assert_eq!(json["type"], "smart");
        assert_eq!(json["photo_count"], 0);
        assert!(json.get("id").is_none());
    }

    #[test]
    fn memory_source_resolves_first_exact_match() {
        let source = MemorySource::new()
            .with_collection(Collection::new("Family", vec![Photo::new("a")]).with_id("c1"))
            .with_collection(Collection::new("Family", vec![Photo::new("b")]).with_id("c2"));

        let found = source.resolve_collection("Family").unwrap().unwrap();
        assert_eq!(found.id, "c1");
        assert!(source.resolve_collection("family").unwrap().is_none());
    }

    #[test]
    fn memory_source_lists_people_in_order() {
        let source = MemorySource::new()
            .with_collection(Collection::new(
                "Family",
                vec![
                    Photo::new("a").with_persons(["Ada", "Bo"]),
                    Photo::new("b").with_persons(["Bo", "Cy"]),
                ],
            ))
            .with_loose_photo(Photo::new("c").with_persons(["Di"]));

        assert_eq!(source.list_persons().unwrap(), vec!["Ada", "Bo", "Cy", "Di"]);
    }

    #[test]
    fn memory_source_all_photos_dedups() {
        let shared = Photo::new("shared");
        let source = MemorySource::new()
            .with_collection(Collection::new("A", vec![shared.clone(), Photo::new("a")]))
            .with_collection(Collection::new("B", vec![shared]))
            .with_loose_photo(Photo::new("loose"));

        let ids: Vec<_> = source
            .all_photos()
            .unwrap()
            .into_iter()
            .filter_map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["shared", "a", "loose"]);
    }

    #[test]
    fn memory_source_export_writes_files() {
        let dir = tempdir().unwrap();
        let source = MemorySource::new().with_edited_variant("p1");

        let paths = source
            .export(&Photo::new("p1").with_filename("IMG_0001.HEIC"), dir.path())
            .unwrap();

        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("IMG_0001.jpg"));
        assert!(paths[1].ends_with("IMG_0001_edited.jpg"));
        assert!(paths.iter().all(|p| p.exists()));
    }

    #[test]
    fn memory_source_records_remote_fetch() {
        let dir = tempdir().unwrap();
        let source = MemorySource::new();
        source.export(&Photo::new("p1").remote_only(), dir.path()).unwrap();

        assert_eq!(
            source.export_calls(),
            vec![ExportCall {
                photo_id: Some("p1".into()),
                fetched_remote: true
            }]
        );
    }

    #[test]
    fn memory_source_injected_failures() {
        let dir = tempdir().unwrap();
        let source = MemorySource::new().with_failing_export("p1");
        assert!(source.export(&Photo::new("p1"), dir.path()).is_err());

        let source = MemorySource::new().unavailable();
        assert!(matches!(
            source.resolve_collection("x"),
            Err(SyncError::SourceUnavailable(_))
        ));
    }
}
