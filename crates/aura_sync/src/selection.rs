//! Album and person queries over a photo source.

use crate::error::SyncResult;
use crate::source::{Collection, Photo, PhotoSource};
use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Finds a collection by exact, case-sensitive name. First match wins.
pub fn find_collection<'a>(collections: &'a [Collection], name: &str) -> Option<&'a Collection> {
    collections.iter().find(|c| c.name == name)
}

/// Photos tagged with `person`, in source order.
pub fn photos_for_person<'a>(photos: &'a [Photo], person: &str) -> Vec<&'a Photo> {
    photos.iter().filter(|p| p.has_person(person)).collect()
}

/// Picks one photo at random.
pub fn pick_random(photos: &[Photo]) -> Option<&Photo> {
    photos.choose(&mut rand::thread_rng())
}

/// Exports up to `max_samples` photos of a person into `dest`.
///
/// Photos that fail to export are logged and skipped. Returns every exported
/// file path.
///
/// # Errors
///
/// Returns an error only if the library cannot be enumerated.
pub fn sample_person_photos<S: PhotoSource + ?Sized>(
    source: &S,
    person: &str,
    max_samples: usize,
    dest: &Path,
) -> SyncResult<Vec<PathBuf>> {
    let photos = source.all_photos()?;
    let matches = photos_for_person(&photos, person);
    info!(
        person,
        total = photos.len(),
        matches = matches.len(),
        max_samples,
        "sampling person photos"
    );

    let mut exported = Vec::new();
    for photo in matches.into_iter().take(max_samples) {
        match source.export(photo, dest) {
            Ok(paths) => exported.extend(paths),
            Err(e) => warn!(person, error = %e, "skipping sample photo"),
        }
    }
    Ok(exported)
}

/// Exports the first photo tagged with any of `names` into `dest`.
///
/// Returns an empty list when no photo matches or the export fails.
///
/// # Errors
///
/// Returns an error only if the library cannot be enumerated.
pub fn export_first_for_persons<S: PhotoSource + ?Sized>(
    source: &S,
    names: &[String],
    dest: &Path,
) -> SyncResult<Vec<PathBuf>> {
    let photos = source.all_photos()?;
    let Some(photo) = photos
        .iter()
        .find(|p| names.iter().any(|name| p.has_person(name)))
    else {
        info!(?names, "no photo tagged with any of the given persons");
        return Ok(Vec::new());
    };

    match source.export(photo, dest) {
        Ok(paths) => Ok(paths),
        Err(e) => {
            warn!(error = %e, "export of first matching photo failed");
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use tempfile::tempdir;

    fn library() -> MemorySource {
        MemorySource::new()
            .with_collection(Collection::new(
                "Family",
                vec![
                    Photo::new("p1").with_persons(["Ada"]),
                    Photo::new("p2").with_persons(["Bo"]),
                    Photo::new("p3").with_persons(["Ada", "Bo"]),
                    Photo::new("p4").with_persons(["Ada"]).remote_only(),
                ],
            ))
            .with_failing_export("p3")
    }

    #[test]
    fn find_collection_is_exact() {
        let collections = vec![
            Collection::new("Kids", vec![]).with_id("1"),
            Collection::new("kids", vec![]).with_id("2"),
            Collection::new("Kids", vec![]).with_id("3"),
        ];

        assert_eq!(find_collection(&collections, "Kids").unwrap().id, "1");
        assert_eq!(find_collection(&collections, "kids").unwrap().id, "2");
        assert!(find_collection(&collections, "KIDS").is_none());
    }

    #[test]
    fn photos_for_person_keeps_order() {
        let photos = vec![
            Photo::new("a").with_persons(["Ada"]),
            Photo::new("b"),
            Photo::new("c").with_persons(["Bo", "Ada"]),
        ];
        let ids: Vec<_> = photos_for_person(&photos, "Ada")
            .iter()
            .filter_map(|p| p.id())
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn pick_random_from_empty_is_none() {
        assert!(pick_random(&[]).is_none());
        let photos = vec![Photo::new("only")];
        assert_eq!(pick_random(&photos).unwrap().id(), Some("only"));
    }

    #[test]
    fn samples_are_capped_and_skip_failures() {
        let dir = tempdir().unwrap();
        let source = library();

        let paths = sample_person_photos(&source, "Ada", 2, dir.path()).unwrap();
        // p1 exports, p3 fails; the cap counts attempts, so p4 is not reached.
        assert_eq!(paths.len(), 1);
        assert_eq!(source.export_calls().len(), 2);

        let paths = sample_person_photos(&source, "Ada", 10, dir.path()).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(source.export_calls().last().unwrap().fetched_remote);
    }

    #[test]
    fn first_for_persons_exports_one_photo() {
        let dir = tempdir().unwrap();
        let source = library();

        let paths =
            export_first_for_persons(&source, &["Zed".into(), "Bo".into()], dir.path()).unwrap();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].ends_with("p2.jpg"));

        let none = export_first_for_persons(&source, &["Nobody".into()], dir.path()).unwrap();
        assert!(none.is_empty());
    }
}
