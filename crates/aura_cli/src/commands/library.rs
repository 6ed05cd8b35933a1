//! Library exploration commands.

use aura_sync::{sample_person_photos, OsxPhotosSource, PhotoSource, SyncConfig};
use std::path::{Path, PathBuf};

fn source(osxphotos: &Path) -> OsxPhotosSource {
    OsxPhotosSource::new().with_program(osxphotos)
}

/// Lists albums, regular ones first.
pub fn albums(osxphotos: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let collections = source(osxphotos).list_collections()?;
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&collections)?);
        }
        _ => {
            for collection in &collections {
                println!(
                    "{:<40} {:>6} photos  ({})",
                    collection.name,
                    collection.photo_count,
                    collection.kind.as_str()
                );
            }
            println!("{} albums", collections.len());
        }
    }
    Ok(())
}

/// Lists recognized persons.
pub fn persons(osxphotos: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let names = source(osxphotos).list_persons()?;
    for name in &names {
        println!("{}", name);
    }
    Ok(())
}

/// Sample settings, with `--max` overriding the configured cap.
fn sample_config(max: Option<usize>) -> SyncConfig {
    let config = SyncConfig::new();
    match max {
        Some(max) => config.with_max_samples(max),
        None => config,
    }
}

/// Exports up to `max` photos of a person and prints their paths.
pub fn samples(
    osxphotos: &Path,
    person: &str,
    max: Option<usize>,
    out: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = sample_config(max);
    let dest = match out {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            dir
        }
        None => tempfile::Builder::new()
            .prefix("face_sample_")
            .tempdir()?
            .keep(),
    };

    let paths = sample_person_photos(&source(osxphotos), person, config.max_samples, &dest)?;
    if paths.is_empty() {
        println!("No photos of {} could be exported", person);
        return Ok(());
    }
    for path in &paths {
        println!("{}", path.display());
    }
    println!("{} files in {}", paths.len(), dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_cap_defaults_to_config() {
        assert_eq!(sample_config(None).max_samples, SyncConfig::default().max_samples);
        assert_eq!(sample_config(None).max_samples, 10);
        assert_eq!(sample_config(Some(3)).max_samples, 3);
    }
}
