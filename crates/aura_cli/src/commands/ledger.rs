//! Ledger inspection commands.

use super::{open_ledger, LedgerArgs};

/// Lists delivered photo ids, optionally for one album.
pub fn list(args: &LedgerArgs, album: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_ledger(args)?;
    // Strict load so a broken ledger is reported instead of shown as empty
    let ledger = store.snapshot()?;

    let ids = ledger.photo_ids(album);
    for id in &ids {
        if let Some(record) = ledger.get(id) {
            println!(
                "{}  {}  {}",
                record.photo_id,
                record.collection_name,
                record.delivered_at.to_rfc3339()
            );
        }
    }
    match album {
        Some(name) => println!("{} photos delivered from '{}'", ids.len(), name),
        None => println!("{} photos delivered", ids.len()),
    }
    Ok(())
}

/// Shows the record of one photo.
pub fn show(args: &LedgerArgs, photo_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_ledger(args)?;
    match store.snapshot()?.get(photo_id) {
        Some(record) => {
            println!("Photo:      {}", record.photo_id);
            println!("Album:      {}", record.collection_name);
            println!("Synced at:  {}", record.delivered_at.to_rfc3339());
        }
        None => println!("Photo {} has not been synced", photo_id),
    }
    Ok(())
}

/// Forgets every delivery from an album.
pub fn clear(args: &LedgerArgs, album: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_ledger(args)?;
    let removed = store.clear(album)?;
    println!("Cleared {} records for album '{}'", removed, album);
    Ok(())
}
