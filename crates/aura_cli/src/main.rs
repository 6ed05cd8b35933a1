//! Aura Sync CLI
//!
//! Sends photos from the Photos library to an Aura frame by email.
//!
//! # Commands
//!
//! - `sync` - Sync one album, or send a random photo to test delivery
//! - `schedule` - Sync the configured albums now and then periodically
//! - `albums` / `persons` / `samples` - Explore the library
//! - `ledger` - Inspect or reset the record of delivered photos

mod commands;

use clap::{Parser, Subcommand};
use commands::{LedgerArgs, MailArgs};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Photo sync for Aura frames.
#[derive(Parser)]
#[command(name = "aura-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Path to the osxphotos executable
    #[arg(global = true, long, env = "OSXPHOTOS_BIN", default_value = "osxphotos")]
    osxphotos: PathBuf,

    #[command(flatten)]
    ledger: LedgerArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync an album, or send one random photo if no album is given
    Sync {
        /// Album to sync
        #[arg(short, long)]
        album: Option<String>,

        /// Keep exported files instead of removing them after the run
        #[arg(long)]
        keep_scratch: bool,

        #[command(flatten)]
        mail: MailArgs,
    },

    /// Sync the configured albums now, then on every interval
    Schedule {
        /// Comma-separated albums to sync
        #[arg(long, env = "SYNC_ALBUMS")]
        albums: String,

        /// Minutes between runs
        #[arg(long, env = "SYNC_INTERVAL_MINUTES", default_value = "30")]
        interval_minutes: u64,

        #[command(flatten)]
        mail: MailArgs,
    },

    /// List albums
    Albums {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List persons recognized in the library
    Persons,

    /// Export sample photos of a person
    Samples {
        /// Person name (exact)
        person: String,

        /// Maximum number of photos to export [default: 10]
        #[arg(short, long)]
        max: Option<usize>,

        /// Output directory (a new temporary directory if unset)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Inspect or reset the delivery ledger
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum LedgerAction {
    /// List delivered photo ids
    List {
        /// Only photos delivered from this album
        #[arg(short, long)]
        album: Option<String>,
    },

    /// Show the record of one photo
    Show {
        /// Photo identifier
        photo_id: String,
    },

    /// Forget every delivery from an album so it is sent again
    Clear {
        /// Album name
        album: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Sync {
            album,
            keep_scratch,
            mail,
        } => {
            commands::sync::run(
                &cli.ledger,
                &mail,
                &cli.osxphotos,
                album.as_deref(),
                keep_scratch,
            )?;
        }
        Commands::Schedule {
            albums,
            interval_minutes,
            mail,
        } => {
            commands::schedule::run(
                &cli.ledger,
                &mail,
                &cli.osxphotos,
                &albums,
                interval_minutes,
            )?;
        }
        Commands::Albums { format } => {
            commands::library::albums(&cli.osxphotos, &format)?;
        }
        Commands::Persons => {
            commands::library::persons(&cli.osxphotos)?;
        }
        Commands::Samples { person, max, out } => {
            commands::library::samples(&cli.osxphotos, &person, max, out)?;
        }
        Commands::Ledger { action } => match action {
            LedgerAction::List { album } => commands::ledger::list(&cli.ledger, album.as_deref())?,
            LedgerAction::Show { photo_id } => commands::ledger::show(&cli.ledger, &photo_id)?,
            LedgerAction::Clear { album } => commands::ledger::clear(&cli.ledger, &album)?,
        },
        Commands::Version => {
            println!("Aura Sync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_ledger_clear() {
        let cli = Cli::try_parse_from(["aura-sync", "ledger", "clear", "Family"]).unwrap();
        match cli.command {
            Commands::Ledger {
                action: LedgerAction::Clear { album },
            } => assert_eq!(album, "Family"),
            _ => panic!("expected ledger clear"),
        }
    }

    #[test]
    fn parses_samples_defaults() {
        let cli = Cli::try_parse_from(["aura-sync", "samples", "Ada"]).unwrap();
        match cli.command {
            Commands::Samples { person, max, out } => {
                assert_eq!(person, "Ada");
                assert_eq!(max, None);
                assert!(out.is_none());
            }
            _ => panic!("expected samples"),
        }

        let cli = Cli::try_parse_from(["aura-sync", "samples", "Ada", "--max", "3"]).unwrap();
        match cli.command {
            Commands::Samples { max, .. } => assert_eq!(max, Some(3)),
            _ => panic!("expected samples"),
        }
    }
}
