//! archiver: command-line front end for archiver-core.
//!
//! ## Usage
//!
//! ```bash
//! # Archive two files
//! archiver -c backup.arc notes.txt photo.png
//!
//! # Extract into the current directory
//! archiver -d backup.arc
//!
//! # Extract elsewhere, with progress logging
//! archiver -d backup.arc -o restored --log-level info
//! ```
//!
//! Exit status: 0 on success, 111 for unreadable inputs or I/O failures,
//! 112 for a corrupt archive, 113 when a code table cannot be built.
//! Usage errors exit with clap's status 2.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use archiver_core::{Error, ErrorKind};

mod config;

use config::{Command, Config};

const INPUT_ERROR: u8 = 111;
const CORRUPT_ARCHIVE: u8 = 112;
const BUILD_ERROR: u8 = 113;

fn main() -> ExitCode {
    let config = Config::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::from(config.log_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("archiver: cannot install logger: {e}");
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

/// Log a failed run once and pick its exit status.
fn report(error: &Error) -> ExitCode {
    error!(kind = ?error.kind(), "{error}");
    ExitCode::from(exit_code(error))
}

fn run(config: &Config) -> archiver_core::Result<()> {
    match &config.command {
        Command::Compress { archive, files } => {
            let stats = archiver_core::compress(files, archive)?;
            if !config.quiet {
                println!("Files archived to {}", archive.display());
                println!("{}", stats.summary());
            }
        }
        Command::Decompress {
            archive,
            output_dir,
        } => {
            let stats = archiver_core::decompress(archive, output_dir)?;
            if !config.quiet {
                println!(
                    "Files unarchived from {} into {}",
                    archive.display(),
                    output_dir.display()
                );
                println!("{}", stats.summary());
            }
        }
    }
    Ok(())
}

/// Process exit status for a failed run.
fn exit_code(error: &Error) -> u8 {
    match error.kind() {
        ErrorKind::Input => INPUT_ERROR,
        ErrorKind::CorruptArchive => CORRUPT_ARCHIVE,
        ErrorKind::Build => BUILD_ERROR,
    }
}
