//! Command-line configuration for the archiver.
//!
//! Mirrors the classic archiver surface:
//!
//! ```text
//! archiver -c ARCHIVE FILE...     compress files into ARCHIVE
//! archiver -d ARCHIVE [-o DIR]    extract ARCHIVE into DIR (default: .)
//! archiver -h                     print help
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;

/// Complete configuration for one invocation.
#[derive(Parser, Debug)]
#[command(name = "archiver")]
#[command(version)]
#[command(about = "Pack files into a canonical Huffman archive and unpack them again", long_about = None)]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Don't print the summary
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Archive FILE... into ARCHIVE (only base names are stored)
    #[command(short_flag = 'c')]
    Compress {
        /// Archive to create or overwrite
        archive: PathBuf,

        /// Files to archive, in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Unarchive every file from ARCHIVE
    #[command(short_flag = 'd')]
    Decompress {
        /// Archive to read
        archive: PathBuf,

        /// Directory the files are written to
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}
