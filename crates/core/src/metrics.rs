//! Statistics for one compress or decompress run.
//!
//! Counts are collected as each record finishes and summarised at the end.
//! The archive is processed sequentially, so plain fields are enough.

use std::time::{Duration, Instant};

/// What happened to a single archived file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStats {
    /// Base name stored in the archive (lossy UTF-8 for non-UTF-8 names)
    pub name: String,

    /// Content size in bytes
    pub content_bytes: u64,

    /// Distinct symbols in the record's code table (bytes plus sentinels)
    pub distinct_symbols: usize,
}

/// Totals for a whole archive.
#[derive(Debug, Clone)]
pub struct ArchiveStats {
    // === Timing ===
    /// When the run started
    pub start_time: Instant,

    /// When the run ended (set on completion)
    pub end_time: Option<Instant>,

    // === Records ===
    /// One entry per file, in archive order
    pub files: Vec<FileStats>,

    /// Archive size in bytes, including final padding
    pub archive_bytes: u64,
}

impl ArchiveStats {
    /// Create empty stats with start time set to now.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
            files: Vec::new(),
            archive_bytes: 0,
        }
    }

    /// Add a finished record.
    pub fn record_file(&mut self, file: FileStats) {
        self.files.push(file);
    }

    /// Mark the run as complete.
    pub fn complete(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Get total duration (or current elapsed if not complete).
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// Sum of content sizes over all files.
    pub fn content_bytes(&self) -> u64 {
        self.files.iter().map(|file| file.content_bytes).sum()
    }

    /// Compute compression ratio (archive / content).
    ///
    /// Returns 0.0 if there is no content.
    pub fn compression_ratio(&self) -> f64 {
        let content = self.content_bytes();
        if content == 0 {
            0.0
        } else {
            self.archive_bytes as f64 / content as f64
        }
    }

    /// Human-readable summary.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for file in &self.files {
            out.push_str(&format!(
                "  {} ({} bytes, {} symbols)\n",
                file.name, file.content_bytes, file.distinct_symbols
            ));
        }
        out.push_str(&format!(
            "{} file(s), {} content bytes, {} archive bytes, ratio {:.1}%, {} ms",
            self.files.len(),
            self.content_bytes(),
            self.archive_bytes,
            self.compression_ratio() * 100.0,
            self.duration().as_millis()
        ));
        out
    }
}

impl Default for ArchiveStats {
    fn default() -> Self {
        Self::new()
    }
}
