//! archiver-core: multi-file archiving with canonical Huffman coding
//!
//! This library packs one or more files into a single archive and restores
//! them byte-for-byte, names included:
//! - Every file is compressed with its own static Huffman code
//! - Only the canonical code lengths are stored, never the tree
//! - Records are chained with sentinel symbols instead of length fields
//!
//! # Architecture
//!
//! - `bitio`: Buffered bit reading/writing over files
//! - `huffman`: Canonical Huffman codebook and decode trie
//! - `framing`: Record header and sentinel symbols
//! - `archive`: Compress/decompress orchestration
//! - `metrics`: Per-run statistics
//!
//! # Example
//!
//! ```no_run
//! use archiver_core::{compress, decompress};
//!
//! compress(&["notes.txt", "data.bin"], "backup.arc")?;
//! decompress("backup.arc", "restored")?;
//! # Ok::<(), archiver_core::Error>(())
//! ```

pub mod archive;
pub mod bitio;
pub mod error;
pub mod framing;
pub mod huffman;
pub mod metrics;

// Re-export commonly used types
pub use archive::{compress, decompress};
pub use error::{Error, ErrorKind, Result};
pub use metrics::{ArchiveStats, FileStats};
