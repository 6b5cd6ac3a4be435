//! Error types for the archiver.
//!
//! All operations return structured errors rather than panicking. Every error
//! is fatal to the compress or decompress call that produced it; nothing is
//! retried.

use std::path::PathBuf;

use thiserror::Error;

use crate::huffman::Symbol;

/// Top-level error type for all operations in the system.
///
/// Each variant corresponds to a specific failure domain:
/// - Input: files that cannot be opened, read, written or named
/// - Bit I/O: reading/writing bits through a buffered stream
/// - Huffman: codebook construction failures
/// - Format: an archive that does not follow the record layout
#[derive(Debug, Error)]
pub enum Error {
    /// A file could not be opened or created
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File I/O error after the file was opened
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input path has no usable base name
    #[error("invalid input file name: {}", path.display())]
    InvalidInputName { path: PathBuf },

    /// Compress was called without any input files
    #[error("no input files given")]
    NoInputs,

    /// Bit I/O operation failed (e.g., reading past end of stream)
    #[error("bit I/O error: {0}")]
    BitIo(#[from] BitIoError),

    /// Huffman codebook could not be built
    #[error("huffman codec error: {0}")]
    Huffman(#[from] HuffmanError),

    /// Archive content is corrupt or was not produced by this encoder
    #[error("wrong archive format: {0}")]
    Format(#[from] FormatError),
}

/// Coarse classification of [`Error`], for callers that need to tell a bad
/// input file apart from a corrupt archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Filesystem or input naming problem
    Input,
    /// Degenerate or malformed Huffman tree
    Build,
    /// Archive does not decode
    CorruptArchive,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Open { .. } | Error::Io(_) | Error::InvalidInputName { .. } | Error::NoInputs => {
                ErrorKind::Input
            }
            Error::BitIo(BitIoError::UnexpectedEof) => ErrorKind::CorruptArchive,
            Error::BitIo(_) | Error::Huffman(_) => ErrorKind::Build,
            Error::Format(_) => ErrorKind::CorruptArchive,
        }
    }

    pub(crate) fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Open {
            path: path.into(),
            source,
        }
    }
}

/// Bit-level I/O errors.
#[derive(Debug, Error)]
pub enum BitIoError {
    /// Attempted to read past the end of the stream
    #[error("unexpected end of bit stream")]
    UnexpectedEof,

    /// Invalid field width (more than 64 bits)
    #[error("invalid bit count: {0}")]
    InvalidBitCount(usize),

    /// Value does not fit in the requested field width
    #[error("value {value} does not fit in {width} bits")]
    ValueTooWide { value: u64, width: usize },
}

/// Huffman codebook construction errors.
#[derive(Debug, Error)]
pub enum HuffmanError {
    /// No symbols with non-zero frequency (cannot build codebook)
    #[error("empty frequency table: cannot build codebook")]
    EmptyFrequencyTable,

    /// Only one distinct symbol; its code would have zero length
    #[error("frequency table has a single symbol {0}: code length would be zero")]
    SingleSymbol(Symbol),

    /// Incrementing an all-ones code while assigning canonical codes
    #[error("canonical code space exhausted")]
    CodeSpaceExhausted,

    /// Canonical order is not sorted by length
    #[error("code lengths are not in canonical order")]
    UnsortedLengths,

    /// Symbol has no code in the codebook
    #[error("no code for symbol {0}")]
    MissingCode(Symbol),
}

/// Archive format (corruption) errors.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Archive ended inside a record header
    #[error("archive ended inside a record header")]
    TruncatedHeader,

    /// Record header declares no symbols
    #[error("record header declares zero codes")]
    EmptyHeader,

    /// Symbol outside the literal and sentinel range
    #[error("unknown symbol {0} in record header")]
    UnknownSymbol(Symbol),

    /// Same symbol listed twice in a record header
    #[error("symbol {0} listed twice in record header")]
    DuplicateSymbol(Symbol),

    /// Length histogram assigns more codes than were declared
    #[error("length histogram assigns {assigned} codes, header declares {declared}")]
    HistogramOverflow { assigned: usize, declared: usize },

    /// Code lengths cannot come from a Huffman tree
    #[error("invalid code lengths in record header")]
    InvalidCodeLengths,

    /// Code set leaves part of the code space unused
    #[error("code lengths do not form a complete prefix code")]
    IncompleteCode,

    /// Two symbols share a trie path
    #[error("code for symbol {0} conflicts with another code")]
    ConflictingCode(Symbol),

    /// Bit sequence leads nowhere in the decode trie
    #[error("invalid huffman code at bit position {position}")]
    InvalidCode { position: u64 },

    /// Archive ended in the middle of a record payload
    #[error("archive ended inside a record")]
    UnexpectedEnd,

    /// Sentinel found where it cannot appear
    #[error("unexpected symbol {symbol} while decoding {context}")]
    UnexpectedSymbol {
        symbol: Symbol,
        context: &'static str,
    },

    /// Decoded file name cannot be used as a plain file name
    #[error("unsafe file name in archive: {0:?}")]
    UnsafeFileName(String),
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
