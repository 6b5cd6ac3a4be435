//! Archive record framing.
//!
//! An archive is a bit-level concatenation of records, one per file. Records
//! are not byte aligned; only the very end of the archive is padded.
//!
//! # Record Format
//!
//! ```text
//! +---------------------------+
//! | code_count (9 bits)       |  number of (symbol, length) pairs
//! +---------------------------+
//! | symbol (9 bits) x count   |  symbols in canonical order
//! +---------------------------+
//! | histogram (9 bits) x max  |  codes of length 1, 2, ... until all
//! |                           |  code_count symbols have a length
//! +---------------------------+
//! | file name codes           |  one code per name byte
//! | FILENAME_END code         |
//! +---------------------------+
//! | content codes             |  one code per content byte
//! | ONE_MORE_FILE or          |
//! | ARCHIVE_END code          |
//! +---------------------------+
//! ```
//!
//! All integer fields are big-endian. Code lengths are never transmitted per
//! symbol; the histogram and the canonical order are enough to rebuild them.

use std::collections::BTreeSet;
use std::io::{Read, Write};

use crate::bitio::{BitReader, BitWriter};
use crate::error::{BitIoError, Error, FormatError, Result};
use crate::huffman::{length_histogram, Codebook, DecodeTrie, Symbol};

/// Width of every integer field in a record header.
pub const FIELD_WIDTH: usize = 9;

/// Ends the file name of a record.
pub const FILENAME_END: Symbol = 256;
/// Ends a record that is followed by another one.
pub const ONE_MORE_FILE: Symbol = 257;
/// Ends the last record of the archive.
pub const ARCHIVE_END: Symbol = 258;

/// The three structural symbols, in value order.
pub const SENTINELS: [Symbol; 3] = [FILENAME_END, ONE_MORE_FILE, ARCHIVE_END];

/// A decoded symbol, split into literal bytes and sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Byte(u8),
    FilenameEnd,
    OneMoreFile,
    ArchiveEnd,
}

impl Token {
    /// Classify a symbol; `None` for values outside the symbol space.
    pub fn from_symbol(symbol: Symbol) -> Option<Self> {
        match symbol {
            FILENAME_END => Some(Token::FilenameEnd),
            ONE_MORE_FILE => Some(Token::OneMoreFile),
            ARCHIVE_END => Some(Token::ArchiveEnd),
            other => u8::try_from(other).ok().map(Token::Byte),
        }
    }

    pub fn symbol(self) -> Symbol {
        match self {
            Token::Byte(byte) => Symbol::from(byte),
            Token::FilenameEnd => FILENAME_END,
            Token::OneMoreFile => ONE_MORE_FILE,
            Token::ArchiveEnd => ARCHIVE_END,
        }
    }
}

/// The code table part of a record: symbols with their code lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    order: Vec<(Symbol, usize)>,
}

impl RecordHeader {
    pub fn from_codebook(codebook: &Codebook) -> Self {
        Self {
            order: codebook.order().to_vec(),
        }
    }

    /// `(symbol, length)` pairs in canonical order.
    pub fn order(&self) -> &[(Symbol, usize)] {
        &self.order
    }

    /// Rebuild the decode trie for this record.
    pub fn decode_trie(&self) -> Result<DecodeTrie> {
        DecodeTrie::restore(&self.order)
    }

    /// Write code count, symbols and length histogram.
    pub fn write<W: Write>(&self, writer: &mut BitWriter<W>) -> Result<()> {
        writer.write_number(self.order.len() as u64, FIELD_WIDTH)?;
        for &(symbol, _) in &self.order {
            writer.write_number(u64::from(symbol), FIELD_WIDTH)?;
        }
        for count in length_histogram(&self.order) {
            writer.write_number(count as u64, FIELD_WIDTH)?;
        }
        Ok(())
    }

    /// Read and validate a header.
    ///
    /// # Errors
    /// - `FormatError::TruncatedHeader` if the archive ends inside the header
    /// - `FormatError::EmptyHeader` for a zero code count
    /// - `FormatError::UnknownSymbol` / `DuplicateSymbol` for bad symbol lists
    /// - `FormatError::HistogramOverflow` if the histogram assigns too many codes
    /// - `FormatError::InvalidCodeLengths` if lengths grow past what a tree
    ///   over `code_count` leaves allows
    pub fn read<R: Read>(reader: &mut BitReader<R>) -> Result<Self> {
        let declared = read_field(reader)? as usize;
        if declared == 0 {
            return Err(FormatError::EmptyHeader.into());
        }

        let mut seen = BTreeSet::new();
        let mut symbols = Vec::with_capacity(declared);
        for _ in 0..declared {
            let symbol = read_field(reader)? as Symbol;
            if symbol > ARCHIVE_END {
                return Err(FormatError::UnknownSymbol(symbol).into());
            }
            if !seen.insert(symbol) {
                return Err(FormatError::DuplicateSymbol(symbol).into());
            }
            symbols.push(symbol);
        }

        let mut order = Vec::with_capacity(declared);
        let mut length = 0;
        while order.len() < declared {
            length += 1;
            if length > declared {
                return Err(FormatError::InvalidCodeLengths.into());
            }
            let count = read_field(reader)? as usize;
            let start = order.len();
            let assigned = start + count;
            if assigned > declared {
                return Err(FormatError::HistogramOverflow { assigned, declared }.into());
            }
            order.extend(symbols[start..assigned].iter().map(|&symbol| (symbol, length)));
        }

        Ok(Self { order })
    }
}

fn read_field<R: Read>(reader: &mut BitReader<R>) -> Result<u64> {
    reader.read_number(FIELD_WIDTH).map_err(|e| match e {
        Error::BitIo(BitIoError::UnexpectedEof) => FormatError::TruncatedHeader.into(),
        other => other,
    })
}
