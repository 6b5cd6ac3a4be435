//! Buffered bit-level I/O over files.
//!
//! [`BitWriter`] and [`BitReader`] move data through a fixed-size page so a
//! file is touched once per [`PAGE_SIZE`] bytes. Bits are packed MSB-first
//! within each byte, which is what Huffman code bits use. The [`BitOrder`]
//! given at construction only affects how fixed-width integers are converted
//! to and from bit sequences.
//!
//! # Padding Rules
//! - BitWriter: pads the final partial byte with trailing zeros
//! - BitReader: reports end of data only at the end of the underlying bytes;
//!   the caller must know where real data stops inside the last byte
//!
//! # Example
//! ```
//! use archiver_core::bitio::{BitOrder, BitReader, BitWriter};
//!
//! let mut bytes = Vec::new();
//! let mut writer = BitWriter::new(&mut bytes, BitOrder::MsbFirst);
//! writer.write_number(0b101, 3).unwrap();
//! writer.write_bits(&[true, true]).unwrap();
//! writer.finish().unwrap();
//! assert_eq!(bytes, vec![0b10111000]);
//!
//! let mut reader = BitReader::new(bytes.as_slice(), BitOrder::MsbFirst);
//! assert_eq!(reader.read_number(3).unwrap(), 0b101);
//! assert_eq!(reader.read_bits(2).unwrap(), vec![true, true]);
//! ```

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{BitIoError, Error, Result};

/// Size of the internal byte page.
pub const PAGE_SIZE: usize = 1024;

/// How a fixed-width integer maps onto the bit sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BitOrder {
    /// First bit on the wire is the most significant (big-endian fields)
    #[default]
    MsbFirst,
    /// First bit on the wire is the least significant
    LsbFirst,
}

impl BitOrder {
    fn to_number(self, bits: &[bool]) -> u64 {
        let push = |acc: u64, &bit: &bool| (acc << 1) | u64::from(bit);
        match self {
            BitOrder::MsbFirst => bits.iter().fold(0, push),
            BitOrder::LsbFirst => bits.iter().rev().fold(0, push),
        }
    }

    fn to_bits(self, value: u64, width: usize) -> Vec<bool> {
        let bit_at = |i: usize| (value >> i) & 1 == 1;
        match self {
            BitOrder::MsbFirst => (0..width).rev().map(bit_at).collect(),
            BitOrder::LsbFirst => (0..width).map(bit_at).collect(),
        }
    }
}

/// Reads bits MSB-first from a byte source, one page at a time.
///
/// # Invariants
/// - `pos < len` exactly when unread bits are buffered
/// - `bit` is the number of bits already consumed from `page[pos]` (0-7)
#[derive(Debug)]
pub struct BitReader<R> {
    inner: R,
    page: Box<[u8]>,
    /// Valid bytes in `page`
    len: usize,
    /// Current byte in `page`
    pos: usize,
    bit: u8,
    /// Underlying reader reported end of data
    drained: bool,
    /// Bits consumed since the start (or the last rewind)
    consumed: u64,
    order: BitOrder,
}

impl BitReader<File> {
    /// Open a file for bit-level reading.
    ///
    /// # Errors
    /// `Error::Open` if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>, order: BitOrder) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::open(path, e))?;
        Ok(Self::new(file, order))
    }
}

impl<R: Read> BitReader<R> {
    /// Wrap any byte source.
    pub fn new(inner: R, order: BitOrder) -> Self {
        Self {
            inner,
            page: vec![0u8; PAGE_SIZE].into_boxed_slice(),
            len: 0,
            pos: 0,
            bit: 0,
            drained: false,
            consumed: 0,
            order,
        }
    }

    fn refill(&mut self) -> Result<()> {
        let mut filled = 0;
        while filled < self.page.len() {
            match self.inner.read(&mut self.page[filled..]) {
                Ok(0) => {
                    self.drained = true;
                    break;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.len = filled;
        self.pos = 0;
        self.bit = 0;
        Ok(())
    }

    /// Check whether all buffered and underlying bytes are consumed.
    ///
    /// Refills the page when it is empty, so poll this before each read
    /// rather than once up front.
    pub fn at_end(&mut self) -> Result<bool> {
        if self.pos < self.len {
            return Ok(false);
        }
        if self.drained {
            return Ok(true);
        }
        self.refill()?;
        Ok(self.len == 0)
    }

    /// Read a single bit.
    ///
    /// # Errors
    /// `BitIoError::UnexpectedEof` once the source is exhausted.
    pub fn read_bit(&mut self) -> Result<bool> {
        if self.at_end()? {
            return Err(BitIoError::UnexpectedEof.into());
        }
        let bit = (self.page[self.pos] >> (7 - self.bit)) & 1 == 1;
        self.bit += 1;
        if self.bit == 8 {
            self.bit = 0;
            self.pos += 1;
        }
        self.consumed += 1;
        Ok(bit)
    }

    /// Read `count` bits in stream order.
    pub fn read_bits(&mut self, count: usize) -> Result<Vec<bool>> {
        (0..count).map(|_| self.read_bit()).collect()
    }

    /// Read a `width`-bit integer using the reader's [`BitOrder`].
    ///
    /// # Errors
    /// - `BitIoError::InvalidBitCount` if width > 64
    /// - `BitIoError::UnexpectedEof` if the source ends inside the field
    pub fn read_number(&mut self, width: usize) -> Result<u64> {
        if width > 64 {
            return Err(BitIoError::InvalidBitCount(width).into());
        }
        let bits = self.read_bits(width)?;
        Ok(self.order.to_number(&bits))
    }

    /// Read one raw byte, byte-aligned.
    ///
    /// Any partially read byte is skipped first. Returns 0 past end of data;
    /// callers check [`at_end`](Self::at_end) to tell padding from content.
    pub fn read_byte(&mut self) -> Result<u8> {
        if self.bit != 0 {
            self.consumed += u64::from(8 - self.bit);
            self.bit = 0;
            self.pos += 1;
        }
        if self.at_end()? {
            return Ok(0);
        }
        let byte = self.page[self.pos];
        self.pos += 1;
        self.consumed += 8;
        Ok(byte)
    }

    /// Number of bits consumed so far.
    pub fn position(&self) -> u64 {
        self.consumed
    }
}

impl<R: Read + Seek> BitReader<R> {
    /// Seek back to the first byte and clear end-of-data state.
    pub fn rewind(&mut self) -> Result<()> {
        self.inner.seek(SeekFrom::Start(0))?;
        self.len = 0;
        self.pos = 0;
        self.bit = 0;
        self.drained = false;
        self.consumed = 0;
        Ok(())
    }
}

/// Writes bits MSB-first into a byte sink, one page at a time.
///
/// Call [`finish`](Self::finish) to flush and observe write errors. A writer
/// dropped without `finish` still flushes what it holds, ignoring errors.
///
/// # Invariants
/// - `pos < page.len()` between calls (full pages are flushed immediately)
/// - `bit` is the number of bits already placed in `page[pos]` (0-7)
#[derive(Debug)]
pub struct BitWriter<W: Write> {
    inner: W,
    page: Box<[u8]>,
    pos: usize,
    bit: u8,
    written: u64,
    order: BitOrder,
    finished: bool,
}

impl BitWriter<File> {
    /// Create (or truncate) a file for bit-level writing.
    ///
    /// # Errors
    /// `Error::Open` if the file cannot be created.
    pub fn create(path: impl AsRef<Path>, order: BitOrder) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| Error::open(path, e))?;
        Ok(Self::new(file, order))
    }
}

impl<W: Write> BitWriter<W> {
    /// Wrap any byte sink.
    pub fn new(inner: W, order: BitOrder) -> Self {
        Self {
            inner,
            page: vec![0u8; PAGE_SIZE].into_boxed_slice(),
            pos: 0,
            bit: 0,
            written: 0,
            order,
            finished: false,
        }
    }

    /// Write a single bit.
    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        if bit {
            self.page[self.pos] |= 1 << (7 - self.bit);
        }
        self.bit += 1;
        self.written += 1;
        if self.bit == 8 {
            self.bit = 0;
            self.pos += 1;
            if self.pos == self.page.len() {
                self.flush_page()?;
            }
        }
        Ok(())
    }

    /// Write bits in the given order.
    pub fn write_bits(&mut self, bits: &[bool]) -> Result<()> {
        bits.iter().try_for_each(|&bit| self.write_bit(bit))
    }

    /// Write one raw byte.
    ///
    /// On a byte boundary the byte is stored directly; otherwise its eight
    /// bits go through the bit path MSB-first.
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        if self.bit != 0 {
            return self.write_bits(&BitOrder::MsbFirst.to_bits(u64::from(byte), 8));
        }
        self.page[self.pos] = byte;
        self.pos += 1;
        self.written += 8;
        if self.pos == self.page.len() {
            self.flush_page()?;
        }
        Ok(())
    }

    /// Write `value` as a `width`-bit field, zero-padded, in the writer's
    /// [`BitOrder`].
    ///
    /// # Errors
    /// - `BitIoError::InvalidBitCount` if width > 64
    /// - `BitIoError::ValueTooWide` if value needs more than `width` bits
    pub fn write_number(&mut self, value: u64, width: usize) -> Result<()> {
        if width > 64 {
            return Err(BitIoError::InvalidBitCount(width).into());
        }
        if width < 64 && value >> width != 0 {
            return Err(BitIoError::ValueTooWide { value, width }.into());
        }
        let bits = self.order.to_bits(value, width);
        self.write_bits(&bits)
    }

    /// Total number of bits written so far.
    pub fn bits_written(&self) -> u64 {
        self.written
    }

    /// Flush buffered bytes, padding a partial final byte with zeros.
    fn flush_page(&mut self) -> Result<()> {
        let len = self.pos + usize::from(self.bit > 0);
        if len > 0 {
            self.inner.write_all(&self.page[..len])?;
            self.page[..len].fill(0);
        }
        self.pos = 0;
        self.bit = 0;
        Ok(())
    }

    /// Flush everything to the underlying sink.
    ///
    /// Any partial final byte is padded with zeros; no more bits can be
    /// written afterwards.
    pub fn finish(mut self) -> Result<()> {
        self.finished = true;
        self.flush_page()?;
        self.inner.flush()?;
        Ok(())
    }
}

impl<W: Write> Drop for BitWriter<W> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.flush_page();
            let _ = self.inner.flush();
        }
    }
}
