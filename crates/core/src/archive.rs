//! Multi-file archive: compress and decompress.
//!
//! Each input file becomes one self-contained record (see [`crate::framing`])
//! with its own frequency table and code table. Files are handled strictly
//! one after another; the only state carried between records is the open
//! archive stream.

use std::ffi::{OsStr, OsString};
use std::io::{Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::bitio::{BitOrder, BitReader, BitWriter};
use crate::error::{Error, FormatError, Result};
use crate::framing::{RecordHeader, Token, ARCHIVE_END, FILENAME_END, ONE_MORE_FILE, SENTINELS};
use crate::huffman::{Codebook, DecodeTrie, FrequencyTable, Symbol};
use crate::metrics::{ArchiveStats, FileStats};

/// Compress `inputs`, in order, into a new archive at `archive`.
///
/// Only each input's base name is stored, as the raw bytes of its last path
/// component. The archive is created (or truncated) before the first input
/// is read.
///
/// # Errors
/// - `Error::NoInputs` for an empty input list
/// - `Error::Open` / `Error::Io` if a file cannot be read or written
/// - `Error::InvalidInputName` if an input has no base name (or, off Unix,
///   a base name that is not UTF-8)
pub fn compress<P: AsRef<Path>>(inputs: &[P], archive: impl AsRef<Path>) -> Result<ArchiveStats> {
    if inputs.is_empty() {
        return Err(Error::NoInputs);
    }

    let archive = archive.as_ref();
    let mut stats = ArchiveStats::new();
    let mut writer = BitWriter::create(archive, BitOrder::MsbFirst)?;

    for (i, input) in inputs.iter().enumerate() {
        let is_last = i + 1 == inputs.len();
        let file = compress_file(input.as_ref(), is_last, &mut writer)?;
        info!(
            file = %file.name,
            bytes = file.content_bytes,
            symbols = file.distinct_symbols,
            "compressed file"
        );
        stats.record_file(file);
    }

    stats.archive_bytes = writer.bits_written().div_ceil(8);
    writer.finish()?;
    stats.complete();

    info!(
        archive = %archive.display(),
        files = stats.files.len(),
        bytes = stats.archive_bytes,
        "archive written"
    );
    Ok(stats)
}

/// Write one record for `path`.
fn compress_file<W: Write>(
    path: &Path,
    is_last: bool,
    writer: &mut BitWriter<W>,
) -> Result<FileStats> {
    let name = base_name(path)?;
    let mut reader = BitReader::open(path, BitOrder::MsbFirst)?;

    let display_name = String::from_utf8_lossy(name).into_owned();

    let mut frequencies = FrequencyTable::new();
    for &byte in name {
        *frequencies.entry(Symbol::from(byte)).or_insert(0) += 1;
    }
    let mut content_bytes = 0u64;
    while !reader.at_end()? {
        let byte = reader.read_byte()?;
        *frequencies.entry(Symbol::from(byte)).or_insert(0) += 1;
        content_bytes += 1;
    }
    for sentinel in SENTINELS {
        frequencies.insert(sentinel, 1);
    }

    let codebook = Codebook::from_frequencies(&frequencies)?;
    debug!(
        file = %display_name,
        symbols = codebook.len(),
        max_length = codebook.max_length(),
        "record code table"
    );
    RecordHeader::from_codebook(&codebook).write(writer)?;

    for &byte in name {
        codebook.encode_symbol(Symbol::from(byte), writer)?;
    }
    codebook.encode_symbol(FILENAME_END, writer)?;

    reader.rewind()?;
    while !reader.at_end()? {
        codebook.encode_symbol(Symbol::from(reader.read_byte()?), writer)?;
    }
    codebook.encode_symbol(if is_last { ARCHIVE_END } else { ONE_MORE_FILE }, writer)?;

    Ok(FileStats {
        name: display_name,
        content_bytes,
        distinct_symbols: codebook.len(),
    })
}

/// Raw bytes of the last path component.
fn base_name(path: &Path) -> Result<&[u8]> {
    path.file_name()
        .and_then(name_bytes)
        .ok_or_else(|| Error::InvalidInputName {
            path: path.to_path_buf(),
        })
}

#[cfg(unix)]
fn name_bytes(name: &OsStr) -> Option<&[u8]> {
    use std::os::unix::ffi::OsStrExt;
    Some(name.as_bytes())
}

#[cfg(not(unix))]
fn name_bytes(name: &OsStr) -> Option<&[u8]> {
    name.to_str().map(str::as_bytes)
}

/// Extract every file in `archive` into `output_dir`.
///
/// Files are created under their stored base names, replacing existing files.
/// Each file is staged in `output_dir` and only moved into place once its
/// record decodes completely, so a corrupt record never clobbers an existing
/// file.
///
/// # Errors
/// - `Error::Open` if the archive or an output file cannot be opened
/// - `Error::Format` if the archive is corrupt or not an archive at all
pub fn decompress(archive: impl AsRef<Path>, output_dir: impl AsRef<Path>) -> Result<ArchiveStats> {
    let archive = archive.as_ref();
    let output_dir = output_dir.as_ref();
    let mut reader = BitReader::open(archive, BitOrder::MsbFirst)?;
    let mut stats = ArchiveStats::new();

    loop {
        let (file, more) = decompress_record(&mut reader, output_dir)?;
        info!(file = %file.name, bytes = file.content_bytes, "extracted file");
        stats.record_file(file);
        if !more {
            break;
        }
    }

    stats.archive_bytes = reader.position().div_ceil(8);
    stats.complete();
    info!(
        archive = %archive.display(),
        files = stats.files.len(),
        "archive extracted"
    );
    Ok(stats)
}

/// Decode one record; the flag is true when another record follows.
fn decompress_record<R: Read>(
    reader: &mut BitReader<R>,
    output_dir: &Path,
) -> Result<(FileStats, bool)> {
    let header = RecordHeader::read(reader)?;
    let trie = header.decode_trie()?;

    let mut name = Vec::new();
    loop {
        match next_token(&trie, reader)? {
            Token::Byte(byte) => name.push(byte),
            Token::FilenameEnd => break,
            other => {
                return Err(FormatError::UnexpectedSymbol {
                    symbol: other.symbol(),
                    context: "file name",
                }
                .into())
            }
        }
    }
    let name = checked_file_name(name)?;
    let display_name = name.to_string_lossy().into_owned();
    debug!(file = %display_name, symbols = trie.symbol_count(), "record header decoded");

    let mut staged = staging_file(output_dir)?;
    let mut writer = BitWriter::new(staged.as_file_mut(), BitOrder::MsbFirst);
    let mut content_bytes = 0u64;
    let more = loop {
        match next_token(&trie, reader)? {
            Token::Byte(byte) => {
                writer.write_byte(byte)?;
                content_bytes += 1;
            }
            Token::OneMoreFile => break true,
            Token::ArchiveEnd => break false,
            Token::FilenameEnd => {
                return Err(FormatError::UnexpectedSymbol {
                    symbol: FILENAME_END,
                    context: "file content",
                }
                .into())
            }
        }
    };
    writer.finish()?;

    let target = output_dir.join(&name);
    staged
        .persist(&target)
        .map_err(|e| Error::open(target, e.error))?;

    let file = FileStats {
        name: display_name,
        content_bytes,
        distinct_symbols: trie.symbol_count(),
    };
    Ok((file, more))
}

fn next_token<R: Read>(trie: &DecodeTrie, reader: &mut BitReader<R>) -> Result<Token> {
    let symbol = trie.decode_symbol(reader)?;
    Token::from_symbol(symbol).ok_or_else(|| FormatError::UnknownSymbol(symbol).into())
}

/// Temporary file in `dir` that a record is decoded into.
///
/// Dropped (and removed) unless persisted.
fn staging_file(dir: &Path) -> Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".archiver-");
    #[cfg(unix)]
    {
        // Same mode as a plain create, before the umask.
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(dir).map_err(|e| Error::open(dir, e))
}

/// Accept only a plain, non-empty file name.
///
/// Names are raw bytes; only separators, NUL and the `.`/`..` entries are
/// refused. Backslash is a separator everywhere but Unix.
fn checked_file_name(bytes: Vec<u8>) -> Result<OsString> {
    let separator = |byte: u8| byte == b'/' || (cfg!(not(unix)) && byte == b'\\');
    let unsafe_name = bytes.is_empty()
        || bytes == b"."
        || bytes == b".."
        || bytes.iter().any(|&byte| byte == 0 || separator(byte));
    if unsafe_name {
        return Err(unsafe_file_name(&bytes));
    }
    os_file_name(bytes)
}

fn unsafe_file_name(bytes: &[u8]) -> Error {
    FormatError::UnsafeFileName(String::from_utf8_lossy(bytes).into_owned()).into()
}

#[cfg(unix)]
fn os_file_name(bytes: Vec<u8>) -> Result<OsString> {
    use std::os::unix::ffi::OsStringExt;
    Ok(OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn os_file_name(bytes: Vec<u8>) -> Result<OsString> {
    String::from_utf8(bytes)
        .map(OsString::from)
        .map_err(|e| unsafe_file_name(e.as_bytes()))
}
