//! Integration tests for the full archive pipeline.
//!
//! These tests verify end-to-end behavior: input files -> compress -> archive
//! on disk -> decompress -> output files, with verification that every output
//! matches its input byte-for-byte.

use std::fs;
use std::path::{Path, PathBuf};

use archiver_core::{
    bitio::{BitOrder, BitReader, BitWriter},
    compress, decompress,
    error::FormatError,
    framing::{RecordHeader, Token},
    Error, ErrorKind,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

/// Generate data with mixed compressibility: runs, text-like, patterned
/// and random sections.
fn sample_data(seed: u64, size_bytes: usize) -> Vec<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(size_bytes);

    while data.len() < size_bytes {
        let section = (size_bytes - data.len()).min(4096);
        match rng.gen_range(0..10u8) {
            0..=2 => {
                let byte: u8 = rng.gen();
                data.extend(std::iter::repeat(byte).take(section));
            }
            3..=5 => {
                let alphabet = b"abcdefghijklmnopqrstuvwxyz .!,\n";
                for _ in 0..section {
                    data.push(alphabet[rng.gen_range(0..alphabet.len())]);
                }
            }
            6..=7 => {
                let pattern: Vec<u8> = (0..rng.gen_range(4..=32)).map(|_| rng.gen()).collect();
                data.extend(pattern.iter().cycle().take(section));
            }
            _ => {
                for _ in 0..section {
                    data.push(rng.gen());
                }
            }
        }
    }
    data
}

/// Workspace with `in/` for sources and `out/` for extraction.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("in")).unwrap();
        fs::create_dir(dir.path().join("out")).unwrap();
        Self { dir }
    }

    fn input(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.dir.path().join("in").join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn archive(&self) -> PathBuf {
        self.dir.path().join("archive.arc")
    }

    fn out(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    fn restored(&self, name: &str) -> Vec<u8> {
        fs::read(self.out().join(name)).expect("restored file")
    }
}

/// Sentinel that closes each record, in archive order.
fn record_terminators(archive: &Path) -> Vec<Token> {
    let mut reader = BitReader::open(archive, BitOrder::MsbFirst).unwrap();
    let mut ends = Vec::new();
    loop {
        let header = RecordHeader::read(&mut reader).unwrap();
        let trie = header.decode_trie().unwrap();
        let end = loop {
            let symbol = trie.decode_symbol(&mut reader).unwrap();
            let token = Token::from_symbol(symbol).unwrap();
            if matches!(token, Token::OneMoreFile | Token::ArchiveEnd) {
                break token;
            }
        };
        ends.push(end);
        if end == Token::ArchiveEnd {
            return ends;
        }
    }
}

/// Test a simple round trip of one text file.
#[test]
fn test_single_file_round_trip() {
    let ws = Workspace::new();
    let content = b"hello world! this is a test of the full pipeline with some repetition: aaaaaaaaaa bbbbbbbbbb";
    let input = ws.input("hello.txt", content);

    let packed = compress(&[&input], ws.archive()).expect("compress failed");
    let unpacked = decompress(ws.archive(), ws.out()).expect("decompress failed");

    assert_eq!(ws.restored("hello.txt"), content);
    assert_eq!(packed.files, unpacked.files);
    assert_eq!(packed.archive_bytes, unpacked.archive_bytes);
}

/// Three files come back as three files, in input order.
#[test]
fn test_multi_file_archive() {
    let ws = Workspace::new();
    let sources = [
        ("first.txt", b"The quick brown fox jumps over the lazy dog. ".repeat(40)),
        ("second.bin", sample_data(7, 20_000)),
        ("third.md", b"# heading\n\n- item\n- item\n".to_vec()),
    ];
    let inputs: Vec<PathBuf> = sources
        .iter()
        .map(|(name, content)| ws.input(name, content))
        .collect();

    compress(&inputs, ws.archive()).unwrap();
    let stats = decompress(ws.archive(), ws.out()).unwrap();

    let names: Vec<&str> = stats.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["first.txt", "second.bin", "third.md"]);
    for (name, content) in &sources {
        assert_eq!(&ws.restored(name), content, "{name} differs");
    }
    assert_eq!(fs::read_dir(ws.out()).unwrap().count(), 3);

    assert_eq!(
        record_terminators(&ws.archive()),
        [Token::OneMoreFile, Token::OneMoreFile, Token::ArchiveEnd]
    );
}

/// File names are stored as raw bytes, so non-UTF-8 names survive.
#[cfg(unix)]
#[test]
fn test_non_utf8_file_name_round_trip() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let ws = Workspace::new();
    let name = OsStr::from_bytes(b"caf\xe9.txt");
    let input = ws.dir.path().join("in").join(name);
    if fs::write(&input, b"latin-1 name").is_err() {
        // Filesystem insists on UTF-8 names.
        return;
    }

    compress(&[&input], ws.archive()).unwrap();
    let stats = decompress(ws.archive(), ws.out()).unwrap();

    assert_eq!(fs::read(ws.out().join(name)).unwrap(), b"latin-1 name");
    assert_eq!(stats.files[0].name, "caf\u{fffd}.txt");
}

/// Only the base name of an input path is stored.
#[test]
fn test_nested_input_stores_base_name() {
    let ws = Workspace::new();
    let nested = ws.dir.path().join("in").join("deep").join("er");
    fs::create_dir_all(&nested).unwrap();
    let input = nested.join("data.bin");
    fs::write(&input, b"nested content").unwrap();

    let stats = compress(&[&input], ws.archive()).unwrap();
    assert_eq!(stats.files[0].name, "data.bin");

    decompress(ws.archive(), ws.out()).unwrap();
    assert_eq!(ws.restored("data.bin"), b"nested content");
}

/// A zero-length file still has the name bytes and three sentinels to code.
#[test]
fn test_empty_file() {
    let ws = Workspace::new();
    let input = ws.input("e", b"");

    let stats = compress(&[&input], ws.archive()).unwrap();
    assert_eq!(stats.files[0].content_bytes, 0);
    assert_eq!(stats.files[0].distinct_symbols, 4);

    decompress(ws.archive(), ws.out()).unwrap();
    assert!(ws.restored("e").is_empty());
}

/// Test with all symbols present (full 256-byte alphabet).
#[test]
fn test_all_byte_values() {
    let ws = Workspace::new();
    let content: Vec<u8> = (0..=255u8).cycle().take(256 * 5 + 3).collect();
    let input = ws.input("alphabet.bin", &content);

    let stats = compress(&[&input], ws.archive()).unwrap();
    // 256 bytes plus the three sentinels: the full 9-bit symbol space in use.
    assert_eq!(stats.files[0].distinct_symbols, 259);

    decompress(ws.archive(), ws.out()).unwrap();
    assert_eq!(ws.restored("alphabet.bin"), content);
}

/// Test with large data spanning many buffer pages.
#[test]
fn test_large_data() {
    let ws = Workspace::new();
    let content = sample_data(42, 256 * 1024);
    let input = ws.input("large.bin", &content);

    compress(&[&input], ws.archive()).unwrap();
    decompress(ws.archive(), ws.out()).unwrap();
    assert_eq!(ws.restored("large.bin"), content);
}

/// Repetitive input shrinks.
#[test]
fn test_compresses_skewed_data() {
    let ws = Workspace::new();
    let content = vec![b'X'; 64 * 1024];
    let input = ws.input("xs", &content);

    let stats = compress(&[&input], ws.archive()).unwrap();
    assert!(stats.archive_bytes < content.len() as u64 / 4);
    assert!(stats.compression_ratio() < 0.25);
}

/// Same inputs, same archive bytes.
#[test]
fn test_archive_is_deterministic() {
    let ws = Workspace::new();
    let a = ws.input("a.txt", &sample_data(1, 5000));
    let b = ws.input("b.txt", &sample_data(2, 5000));
    let second = ws.dir.path().join("again.arc");

    compress(&[&a, &b], ws.archive()).unwrap();
    compress(&[&a, &b], &second).unwrap();
    assert_eq!(fs::read(ws.archive()).unwrap(), fs::read(&second).unwrap());
}

/// Extraction replaces an existing file of the same name.
#[test]
fn test_decompress_overwrites() {
    let ws = Workspace::new();
    let input = ws.input("same.txt", b"new");
    fs::write(ws.out().join("same.txt"), b"old and longer").unwrap();

    compress(&[&input], ws.archive()).unwrap();
    decompress(ws.archive(), ws.out()).unwrap();
    assert_eq!(ws.restored("same.txt"), b"new");
}

#[test]
fn test_no_inputs() {
    let ws = Workspace::new();
    let inputs: [&Path; 0] = [];
    let err = compress(&inputs, ws.archive()).unwrap_err();
    assert!(matches!(err, Error::NoInputs));
    assert_eq!(err.kind(), ErrorKind::Input);
}

#[test]
fn test_missing_input_file() {
    let ws = Workspace::new();
    let missing = ws.dir.path().join("in").join("missing.txt");
    let err = compress(&[&missing], ws.archive()).unwrap_err();
    assert!(matches!(err, Error::Open { .. }));
    assert_eq!(err.kind(), ErrorKind::Input);
}

#[test]
fn test_missing_archive() {
    let ws = Workspace::new();
    let err = decompress(ws.archive(), ws.out()).unwrap_err();
    assert!(matches!(err, Error::Open { .. }));
}

#[test]
fn test_empty_archive() {
    let ws = Workspace::new();
    fs::write(ws.archive(), b"").unwrap();
    let err = decompress(ws.archive(), ws.out()).unwrap_err();
    assert!(matches!(err, Error::Format(FormatError::TruncatedHeader)));
    assert_eq!(err.kind(), ErrorKind::CorruptArchive);
}

/// Cutting an archive short is reported and leaves existing files alone.
#[test]
fn test_truncated_archive() {
    let ws = Workspace::new();
    let input = ws.input("cut.txt", &sample_data(9, 10_000));
    compress(&[&input], ws.archive()).unwrap();

    let bytes = fs::read(ws.archive()).unwrap();
    fs::write(ws.archive(), &bytes[..bytes.len() / 2]).unwrap();

    fs::write(ws.out().join("cut.txt"), b"earlier extraction").unwrap();

    let err = decompress(ws.archive(), ws.out()).unwrap_err();
    assert!(matches!(err, Error::Format(FormatError::UnexpectedEnd)));
    assert_eq!(ws.restored("cut.txt"), b"earlier extraction");
    assert_eq!(fs::read_dir(ws.out()).unwrap().count(), 1);
}

/// Bytes that were never an archive: letters interleaved with 9-bit
/// one-hot patterns.
#[test]
fn test_interleaved_garbage_rejected() {
    let ws = Workspace::new();
    let mut writer = BitWriter::create(ws.archive(), BitOrder::MsbFirst).unwrap();
    for i in 0..1000usize {
        writer.write_byte(b'a'.wrapping_add(i as u8)).unwrap();
        let mut bits = [false; 9];
        bits[i % 9] = true;
        writer.write_bits(&bits).unwrap();
    }
    writer.finish().unwrap();

    let err = decompress(ws.archive(), ws.out()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptArchive);
}

/// Seeded random byte streams of many sizes always end in a format error.
#[test]
fn test_random_garbage_rejected() {
    let ws = Workspace::new();
    for seed in 0..64u64 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let len = rng.gen_range(0..4096);
        let bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
        fs::write(ws.archive(), &bytes).unwrap();

        let err = decompress(ws.archive(), ws.out()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptArchive, "seed {seed}: {err}");
    }
}

/// A record whose name decodes to a path is refused.
#[test]
fn test_path_in_stored_name_rejected() {
    use archiver_core::framing::{FILENAME_END, SENTINELS};
    use archiver_core::huffman::{Codebook, FrequencyTable, Symbol};

    let ws = Workspace::new();
    let name = b"../escape";
    let mut freqs = FrequencyTable::new();
    for &byte in name.iter() {
        *freqs.entry(Symbol::from(byte)).or_insert(0) += 1;
    }
    for sentinel in SENTINELS {
        freqs.insert(sentinel, 1);
    }
    let codebook = Codebook::from_frequencies(&freqs).unwrap();

    let mut writer = BitWriter::create(ws.archive(), BitOrder::MsbFirst).unwrap();
    RecordHeader::from_codebook(&codebook).write(&mut writer).unwrap();
    for &byte in name.iter() {
        codebook.encode_symbol(Symbol::from(byte), &mut writer).unwrap();
    }
    codebook.encode_symbol(FILENAME_END, &mut writer).unwrap();
    writer.finish().unwrap();

    let err = decompress(ws.archive(), ws.out()).unwrap_err();
    assert!(matches!(err, Error::Format(FormatError::UnsafeFileName(_))));
    assert!(!ws.dir.path().join("escape").exists());
}
