//! Canonical Huffman codec.
//!
//! Encoding side: a [`HuffmanTree`] is built from symbol frequencies, its leaf
//! depths become code lengths, and the [`Codebook`] assigns canonical codes
//! from those lengths alone.
//!
//! Decoding side: only the canonical order (symbols sorted by length, then by
//! value) travels in the archive. [`DecodeTrie::restore`] replays the same
//! assignment and builds a binary trie that resolves bits back to symbols.
//!
//! # Canonical assignment
//!
//! Walking the canonical order, the first code is all zeros at the first
//! length. Each following code is the previous one plus one, then padded on
//! the right with zeros up to its own length. Equal-length codes are therefore
//! consecutive integers and no code is a prefix of another.
//!
//! Trees and tries are arenas of nodes addressed by index. They are built for
//! one record and dropped with it.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, VecDeque};
use std::fmt;
use std::io::{Read, Write};

use tracing::debug;

use crate::bitio::{BitReader, BitWriter};
use crate::error::{BitIoError, Error, FormatError, HuffmanError, Result};

/// Symbol identifier. 0-255 are literal bytes; larger values are structural.
pub type Symbol = u16;

/// Occurrence count per symbol. Zero counts are ignored.
pub type FrequencyTable = BTreeMap<Symbol, u64>;

#[derive(Debug, Clone, Copy)]
enum NodeKind {
    Leaf,
    Internal { left: usize, right: usize },
}

#[derive(Debug, Clone, Copy)]
struct Node {
    count: u64,
    /// Leaf symbol, or the smallest symbol below an internal node (tie-break)
    key: Symbol,
    kind: NodeKind,
}

/// Huffman tree stored as an arena; every internal node has two children.
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    nodes: Vec<Node>,
    root: usize,
}

impl HuffmanTree {
    /// Build a tree by repeatedly merging the two smallest nodes.
    ///
    /// Nodes are ordered by `(count, key)`, so equal counts are broken by
    /// symbol value and the result is deterministic. The first node popped
    /// becomes the left child.
    ///
    /// # Errors
    /// - `HuffmanError::EmptyFrequencyTable` if no symbol has a count
    /// - `HuffmanError::SingleSymbol` if only one symbol has a count
    pub fn build(frequencies: &FrequencyTable) -> Result<Self> {
        let mut nodes: Vec<Node> = frequencies
            .iter()
            .filter(|&(_, &count)| count > 0)
            .map(|(&symbol, &count)| Node {
                count,
                key: symbol,
                kind: NodeKind::Leaf,
            })
            .collect();

        match nodes.as_slice() {
            [] => return Err(HuffmanError::EmptyFrequencyTable.into()),
            [only] => return Err(HuffmanError::SingleSymbol(only.key).into()),
            _ => {}
        }

        let mut heap: BinaryHeap<Reverse<(u64, Symbol, usize)>> = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| Reverse((node.count, node.key, index)))
            .collect();

        while let (Some(Reverse(first)), Some(Reverse(second))) = (heap.pop(), heap.pop()) {
            let merged = Node {
                count: first.0 + second.0,
                key: first.1.min(second.1),
                kind: NodeKind::Internal {
                    left: first.2,
                    right: second.2,
                },
            };
            nodes.push(merged);
            heap.push(Reverse((merged.count, merged.key, nodes.len() - 1)));
        }

        // The loop exits after popping the final root alone.
        let root = nodes.len() - 1;
        Ok(Self { nodes, root })
    }

    /// Depth of every leaf, found breadth-first from the root.
    pub fn code_lengths(&self) -> BTreeMap<Symbol, usize> {
        let mut lengths = BTreeMap::new();
        let mut queue = VecDeque::from([(self.root, 0usize)]);
        while let Some((index, depth)) = queue.pop_front() {
            let node = &self.nodes[index];
            match node.kind {
                NodeKind::Leaf => {
                    lengths.insert(node.key, depth);
                }
                NodeKind::Internal { left, right } => {
                    queue.push_back((left, depth + 1));
                    queue.push_back((right, depth + 1));
                }
            }
        }
        lengths
    }

    /// Sum of all leaf counts.
    pub fn total_count(&self) -> u64 {
        self.nodes[self.root].count
    }
}

/// A code as a sequence of bits, first bit first.
///
/// Ordering is lexicographic, which for equal lengths is numeric order.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Code(Vec<bool>);

impl Code {
    /// The bits of this code.
    pub fn bits(&self) -> &[bool] {
        &self.0
    }

    /// Code length in bits.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True only for the zero-length code, which no codebook assigns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `self` is a prefix of `other` (or equal to it).
    pub fn is_prefix_of(&self, other: &Code) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Binary increment within the current length.
    fn increment(&mut self) -> std::result::Result<(), HuffmanError> {
        match self.0.iter().rposition(|&bit| !bit) {
            Some(zero) => {
                self.0[zero] = true;
                self.0[zero + 1..].fill(false);
                Ok(())
            }
            None => Err(HuffmanError::CodeSpaceExhausted),
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &bit in &self.0 {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Replay canonical assignment over `(symbol, length)` pairs.
fn assign_canonical<F>(order: &[(Symbol, usize)], mut visit: F) -> Result<()>
where
    F: FnMut(Symbol, &Code) -> Result<()>,
{
    let mut code = Code(vec![false]);
    for (i, &(symbol, length)) in order.iter().enumerate() {
        if i > 0 {
            code.increment()?;
        }
        if code.len() > length {
            return Err(HuffmanError::UnsortedLengths.into());
        }
        code.0.resize(length, false);
        visit(symbol, &code)?;
    }
    Ok(())
}

/// Number of codes of each length, for lengths `1..=max`.
///
/// Lengths of zero are not representable and are skipped.
pub fn length_histogram(order: &[(Symbol, usize)]) -> Vec<usize> {
    let max = order.iter().map(|&(_, length)| length).max().unwrap_or(0);
    let mut histogram = vec![0usize; max];
    for &(_, length) in order {
        if let Some(slot) = length.checked_sub(1) {
            histogram[slot] += 1;
        }
    }
    histogram
}

/// Canonical codes for one frequency table.
#[derive(Debug, Clone)]
pub struct Codebook {
    /// `(symbol, length)` sorted by length, then symbol
    order: Vec<(Symbol, usize)>,
    codes: BTreeMap<Symbol, Code>,
}

impl Codebook {
    /// Build canonical codes from symbol frequencies.
    ///
    /// # Errors
    /// - `HuffmanError::EmptyFrequencyTable` / `SingleSymbol` for degenerate input
    /// - `HuffmanError::CodeSpaceExhausted` if lengths overflow the code space
    pub fn from_frequencies(frequencies: &FrequencyTable) -> Result<Self> {
        let tree = HuffmanTree::build(frequencies)?;

        let mut order: Vec<(Symbol, usize)> = tree.code_lengths().into_iter().collect();
        order.sort_by_key(|&(symbol, length)| (length, symbol));

        let mut codes = BTreeMap::new();
        assign_canonical(&order, |symbol, code| {
            codes.insert(symbol, code.clone());
            Ok(())
        })?;

        let codebook = Self { order, codes };
        debug!(
            symbols = codebook.len(),
            max_length = codebook.max_length(),
            total = tree.total_count(),
            "built canonical codebook"
        );
        Ok(codebook)
    }

    /// `(symbol, length)` pairs in canonical order.
    pub fn order(&self) -> &[(Symbol, usize)] {
        &self.order
    }

    /// Code assigned to `symbol`, if it is in the table.
    pub fn code(&self, symbol: Symbol) -> Option<&Code> {
        self.codes.get(&symbol)
    }

    /// All codes keyed by symbol.
    pub fn codes(&self) -> &BTreeMap<Symbol, Code> {
        &self.codes
    }

    /// Number of symbols with a code.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Never true for a built codebook, which holds at least two codes.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Longest code length.
    pub fn max_length(&self) -> usize {
        self.order.last().map_or(0, |&(_, length)| length)
    }

    /// Count of codes per length, lengths `1..=max_length`.
    pub fn length_histogram(&self) -> Vec<usize> {
        length_histogram(&self.order)
    }

    /// Write the code for `symbol`.
    ///
    /// # Errors
    /// `HuffmanError::MissingCode` if the symbol was not in the frequency table.
    pub fn encode_symbol<W: Write>(&self, symbol: Symbol, writer: &mut BitWriter<W>) -> Result<()> {
        let code = self
            .code(symbol)
            .ok_or(HuffmanError::MissingCode(symbol))?;
        writer.write_bits(code.bits())
    }
}

const ROOT: usize = 0;

#[derive(Debug, Clone, Default)]
struct TrieNode {
    symbol: Option<Symbol>,
    /// Indexed by bit value
    children: [Option<usize>; 2],
}

/// Binary trie resolving canonical codes back to symbols.
#[derive(Debug, Clone)]
pub struct DecodeTrie {
    nodes: Vec<TrieNode>,
}

impl DecodeTrie {
    fn empty() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
        }
    }

    /// Rebuild the trie from `(symbol, length)` pairs in canonical order.
    ///
    /// # Errors
    /// - `FormatError::InvalidCodeLengths` if the lengths are unsorted or
    ///   overflow the code space
    /// - `FormatError::ConflictingCode` if two codes share a path
    /// - `FormatError::IncompleteCode` if part of the code space is unused,
    ///   which no Huffman tree produces
    pub fn restore(order: &[(Symbol, usize)]) -> Result<Self> {
        let mut trie = Self::empty();
        let mut complete = false;
        assign_canonical(order, |symbol, code| {
            trie.insert(symbol, code)?;
            complete = code.bits().iter().all(|&bit| bit);
            Ok(())
        })
        .map_err(|e| match e {
            Error::Huffman(HuffmanError::CodeSpaceExhausted | HuffmanError::UnsortedLengths) => {
                FormatError::InvalidCodeLengths.into()
            }
            other => other,
        })?;

        if !complete {
            return Err(FormatError::IncompleteCode.into());
        }
        Ok(trie)
    }

    fn insert(&mut self, symbol: Symbol, code: &Code) -> Result<()> {
        let mut node = ROOT;
        for &bit in code.bits() {
            if self.nodes[node].symbol.is_some() {
                return Err(FormatError::ConflictingCode(symbol).into());
            }
            let slot = usize::from(bit);
            node = match self.nodes[node].children[slot] {
                Some(child) => child,
                None => {
                    self.nodes.push(TrieNode::default());
                    let child = self.nodes.len() - 1;
                    self.nodes[node].children[slot] = Some(child);
                    child
                }
            };
        }

        let terminal = &mut self.nodes[node];
        if node == ROOT || terminal.symbol.is_some() || terminal.children.iter().any(Option::is_some)
        {
            return Err(FormatError::ConflictingCode(symbol).into());
        }
        terminal.symbol = Some(symbol);
        Ok(())
    }

    /// Number of symbols in the trie.
    pub fn symbol_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.symbol.is_some()).count()
    }

    /// Read bits until a terminal node is reached.
    ///
    /// # Errors
    /// - `FormatError::InvalidCode` if a bit leads to a missing branch
    /// - `FormatError::UnexpectedEnd` if the stream ends mid-code
    pub fn decode_symbol<R: Read>(&self, reader: &mut BitReader<R>) -> Result<Symbol> {
        let mut node = ROOT;
        loop {
            if let Some(symbol) = self.nodes[node].symbol {
                return Ok(symbol);
            }
            let position = reader.position();
            let bit = reader.read_bit().map_err(|e| match e {
                Error::BitIo(BitIoError::UnexpectedEof) => FormatError::UnexpectedEnd.into(),
                other => other,
            })?;
            node = self.nodes[node].children[usize::from(bit)]
                .ok_or(FormatError::InvalidCode { position })?;
        }
    }
}
