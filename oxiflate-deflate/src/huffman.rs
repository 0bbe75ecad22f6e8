//! Huffman coding for DEFLATE compression.
//!
//! This module implements canonical Huffman decoding and length-limited code
//! construction as specified in RFC 1951. DEFLATE uses canonical Huffman
//! codes, where codes of the same length are assigned consecutive values in
//! lexicographic order, so a code is fully described by its bit lengths.
//!
//! # Alphabets
//!
//! DEFLATE uses three Huffman alphabets:
//! - **Literal/Length**: 0-285 (0-255 literals, 256 EOB, 257-285 lengths)
//! - **Distance**: 0-29 (back-reference distances)
//! - **Code Length**: 0-18 (for encoding dynamic Huffman trees)
//!
//! Decoding never consumes input it does not need: a symbol is resolved from
//! the bits already held, and bytes are pulled one at a time only while the
//! held bits are a strict prefix of some code.

use oxiflate_core::BitReader;
use oxiflate_core::buffers::StreamBuffers;
use oxiflate_core::error::{OxiFlateError, Result};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Maximum code length in DEFLATE (15 bits).
pub const MAX_CODE_LENGTH: usize = 15;

/// Maximum length of a code length code (7 bits).
pub const MAX_CODELEN_LENGTH: u8 = 7;

/// Size of the literal/length alphabet (0-285).
pub const LITLEN_ALPHABET_SIZE: usize = 286;

/// Size of the distance alphabet (0-29).
pub const DISTANCE_ALPHABET_SIZE: usize = 30;

/// Size of the code length alphabet (0-18).
pub const CODELEN_ALPHABET_SIZE: usize = 19;

/// End of block symbol.
pub const END_OF_BLOCK: u16 = 256;

/// Number of bits resolved by a single table lookup.
const FAST_BITS: u8 = 9;
const FAST_MASK: u32 = (1 << FAST_BITS) - 1;

/// Outcome of matching held bits against a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// A complete code was recognized.
    Symbol {
        /// Decoded symbol.
        symbol: u16,
        /// Code length in bits.
        length: u8,
    },
    /// The held bits are a prefix of a longer code.
    Incomplete,
    /// The held bits match no code.
    Invalid,
}

/// A canonical Huffman code for decoding.
///
/// Codes up to `FAST_BITS` long resolve through a direct lookup table.
/// Longer codes, and any lookup with fewer bits held, walk the canonical
/// code one length at a time.
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    /// Direct lookup table, `symbol << 4 | length`; zero marks a miss.
    fast_table: Vec<u16>,
    /// Number of codes of each length.
    counts: [u16; MAX_CODE_LENGTH + 1],
    /// Symbols ordered by (code length, symbol).
    symbols: Vec<u16>,
    /// Longest code length in use.
    max_length: u8,
    /// Whether the code fills the whole code space.
    complete: bool,
}

impl HuffmanTree {
    /// Build a Huffman tree from code lengths.
    ///
    /// # Arguments
    ///
    /// * `code_lengths` - Array where `code_lengths[i]` is the bit length for symbol `i`.
    ///   A length of 0 means the symbol is not used.
    ///
    /// Over-subscribed codes are rejected. Incomplete codes are rejected too,
    /// except for an empty code and a code with a single one-bit symbol,
    /// which DEFLATE permits for sparse distance codes.
    pub fn from_code_lengths(code_lengths: &[u8]) -> Result<Self> {
        let mut counts = [0u16; MAX_CODE_LENGTH + 1];
        for &len in code_lengths {
            if usize::from(len) > MAX_CODE_LENGTH {
                return Err(OxiFlateError::invalid_header(format!(
                    "Code length {len} exceeds maximum {MAX_CODE_LENGTH}"
                )));
            }
            counts[usize::from(len)] += 1;
        }
        counts[0] = 0;

        let mut left = 1i32;
        for &count in &counts[1..] {
            left <<= 1;
            left -= i32::from(count);
            if left < 0 {
                return Err(OxiFlateError::invalid_header("Over-subscribed Huffman tree"));
            }
        }

        let total: u16 = counts.iter().sum();
        if left > 0 && total > 0 && !(total == 1 && counts[1] == 1) {
            return Err(OxiFlateError::invalid_header("Incomplete Huffman tree"));
        }

        Ok(Self::build(code_lengths))
    }

    /// Build a tree from code lengths already known to be valid.
    pub(crate) fn build(code_lengths: &[u8]) -> Self {
        let mut counts = [0u16; MAX_CODE_LENGTH + 1];
        let mut max_length = 0u8;
        for &len in code_lengths {
            counts[usize::from(len)] += 1;
            max_length = max_length.max(len);
        }
        counts[0] = 0;

        let mut left = 1i32;
        for &count in &counts[1..] {
            left = (left << 1) - i32::from(count);
        }

        // Offsets of each length within the sorted symbol list
        let mut offsets = [0usize; MAX_CODE_LENGTH + 2];
        for len in 1..=MAX_CODE_LENGTH {
            offsets[len + 1] = offsets[len] + usize::from(counts[len]);
        }
        let mut symbols = vec![0u16; offsets[MAX_CODE_LENGTH + 1]];
        for (symbol, &len) in code_lengths.iter().enumerate() {
            if len > 0 {
                symbols[offsets[usize::from(len)]] = symbol as u16;
                offsets[usize::from(len)] += 1;
            }
        }

        let mut fast_table = vec![0u16; 1 << FAST_BITS];
        for (symbol, code) in canonical_codes(code_lengths).iter().enumerate() {
            if code.length == 0 || code.length > FAST_BITS {
                continue;
            }
            let entry = ((symbol as u16) << 4) | u16::from(code.length);
            let step = 1usize << code.length;
            let mut index = usize::from(code.code);
            while index < fast_table.len() {
                fast_table[index] = entry;
                index += step;
            }
        }

        Self {
            fast_table,
            counts,
            symbols,
            max_length,
            complete: left == 0,
        }
    }

    /// Check whether the code fills the whole code space.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Longest code length in use (0 for an empty code).
    pub fn max_length(&self) -> u8 {
        self.max_length
    }

    /// Match the low `available` bits of `bits` against the code.
    #[inline]
    pub fn lookup(&self, bits: u32, available: u8) -> Lookup {
        if available >= FAST_BITS {
            let entry = self.fast_table[(bits & FAST_MASK) as usize];
            if entry != 0 {
                return Lookup::Symbol {
                    symbol: entry >> 4,
                    length: (entry & 0xF) as u8,
                };
            }
        }

        // Canonical walk: codes are sent MSB-first
        let mut code = 0i32;
        let mut first = 0i32;
        let mut index = 0i32;
        for len in 1..=usize::from(self.max_length) {
            if len > usize::from(available) {
                return Lookup::Incomplete;
            }
            code |= ((bits >> (len - 1)) & 1) as i32;
            let count = i32::from(self.counts[len]);
            if code - count < first {
                return Lookup::Symbol {
                    symbol: self.symbols[(index + code - first) as usize],
                    length: len as u8,
                };
            }
            index += count;
            first = (first + count) << 1;
            code <<= 1;
        }
        Lookup::Invalid
    }

    /// Resolve the next symbol without consuming its bits.
    ///
    /// Pulls input bytes into `reader` only while the held bits are an
    /// incomplete code.
    ///
    /// # Returns
    ///
    /// `Some((symbol, length))`, or `None` when the input ran out first.
    #[inline]
    pub fn peek_symbol(
        &self,
        reader: &mut BitReader,
        buf: &mut StreamBuffers<'_, '_>,
    ) -> Result<Option<(u16, u8)>> {
        loop {
            let available = reader.available().min(MAX_CODE_LENGTH as u8);
            match self.lookup(reader.peek_bits(available), available) {
                Lookup::Symbol { symbol, length } => return Ok(Some((symbol, length))),
                Lookup::Invalid => {
                    return Err(OxiFlateError::invalid_huffman(reader.bits_read()));
                }
                Lookup::Incomplete => {
                    if !reader.pull_byte(buf) {
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Decode and consume the next symbol.
    #[inline]
    pub fn decode(
        &self,
        reader: &mut BitReader,
        buf: &mut StreamBuffers<'_, '_>,
    ) -> Result<Option<u16>> {
        Ok(self.peek_symbol(reader, buf)?.map(|(symbol, length)| {
            reader.skip_bits(length);
            symbol
        }))
    }
}

/// A code ready for the bit writer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HuffmanCode {
    /// Code bits, already reversed for LSB-first output.
    pub code: u16,
    /// Code length in bits (0 = symbol unused).
    pub length: u8,
}

/// Assign canonical codes to a list of code lengths.
pub fn canonical_codes(code_lengths: &[u8]) -> Vec<HuffmanCode> {
    let mut counts = [0u32; MAX_CODE_LENGTH + 1];
    for &len in code_lengths {
        counts[usize::from(len)] += 1;
    }
    counts[0] = 0;

    let mut next_code = [0u32; MAX_CODE_LENGTH + 1];
    let mut code = 0u32;
    for bits in 1..=MAX_CODE_LENGTH {
        code = (code + counts[bits - 1]) << 1;
        next_code[bits] = code;
    }

    code_lengths
        .iter()
        .map(|&len| {
            if len == 0 {
                return HuffmanCode::default();
            }
            let code = next_code[usize::from(len)];
            next_code[usize::from(len)] += 1;
            HuffmanCode {
                code: reverse_bits(code as u16, len),
                length: len,
            }
        })
        .collect()
}

/// Reverse the low `length` bits of a code.
pub fn reverse_bits(code: u16, length: u8) -> u16 {
    if length == 0 {
        return 0;
    }
    code.reverse_bits() >> (16 - length)
}

/// Node of the package-merge forest.
#[derive(Debug, Clone, Copy)]
enum Node {
    Leaf(usize),
    Package(usize, usize),
}

/// Builder for creating Huffman code lengths from frequencies.
#[derive(Debug, Clone)]
pub struct HuffmanBuilder {
    frequencies: Vec<u32>,
    max_length: u8,
}

impl HuffmanBuilder {
    /// Create a new Huffman builder.
    pub fn new(alphabet_size: usize, max_length: u8) -> Self {
        Self {
            frequencies: vec![0; alphabet_size],
            max_length,
        }
    }

    /// Create a builder from an existing frequency table.
    pub fn from_frequencies(frequencies: &[u32], max_length: u8) -> Self {
        Self {
            frequencies: frequencies.to_vec(),
            max_length,
        }
    }

    /// Add a symbol occurrence.
    pub fn add(&mut self, symbol: u16) {
        self.add_count(symbol, 1);
    }

    /// Add multiple occurrences of a symbol.
    pub fn add_count(&mut self, symbol: u16, count: u32) {
        if let Some(freq) = self.frequencies.get_mut(usize::from(symbol)) {
            *freq += count;
        }
    }

    /// Current frequency table.
    pub fn frequencies(&self) -> &[u32] {
        &self.frequencies
    }

    /// Build code lengths from frequencies.
    ///
    /// Returns an array where `result[i]` is the code length for symbol `i`.
    /// At least two symbols always receive a code (unused ones are borrowed
    /// from the lowest free symbols) so the result is a complete code no
    /// longer than the builder's limit.
    pub fn build_lengths(&self) -> Vec<u8> {
        let n = self.frequencies.len();
        let mut lengths = vec![0u8; n];

        let mut symbols: Vec<(u32, usize)> = self
            .frequencies
            .iter()
            .enumerate()
            .filter(|&(_, &f)| f > 0)
            .map(|(i, &f)| (f, i))
            .collect();

        for symbol in 0..n {
            if symbols.len() >= 2 {
                break;
            }
            if self.frequencies[symbol] == 0 {
                symbols.push((1, symbol));
            }
        }
        if symbols.len() < 2 {
            if let Some(&(_, symbol)) = symbols.first() {
                lengths[symbol] = 1;
            }
            return lengths;
        }

        symbols.sort_unstable();

        let depths = Self::tree_depths(&symbols);
        let code_lengths = if depths.iter().any(|&d| d > usize::from(self.max_length)) {
            self.package_merge(&symbols)
        } else {
            depths.iter().map(|&d| d as u8).collect()
        };

        for (&(_, symbol), &len) in symbols.iter().zip(&code_lengths) {
            lengths[symbol] = len;
        }
        lengths
    }

    /// Unrestricted Huffman depths for symbols sorted by frequency.
    fn tree_depths(symbols: &[(u32, usize)]) -> Vec<usize> {
        let m = symbols.len();
        // Ties go to the shallower subtree to keep lengths short
        let mut heap: BinaryHeap<Reverse<(u64, usize, usize)>> = symbols
            .iter()
            .enumerate()
            .map(|(i, &(f, _))| Reverse((u64::from(f), 0, i)))
            .collect();

        let mut parent = vec![0usize; 2 * m - 1];
        let mut next = m;
        while heap.len() > 1 {
            let (Some(Reverse((w1, d1, a))), Some(Reverse((w2, d2, b)))) = (heap.pop(), heap.pop())
            else {
                break;
            };
            parent[a] = next;
            parent[b] = next;
            heap.push(Reverse((w1 + w2, d1.max(d2) + 1, next)));
            next += 1;
        }

        // Parents are numbered above their children; the root is last
        let mut depth = vec![0usize; 2 * m - 1];
        for node in (0..2 * m - 2).rev() {
            depth[node] = depth[parent[node]] + 1;
        }
        depth.truncate(m);
        depth
    }

    /// Package-merge algorithm for length-limited Huffman codes.
    fn package_merge(&self, symbols: &[(u32, usize)]) -> Vec<u8> {
        let m = symbols.len();
        let mut arena: Vec<Node> = (0..m).map(Node::Leaf).collect();
        let leaves: Vec<(u64, usize)> = symbols
            .iter()
            .enumerate()
            .map(|(i, &(f, _))| (u64::from(f), i))
            .collect();

        let mut current = leaves.clone();
        for _ in 1..self.max_length {
            let packages: Vec<(u64, usize)> = current
                .chunks_exact(2)
                .map(|pair| {
                    arena.push(Node::Package(pair[0].1, pair[1].1));
                    (pair[0].0 + pair[1].0, arena.len() - 1)
                })
                .collect();

            let mut merged = Vec::with_capacity(leaves.len() + packages.len());
            let (mut i, mut j) = (0, 0);
            while i < leaves.len() || j < packages.len() {
                let take_leaf = j >= packages.len()
                    || (i < leaves.len() && leaves[i].0 <= packages[j].0);
                if take_leaf {
                    merged.push(leaves[i]);
                    i += 1;
                } else {
                    merged.push(packages[j]);
                    j += 1;
                }
            }
            current = merged;
        }

        let mut lengths = vec![0u8; m];
        let mut stack = Vec::new();
        for &(_, item) in current.iter().take(2 * m - 2) {
            stack.push(item);
            while let Some(node) = stack.pop() {
                match arena[node] {
                    Node::Leaf(leaf) => lengths[leaf] += 1,
                    Node::Package(a, b) => {
                        stack.push(a);
                        stack.push(b);
                    }
                }
            }
        }
        lengths
    }
}
