//! LZ77 match finding for DEFLATE.
//!
//! This module implements the LZ77 stage of the compressor. Input is copied
//! into a window twice the history size; every position is hashed on its
//! next three bytes and chained to earlier positions with the same hash.
//! For each position the matcher either emits a literal byte or a
//! (length, distance) back-reference of 3-258 bytes.
//!
//! # Parsers
//!
//! The compression level and strategy select one of five parsers:
//! - **Stored**: no matching, the block is copied verbatim
//! - **Fast**: greedy matching, match positions only partly hashed
//! - **Slow**: lazy matching, a match is deferred if the next byte starts
//!   a longer one
//! - **Rle**: only distance-1 matches (runs)
//! - **Huffman**: literals only
//!
//! Every parser works incrementally: it consumes what the caller's input
//! holds and reports why it stopped, so a block can be emitted and parsing
//! resumed on a later call without losing state.

use crate::deflate::Strategy;
use crate::tables::MAX_STORED_BLOCK;
use crate::wrapper::RunningCheck;
use oxiflate_core::FlushMode;
use oxiflate_core::buffers::{StreamBuffers, try_alloc};
use oxiflate_core::error::Result;

/// Minimum match length.
pub const MIN_MATCH: usize = 3;

/// Maximum match length.
pub const MAX_MATCH: usize = 258;

/// Lookahead kept ahead of the parse position so a full-length match can
/// always be checked.
pub const MIN_LOOKAHEAD: usize = MAX_MATCH + MIN_MATCH + 1;

/// Length-3 matches further back than this are not worth a back-reference.
const TOO_FAR: usize = 4096;

/// Empty hash chain slot.
const NIL: u16 = 0;

/// A token produced by LZ77 compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lz77Token {
    /// A literal byte.
    Literal(u8),
    /// A back-reference to previously seen data.
    Match {
        /// Number of bytes to copy (3-258).
        length: u16,
        /// Distance back into the window (1-32768).
        distance: u16,
    },
}

/// Which parse loop drives the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parser {
    /// Copy input into stored blocks.
    Stored,
    /// Greedy matching.
    Fast,
    /// Lazy matching.
    Slow,
    /// Run-length matching at distance 1.
    Rle,
    /// Literals only.
    Huffman,
}

/// Match search tuning for one compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchParams {
    /// Once the previous match is this long, search only a quarter of the chain.
    pub good_length: usize,
    /// Greedy: longest match whose positions are all hashed.
    /// Lazy: do not look for a better match once one is this long.
    pub max_lazy: usize,
    /// Stop searching once a match is this long.
    pub nice_length: usize,
    /// Maximum hash chain entries to visit.
    pub max_chain: usize,
    /// Parse loop to run.
    pub parser: Parser,
}

const fn params(
    good_length: usize,
    max_lazy: usize,
    nice_length: usize,
    max_chain: usize,
    parser: Parser,
) -> MatchParams {
    MatchParams {
        good_length,
        max_lazy,
        nice_length,
        max_chain,
        parser,
    }
}

/// Per-level parameters, indexed by compression level.
const LEVEL_TABLE: [MatchParams; 10] = [
    params(0, 0, 0, 0, Parser::Stored),
    params(4, 4, 8, 4, Parser::Fast),
    params(4, 5, 16, 8, Parser::Fast),
    params(4, 6, 32, 32, Parser::Fast),
    params(4, 4, 16, 16, Parser::Slow),
    params(8, 16, 32, 32, Parser::Slow),
    params(8, 16, 128, 128, Parser::Slow),
    params(8, 32, 128, 256, Parser::Slow),
    params(32, 128, 258, 1024, Parser::Slow),
    params(32, 258, 258, 4096, Parser::Slow),
];

impl MatchParams {
    /// Parameters for a level (0-9) and strategy.
    pub fn for_level(level: u8, strategy: Strategy) -> Self {
        let base = LEVEL_TABLE[usize::from(level.min(9))];
        let parser = match (level, strategy) {
            (0, _) => Parser::Stored,
            (_, Strategy::HuffmanOnly) => Parser::Huffman,
            (_, Strategy::Rle) => Parser::Rle,
            _ => base.parser,
        };
        Self { parser, ..base }
    }
}

/// Why a parse call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parse {
    /// The input is exhausted and no flush was requested.
    NeedInput,
    /// The current block should be emitted before parsing continues.
    BlockFull,
    /// All input is parsed into the current block.
    Drained,
}

/// The current block, ready for encoding.
#[derive(Debug, Clone, Copy)]
pub struct Block<'a> {
    /// Tokens of the block.
    pub tokens: &'a [Lz77Token],
    /// The uncompressed bytes the block covers, if still in the window.
    pub stored: Option<&'a [u8]>,
}

impl Block<'_> {
    /// Check whether the block covers any input.
    pub fn has_data(&self) -> bool {
        !self.tokens.is_empty() || self.stored.is_some_and(|data| !data.is_empty())
    }
}

/// Incremental LZ77 matcher with hash chains.
#[derive(Debug, Clone)]
pub struct Lz77Matcher {
    /// Input bytes; the lower half is history, the upper half new data.
    window: Vec<u8>,
    w_size: usize,
    w_mask: usize,
    /// Most recent position for each hash value.
    head: Vec<u16>,
    /// Previous position with the same hash, indexed by position & w_mask.
    prev: Vec<u16>,
    hash_bits: u32,
    /// Parse position.
    strstart: usize,
    /// Valid bytes at and after `strstart`.
    lookahead: usize,
    /// Window position where the current block starts; negative once slid out.
    block_start: isize,
    /// Input bytes covered by the current block.
    block_len: usize,
    /// Positions before `strstart` not yet hashed.
    insert: usize,
    match_start: usize,
    match_length: usize,
    prev_length: usize,
    prev_match: usize,
    match_available: bool,
    params: MatchParams,
    strategy: Strategy,
    tokens: Vec<Lz77Token>,
    token_limit: usize,
}

impl Lz77Matcher {
    /// Create a matcher.
    ///
    /// # Arguments
    ///
    /// * `window_bits` - log2 of the history size (9-15)
    /// * `mem_level` - memory level (1-9); sizes the hash table and the block
    /// * `params` - match search parameters
    /// * `strategy` - compression strategy
    pub fn new(
        window_bits: u8,
        mem_level: u8,
        params: MatchParams,
        strategy: Strategy,
    ) -> Result<Self> {
        let w_size = 1usize << window_bits;
        let hash_bits = u32::from(mem_level) + 7;
        let token_limit = (1usize << (u32::from(mem_level) + 6)) - 1;
        Ok(Self {
            window: try_alloc(2 * w_size, 0u8)?,
            w_size,
            w_mask: w_size - 1,
            head: try_alloc(1 << hash_bits, NIL)?,
            prev: try_alloc(w_size, NIL)?,
            hash_bits,
            strstart: 0,
            lookahead: 0,
            block_start: 0,
            block_len: 0,
            insert: 0,
            match_start: 0,
            match_length: MIN_MATCH - 1,
            prev_length: MIN_MATCH - 1,
            prev_match: 0,
            match_available: false,
            params,
            strategy,
            tokens: Vec::with_capacity(token_limit + 1),
            token_limit,
        })
    }

    /// Forget all input and history.
    pub fn reset(&mut self) {
        self.head.fill(NIL);
        self.strstart = 0;
        self.lookahead = 0;
        self.block_start = 0;
        self.block_len = 0;
        self.insert = 0;
        self.match_start = 0;
        self.match_length = MIN_MATCH - 1;
        self.prev_length = MIN_MATCH - 1;
        self.prev_match = 0;
        self.match_available = false;
        self.tokens.clear();
    }

    /// Switch level parameters and strategy.
    ///
    /// The caller emits the pending block first.
    pub fn set_params(&mut self, params: MatchParams, strategy: Strategy) {
        self.params = params;
        self.strategy = strategy;
        self.match_length = MIN_MATCH - 1;
        self.prev_length = MIN_MATCH - 1;
    }

    /// The active parser.
    pub fn parser(&self) -> Parser {
        self.params.parser
    }

    /// Bytes read but not yet parsed.
    pub fn lookahead(&self) -> usize {
        self.lookahead
    }

    /// Longest back-reference distance the matcher will emit.
    pub fn max_dist(&self) -> usize {
        self.w_size - MIN_LOOKAHEAD
    }

    /// Preload history so the first bytes can reference it.
    ///
    /// Only the last window's worth of a longer dictionary is kept.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) {
        self.reset();
        let dict = &dictionary[dictionary.len().saturating_sub(self.w_size)..];
        let n = dict.len();
        self.window[..n].copy_from_slice(dict);
        for pos in 0..n.saturating_sub(MIN_MATCH - 1) {
            self.insert_string(pos);
        }
        self.strstart = n;
        self.block_start = n as isize;
        self.insert = n.min(MIN_MATCH - 1);
    }

    /// Drop the match history after a full flush.
    pub fn full_flush_reset(&mut self) {
        self.head.fill(NIL);
        if self.lookahead == 0 {
            self.strstart = 0;
            self.block_start = 0;
            self.insert = 0;
        }
    }

    /// The current block.
    pub fn block(&self) -> Block<'_> {
        let stored = usize::try_from(self.block_start)
            .ok()
            .map(|start| &self.window[start..start + self.block_len]);
        Block {
            tokens: &self.tokens,
            stored,
        }
    }

    /// Mark the current block as emitted.
    pub fn finish_block(&mut self) {
        self.block_start += self.block_len as isize;
        self.block_len = 0;
        self.tokens.clear();
    }

    #[inline(always)]
    fn hash(&self, pos: usize) -> usize {
        let key = u32::from(self.window[pos])
            | (u32::from(self.window[pos + 1]) << 8)
            | (u32::from(self.window[pos + 2]) << 16);
        (key.wrapping_mul(2654435761) >> (32 - self.hash_bits)) as usize
    }

    /// Insert `pos` into its hash chain, returning the previous chain head.
    #[inline]
    fn insert_string(&mut self, pos: usize) -> u16 {
        let h = self.hash(pos);
        let old = self.head[h];
        self.prev[pos & self.w_mask] = old;
        self.head[h] = pos as u16;
        old
    }

    fn slide(&mut self) {
        let w = self.w_size;
        let end = self.strstart + self.lookahead;
        self.window.copy_within(w..end, 0);
        self.match_start = self.match_start.saturating_sub(w);
        self.strstart -= w;
        self.block_start -= w as isize;
        self.insert = self.insert.min(self.strstart);

        let w = w as u16;
        for entry in self.head.iter_mut().chain(self.prev.iter_mut()) {
            *entry = if *entry >= w { *entry - w } else { NIL };
        }
    }

    /// Read input into the window until the lookahead is sufficient or the
    /// input runs out.
    fn fill_window(&mut self, buf: &mut StreamBuffers<'_, '_>, check: &mut RunningCheck) {
        loop {
            if self.strstart >= self.w_size + self.max_dist() {
                self.slide();
            }
            if buf.avail_in() == 0 {
                break;
            }

            let start = self.strstart + self.lookahead;
            let read = buf.read_into(&mut self.window[start..]);
            check.update(&self.window[start..start + read]);
            self.lookahead += read;

            while self.insert > 0 && self.lookahead + self.insert >= MIN_MATCH {
                let pos = self.strstart - self.insert;
                self.insert_string(pos);
                self.insert -= 1;
            }

            if self.lookahead >= MIN_LOOKAHEAD || buf.avail_in() == 0 {
                break;
            }
        }
    }

    /// Length of the longest match for `strstart` along the chain from
    /// `cur_match`; sets `match_start`.
    fn longest_match(&mut self, mut cur_match: usize) -> usize {
        let mut chain = self.params.max_chain;
        let mut best_len = self.prev_length;
        let nice = self.params.nice_length.min(self.lookahead);
        let scan = self.strstart;
        let limit = scan.saturating_sub(self.max_dist());
        let max_len = MAX_MATCH.min(self.lookahead);

        if best_len >= max_len {
            return best_len.min(self.lookahead);
        }
        if self.prev_length >= self.params.good_length {
            chain >>= 2;
        }

        let window = &self.window;
        loop {
            let m = cur_match;
            if window[m + best_len] == window[scan + best_len]
                && window[m + best_len - 1] == window[scan + best_len - 1]
                && window[m] == window[scan]
                && window[m + 1] == window[scan + 1]
            {
                let len = 2 + window[m + 2..m + max_len]
                    .iter()
                    .zip(&window[scan + 2..scan + max_len])
                    .take_while(|(a, b)| a == b)
                    .count();
                if len > best_len {
                    self.match_start = m;
                    best_len = len;
                    if len >= nice {
                        break;
                    }
                }
            }

            cur_match = usize::from(self.prev[m & self.w_mask]);
            chain -= 1;
            if cur_match <= limit || chain == 0 {
                break;
            }
        }
        best_len.min(self.lookahead)
    }

    #[inline]
    fn tally_literal(&mut self, byte: u8) {
        self.tokens.push(Lz77Token::Literal(byte));
        self.block_len += 1;
    }

    #[inline]
    fn tally_match(&mut self, distance: usize, length: usize) {
        debug_assert!((MIN_MATCH..=MAX_MATCH).contains(&length));
        debug_assert!(distance >= 1 && distance <= self.max_dist());
        self.tokens.push(Lz77Token::Match {
            length: length as u16,
            distance: distance as u16,
        });
        self.block_len += length;
    }

    fn block_is_full(&self) -> bool {
        self.tokens.len() >= self.token_limit
    }

    /// Parse as much input as possible into the current block.
    ///
    /// Bytes read from `buf` are folded into `check`. With `flush` set to
    /// anything but [`FlushMode::None`], parsing continues to the end of
    /// the input instead of keeping a lookahead back.
    pub fn parse(
        &mut self,
        buf: &mut StreamBuffers<'_, '_>,
        check: &mut RunningCheck,
        flush: FlushMode,
    ) -> Parse {
        match self.params.parser {
            Parser::Stored => self.parse_stored(buf, check, flush),
            Parser::Fast => self.parse_fast(buf, check, flush),
            Parser::Slow => self.parse_slow(buf, check, flush),
            Parser::Rle => self.parse_rle(buf, check, flush),
            Parser::Huffman => self.parse_huffman(buf, check, flush),
        }
    }

    fn parse_stored(
        &mut self,
        buf: &mut StreamBuffers<'_, '_>,
        check: &mut RunningCheck,
        flush: FlushMode,
    ) -> Parse {
        let max_block = MAX_STORED_BLOCK.min(self.max_dist());
        loop {
            if self.block_len >= max_block {
                return Parse::BlockFull;
            }
            if self.lookahead == 0 {
                self.fill_window(buf, check);
                if self.lookahead == 0 {
                    return if flush == FlushMode::None {
                        Parse::NeedInput
                    } else {
                        Parse::Drained
                    };
                }
            }
            let take = self.lookahead.min(max_block - self.block_len);
            self.strstart += take;
            self.lookahead -= take;
            self.block_len += take;
        }
    }

    fn parse_fast(
        &mut self,
        buf: &mut StreamBuffers<'_, '_>,
        check: &mut RunningCheck,
        flush: FlushMode,
    ) -> Parse {
        loop {
            if self.block_is_full() {
                return Parse::BlockFull;
            }
            if self.lookahead < MIN_LOOKAHEAD {
                self.fill_window(buf, check);
                if self.lookahead < MIN_LOOKAHEAD && flush == FlushMode::None {
                    return Parse::NeedInput;
                }
                if self.lookahead == 0 {
                    break;
                }
            }

            let mut hash_head = NIL;
            if self.lookahead >= MIN_MATCH {
                hash_head = self.insert_string(self.strstart);
            }
            if hash_head != NIL && self.strstart - usize::from(hash_head) <= self.max_dist() {
                self.match_length = self.longest_match(usize::from(hash_head));
            }

            if self.match_length >= MIN_MATCH {
                self.tally_match(self.strstart - self.match_start, self.match_length);
                self.lookahead -= self.match_length;

                if self.match_length <= self.params.max_lazy && self.lookahead >= MIN_MATCH {
                    self.match_length -= 1;
                    while self.match_length > 0 {
                        self.strstart += 1;
                        self.insert_string(self.strstart);
                        self.match_length -= 1;
                    }
                    self.strstart += 1;
                } else {
                    self.strstart += self.match_length;
                    self.match_length = 0;
                }
            } else {
                self.tally_literal(self.window[self.strstart]);
                self.lookahead -= 1;
                self.strstart += 1;
            }
        }

        self.insert = self.strstart.min(MIN_MATCH - 1);
        Parse::Drained
    }

    fn parse_slow(
        &mut self,
        buf: &mut StreamBuffers<'_, '_>,
        check: &mut RunningCheck,
        flush: FlushMode,
    ) -> Parse {
        loop {
            if self.block_is_full() {
                return Parse::BlockFull;
            }
            if self.lookahead < MIN_LOOKAHEAD {
                self.fill_window(buf, check);
                if self.lookahead < MIN_LOOKAHEAD && flush == FlushMode::None {
                    return Parse::NeedInput;
                }
                if self.lookahead == 0 {
                    break;
                }
            }

            let mut hash_head = NIL;
            if self.lookahead >= MIN_MATCH {
                hash_head = self.insert_string(self.strstart);
            }

            self.prev_length = self.match_length;
            self.prev_match = self.match_start;
            self.match_length = MIN_MATCH - 1;

            if hash_head != NIL
                && self.prev_length < self.params.max_lazy
                && self.strstart - usize::from(hash_head) <= self.max_dist()
            {
                self.match_length = self.longest_match(usize::from(hash_head));
                if self.match_length <= 5
                    && (self.strategy == Strategy::Filtered
                        || (self.match_length == MIN_MATCH
                            && self.strstart - self.match_start > TOO_FAR))
                {
                    self.match_length = MIN_MATCH - 1;
                }
            }

            if self.prev_length >= MIN_MATCH && self.match_length <= self.prev_length {
                let max_insert = self.strstart + self.lookahead - MIN_MATCH;
                self.tally_match(self.strstart - 1 - self.prev_match, self.prev_length);

                // The match started at strstart - 1, which is already hashed
                self.lookahead -= self.prev_length - 1;
                let mut remaining = self.prev_length - 2;
                while remaining > 0 {
                    self.strstart += 1;
                    if self.strstart <= max_insert {
                        self.insert_string(self.strstart);
                    }
                    remaining -= 1;
                }
                self.match_available = false;
                self.match_length = MIN_MATCH - 1;
                self.strstart += 1;
            } else if self.match_available {
                self.tally_literal(self.window[self.strstart - 1]);
                self.strstart += 1;
                self.lookahead -= 1;
            } else {
                self.match_available = true;
                self.strstart += 1;
                self.lookahead -= 1;
            }
        }

        if self.match_available {
            self.tally_literal(self.window[self.strstart - 1]);
            self.match_available = false;
        }
        self.match_length = MIN_MATCH - 1;
        self.insert = self.strstart.min(MIN_MATCH - 1);
        Parse::Drained
    }

    fn parse_rle(
        &mut self,
        buf: &mut StreamBuffers<'_, '_>,
        check: &mut RunningCheck,
        flush: FlushMode,
    ) -> Parse {
        loop {
            if self.block_is_full() {
                return Parse::BlockFull;
            }
            if self.lookahead <= MAX_MATCH {
                self.fill_window(buf, check);
                if self.lookahead <= MAX_MATCH && flush == FlushMode::None {
                    return Parse::NeedInput;
                }
                if self.lookahead == 0 {
                    break;
                }
            }

            let mut run = 0;
            if self.lookahead >= MIN_MATCH && self.strstart > 0 {
                let previous = self.window[self.strstart - 1];
                let max_len = MAX_MATCH.min(self.lookahead);
                run = self.window[self.strstart..self.strstart + max_len]
                    .iter()
                    .take_while(|&&b| b == previous)
                    .count();
            }

            if run >= MIN_MATCH {
                self.tally_match(1, run);
                self.lookahead -= run;
                self.strstart += run;
            } else {
                self.tally_literal(self.window[self.strstart]);
                self.lookahead -= 1;
                self.strstart += 1;
            }
        }

        self.insert = 0;
        Parse::Drained
    }

    fn parse_huffman(
        &mut self,
        buf: &mut StreamBuffers<'_, '_>,
        check: &mut RunningCheck,
        flush: FlushMode,
    ) -> Parse {
        loop {
            if self.block_is_full() {
                return Parse::BlockFull;
            }
            if self.lookahead == 0 {
                self.fill_window(buf, check);
                if self.lookahead == 0 {
                    if flush == FlushMode::None {
                        return Parse::NeedInput;
                    }
                    break;
                }
            }
            self.tally_literal(self.window[self.strstart]);
            self.lookahead -= 1;
            self.strstart += 1;
        }

        self.insert = 0;
        Parse::Drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(level: u8, strategy: Strategy) -> Lz77Matcher {
        Lz77Matcher::new(15, 8, MatchParams::for_level(level, strategy), strategy)
            .expect("matcher allocation")
    }

    /// Parse everything with a final flush, collecting every block's tokens.
    fn parse_all(matcher: &mut Lz77Matcher, input: &[u8]) -> Vec<Lz77Token> {
        let mut sink = [0u8; 0];
        let mut buf = StreamBuffers::new(input, &mut sink);
        let mut check = RunningCheck::None;
        let mut tokens = Vec::new();
        loop {
            let outcome = matcher.parse(&mut buf, &mut check, FlushMode::Finish);
            tokens.extend_from_slice(matcher.block().tokens);
            matcher.finish_block();
            if outcome == Parse::Drained {
                return tokens;
            }
        }
    }

    fn expand(history: &[u8], tokens: &[Lz77Token]) -> Vec<u8> {
        let mut output = history.to_vec();
        for token in tokens {
            match *token {
                Lz77Token::Literal(b) => output.push(b),
                Lz77Token::Match { length, distance } => {
                    for _ in 0..length {
                        let pos = output.len() - usize::from(distance);
                        output.push(output[pos]);
                    }
                }
            }
        }
        output.split_off(history.len())
    }

    fn sample_text(len: usize) -> Vec<u8> {
        b"The quick brown fox jumps over the lazy dog. "
            .iter()
            .cycle()
            .take(len)
            .copied()
            .collect()
    }

    #[test]
    fn test_literals_only() {
        let mut m = matcher(6, Strategy::Default);
        let tokens = parse_all(&mut m, b"abcdefgh");

        assert!(tokens.iter().all(|t| matches!(t, Lz77Token::Literal(_))));
        assert_eq!(tokens.len(), 8);
    }

    #[test]
    fn test_decode_matches() {
        for level in 1..=9 {
            let input = b"Hello, Hello, Hello! hello, hello!";
            let mut m = matcher(level, Strategy::Default);
            let tokens = parse_all(&mut m, input);

            assert!(tokens.iter().any(|t| matches!(t, Lz77Token::Match { .. })));
            assert_eq!(expand(&[], &tokens), input, "level {level}");
        }
    }

    #[test]
    fn test_repeated_char() {
        let mut m = matcher(6, Strategy::Default);
        let tokens = parse_all(&mut m, &[b'a'; 10]);

        assert_eq!(expand(&[], &tokens), vec![b'a'; 10]);
        assert!(tokens.len() < 10, "Should compress repeated chars");
    }

    #[test]
    fn test_large_input_slides_window() {
        let mut data = sample_text(150_000);
        for (i, byte) in data.iter_mut().enumerate().step_by(97) {
            *byte = (i % 251) as u8;
        }
        for level in [1, 4, 9] {
            let mut m = matcher(level, Strategy::Default);
            let tokens = parse_all(&mut m, &data);
            assert_eq!(expand(&[], &tokens), data, "level {level}");
            assert!(tokens.len() < data.len() / 4);
        }
    }

    #[test]
    fn test_incremental_input_matches_one_shot() {
        let data = sample_text(5000);
        let mut m = matcher(6, Strategy::Default);
        let mut check = RunningCheck::None;
        let mut sink = [0u8; 0];
        let mut tokens = Vec::new();

        for chunk in data.chunks(7) {
            let mut buf = StreamBuffers::new(chunk, &mut sink);
            assert_eq!(
                m.parse(&mut buf, &mut check, FlushMode::None),
                Parse::NeedInput
            );
            assert_eq!(buf.avail_in(), 0);
        }
        let mut buf = StreamBuffers::new(&[], &mut sink);
        assert_eq!(
            m.parse(&mut buf, &mut check, FlushMode::Finish),
            Parse::Drained
        );
        tokens.extend_from_slice(m.block().tokens);

        assert_eq!(expand(&[], &tokens), data);
    }

    #[test]
    fn test_stored_parser_covers_block() {
        let data = sample_text(1000);
        let mut m = matcher(0, Strategy::Default);
        let mut check = RunningCheck::None;
        let mut sink = [0u8; 0];
        let mut buf = StreamBuffers::new(&data, &mut sink);

        assert_eq!(
            m.parse(&mut buf, &mut check, FlushMode::Finish),
            Parse::Drained
        );
        let block = m.block();
        assert!(block.tokens.is_empty());
        assert_eq!(block.stored, Some(&data[..]));
    }

    #[test]
    fn test_stored_parser_splits_large_input() {
        let data = sample_text(100_000);
        let mut m = matcher(0, Strategy::Default);
        let mut check = RunningCheck::None;
        let mut sink = [0u8; 0];
        let mut buf = StreamBuffers::new(&data, &mut sink);
        let mut recovered = Vec::new();

        loop {
            let outcome = m.parse(&mut buf, &mut check, FlushMode::Finish);
            let stored = m.block().stored.expect("stored block stays in window");
            assert!(stored.len() <= m.max_dist());
            recovered.extend_from_slice(stored);
            m.finish_block();
            if outcome == Parse::Drained {
                break;
            }
        }
        assert_eq!(recovered, data);
    }

    #[test]
    fn test_rle_uses_distance_one() {
        let mut data = vec![b'x'; 300];
        data.extend_from_slice(b"abcabcabc");
        data.extend(std::iter::repeat_n(b'y', 50));

        let mut m = matcher(6, Strategy::Rle);
        let tokens = parse_all(&mut m, &data);

        assert!(tokens.iter().all(|t| match t {
            Lz77Token::Match { distance, .. } => *distance == 1,
            Lz77Token::Literal(_) => true,
        }));
        assert_eq!(expand(&[], &tokens), data);
    }

    #[test]
    fn test_huffman_only_literals() {
        let data = sample_text(600);
        let mut m = matcher(9, Strategy::HuffmanOnly);
        let tokens = parse_all(&mut m, &data);

        assert_eq!(tokens.len(), data.len());
        assert!(tokens.iter().all(|t| matches!(t, Lz77Token::Literal(_))));
    }

    #[test]
    fn test_filtered_drops_short_matches() {
        let data = b"abcXabcYabcZabcWabcVabcU".repeat(4);
        let mut m = matcher(6, Strategy::Filtered);
        let tokens = parse_all(&mut m, &data);

        assert!(tokens.iter().all(|t| match t {
            Lz77Token::Match { length, .. } => *length > 5,
            Lz77Token::Literal(_) => true,
        }));
        assert_eq!(expand(&[], &tokens), data);
    }

    #[test]
    fn test_block_full_at_token_limit() {
        // Memory level 1 limits a block to 127 tokens
        let params = MatchParams::for_level(6, Strategy::HuffmanOnly);
        let mut m = Lz77Matcher::new(15, 1, params, Strategy::HuffmanOnly).expect("matcher");
        let data = sample_text(300);
        let mut check = RunningCheck::None;
        let mut sink = [0u8; 0];
        let mut buf = StreamBuffers::new(&data, &mut sink);

        assert_eq!(
            m.parse(&mut buf, &mut check, FlushMode::Finish),
            Parse::BlockFull
        );
        assert_eq!(m.block().tokens.len(), 127);
        assert_eq!(m.block().stored, Some(&data[..127]));
        m.finish_block();
        assert_eq!(
            m.parse(&mut buf, &mut check, FlushMode::Finish),
            Parse::BlockFull
        );
        assert_eq!(m.block().stored, Some(&data[127..254]));
    }

    #[test]
    fn test_dictionary_matches() {
        // Position 0 cannot be chained, so the phrase starts at 1
        let dictionary = b" hello world, this is a dictionary";
        let mut m = matcher(6, Strategy::Default);
        m.set_dictionary(dictionary);
        let input = b"hello world, this is data";
        let tokens = parse_all(&mut m, input);

        assert!(matches!(tokens[0], Lz77Token::Match { .. }));
        assert_eq!(expand(dictionary, &tokens), input);
    }

    #[test]
    fn test_full_flush_reset_forgets_history() {
        let mut m = matcher(6, Strategy::Default);
        let first = parse_all(&mut m, b"repeated phrase");
        assert_eq!(first.len(), 15);
        m.full_flush_reset();

        let tokens = parse_all(&mut m, b"repeated phrase");
        assert!(tokens.iter().all(|t| matches!(t, Lz77Token::Literal(_))));
    }

    #[test]
    fn test_check_sees_all_input() {
        let data = sample_text(70_000);
        let mut m = matcher(1, Strategy::Default);
        let mut check = RunningCheck::for_wrapper(crate::wrapper::WrapperType::Zlib);
        let mut sink = [0u8; 0];
        let mut buf = StreamBuffers::new(&data, &mut sink);
        while m.parse(&mut buf, &mut check, FlushMode::Finish) != Parse::Drained {
            m.finish_block();
        }
        assert_eq!(check.value(), oxiflate_core::Adler32::checksum(&data));
    }
}
