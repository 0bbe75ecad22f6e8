//! DEFLATE compression.
//!
//! This module implements the streaming compressor for RFC 1951 with
//! optional zlib or gzip framing. It supports:
//! - Stored blocks (no compression)
//! - Fixed Huffman codes
//! - Dynamic Huffman codes
//!
//! Each block is encoded in whichever form costs the fewest bits. Completed
//! blocks are packed into an internal pending buffer and handed to the
//! caller's output as space allows, so any call may stop when the output
//! fills and pick up where it left off.

use crate::gzip::{self, GzipHeader};
use crate::huffman::{
    CODELEN_ALPHABET_SIZE, DISTANCE_ALPHABET_SIZE, END_OF_BLOCK, HuffmanBuilder, HuffmanCode,
    LITLEN_ALPHABET_SIZE, MAX_CODE_LENGTH, MAX_CODELEN_LENGTH, canonical_codes,
};
use crate::lz77::{Block, Lz77Matcher, Lz77Token, MatchParams, Parse, Parser};
use crate::tables::{
    CODE_LENGTH_ORDER, DISTANCE_EXTRA_BITS, FIXED_DISTANCE_LENGTHS, FIXED_LITLEN_LENGTHS,
    LENGTH_EXTRA_BITS, MAX_STORED_BLOCK, distance_to_code, fixed_distance_codes,
    fixed_litlen_codes, length_to_code,
};
use crate::wrapper::{RunningCheck, WrapperType};
use crate::zlib::{self, ZlibLevel};
use log::{debug, trace};
use oxiflate_core::adler::Adler32;
use oxiflate_core::buffers::StreamBuffers;
use oxiflate_core::error::{OxiFlateError, Result};
use oxiflate_core::traits::{CompressionLevel, Compressor, FlushMode, ReturnCode};
use oxiflate_core::BitWriter;

/// Compression strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strategy {
    /// Normal LZ77 + Huffman.
    #[default]
    Default,
    /// Drop short matches; suits filtered (e.g. delta-coded) data.
    Filtered,
    /// Literals only.
    HuffmanOnly,
    /// Distance-1 matches only.
    Rle,
    /// Never emit dynamic Huffman blocks.
    Fixed,
}

/// Settings for a compression session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeflateConfig {
    /// Compression level (0-9).
    pub level: CompressionLevel,
    /// log2 of the history window (8-15); 8 is raised to 9.
    pub window_bits: u8,
    /// Memory level (1-9).
    pub mem_level: u8,
    /// Compression strategy.
    pub strategy: Strategy,
    /// Output framing; [`WrapperType::Any`] is not valid for compression.
    pub wrapper: WrapperType,
    /// Preset dictionary installed at init.
    pub dictionary: Option<Vec<u8>>,
}

impl Default for DeflateConfig {
    fn default() -> Self {
        Self {
            level: CompressionLevel::DEFAULT,
            window_bits: 15,
            mem_level: 8,
            strategy: Strategy::Default,
            wrapper: WrapperType::Zlib,
            dictionary: None,
        }
    }
}

impl DeflateConfig {
    /// Default settings: level 6, 32 KiB window, zlib framing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the compression level.
    pub fn with_level(mut self, level: impl Into<CompressionLevel>) -> Self {
        self.level = level.into();
        self
    }

    /// Set the window size (log2).
    pub fn with_window_bits(mut self, window_bits: u8) -> Self {
        self.window_bits = window_bits;
        self
    }

    /// Set wrapper and window size from a zlib-style `windowBits` value.
    pub fn with_zlib_window_bits(mut self, window_bits: i32) -> Result<Self> {
        let (wrapper, bits) = WrapperType::from_window_bits(window_bits)?;
        self.wrapper = wrapper;
        self.window_bits = bits;
        Ok(self)
    }

    /// Set the memory level.
    pub fn with_mem_level(mut self, mem_level: u8) -> Self {
        self.mem_level = mem_level;
        self
    }

    /// Set the strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the framing.
    pub fn with_wrapper(mut self, wrapper: WrapperType) -> Self {
        self.wrapper = wrapper;
        self
    }

    /// Install a preset dictionary at init.
    pub fn with_dictionary(mut self, dictionary: impl Into<Vec<u8>>) -> Self {
        self.dictionary = Some(dictionary.into());
        self
    }

    /// Reject out-of-range settings.
    pub fn validate(&self) -> Result<()> {
        if !(8..=15).contains(&self.window_bits) {
            return Err(OxiFlateError::invalid_parameter(format!(
                "window bits {} outside 8-15",
                self.window_bits
            )));
        }
        if !(1..=9).contains(&self.mem_level) {
            return Err(OxiFlateError::invalid_parameter(format!(
                "memory level {} outside 1-9",
                self.mem_level
            )));
        }
        match (self.wrapper, &self.dictionary) {
            (WrapperType::Any, _) => Err(OxiFlateError::invalid_parameter(
                "auto-detect framing is only valid for decompression",
            )),
            (WrapperType::Gzip, Some(_)) => Err(OxiFlateError::invalid_parameter(
                "gzip streams cannot carry a preset dictionary",
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    /// Header not yet written.
    Init,
    /// Accepting input.
    Busy,
    /// Final block written.
    Finish,
}

/// DEFLATE compressor.
#[derive(Debug)]
pub struct Deflater {
    level: u8,
    strategy: Strategy,
    wrapper: WrapperType,
    window_bits: u8,
    matcher: Lz77Matcher,
    writer: BitWriter,
    check: RunningCheck,
    status: Status,
    trailer_written: bool,
    last_flush: Option<FlushMode>,
    pending_params: Option<(u8, Strategy)>,
    gzip_header: Option<GzipHeader>,
    dictionary: Option<Vec<u8>>,
    dict_id: Option<u32>,
    total_in: u64,
    total_out: u64,
}

impl Deflater {
    /// Create a compressor.
    pub fn new(config: DeflateConfig) -> Result<Self> {
        config.validate()?;
        let level = config.level.level();
        // A 256-byte window cannot hold the minimum lookahead
        let window_bits = config.window_bits.max(9);
        let matcher = Lz77Matcher::new(
            window_bits,
            config.mem_level,
            MatchParams::for_level(level, config.strategy),
            config.strategy,
        )?;

        let mut deflater = Self {
            level,
            strategy: config.strategy,
            wrapper: config.wrapper,
            window_bits,
            matcher,
            writer: BitWriter::with_capacity(1 << (config.mem_level + 8)),
            check: RunningCheck::for_wrapper(config.wrapper),
            status: Status::Init,
            trailer_written: false,
            last_flush: None,
            pending_params: None,
            gzip_header: None,
            dictionary: config.dictionary,
            dict_id: None,
            total_in: 0,
            total_out: 0,
        };
        deflater.install_preset()?;

        debug!(
            "deflate init: level={} window_bits={} mem_level={} strategy={:?} wrapper={:?}",
            level, window_bits, config.mem_level, config.strategy, config.wrapper
        );
        Ok(deflater)
    }

    fn install_preset(&mut self) -> Result<()> {
        if let Some(dictionary) = self.dictionary.take() {
            let result = self.set_dictionary(&dictionary);
            self.dictionary = Some(dictionary);
            result?;
        }
        Ok(())
    }

    /// Total input bytes consumed.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Total output bytes produced.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Framing of this session.
    pub fn wrapper(&self) -> WrapperType {
        self.wrapper
    }

    /// Running checksum of the input, or the dictionary id before the
    /// header is written.
    pub fn adler(&self) -> u32 {
        match (self.status, self.dict_id) {
            (Status::Init, Some(id)) => id,
            _ => self.check.value(),
        }
    }

    /// Install a preset dictionary.
    ///
    /// Only valid before the first call to [`deflate`](Self::deflate) and
    /// never for gzip.
    ///
    /// # Returns
    ///
    /// The dictionary id (Adler-32 of the dictionary).
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<u32> {
        if self.wrapper == WrapperType::Gzip {
            return Err(OxiFlateError::invalid_state(
                "gzip streams cannot carry a preset dictionary",
            ));
        }
        if self.status != Status::Init {
            return Err(OxiFlateError::invalid_state(
                "dictionary must be set before compression starts",
            ));
        }
        let id = Adler32::checksum(dictionary);
        self.matcher.set_dictionary(dictionary);
        if self.wrapper == WrapperType::Zlib {
            self.dict_id = Some(id);
        }
        debug!("deflate dictionary installed: {} bytes, id={id:#010x}", dictionary.len());
        Ok(id)
    }

    /// Supply the gzip header to write (gzip only, before the first call).
    pub fn set_gzip_header(&mut self, header: GzipHeader) -> Result<()> {
        if self.wrapper != WrapperType::Gzip || self.status != Status::Init {
            return Err(OxiFlateError::invalid_state(
                "gzip header must be set on a gzip stream before compression starts",
            ));
        }
        self.gzip_header = Some(header);
        Ok(())
    }

    /// Change level and strategy.
    ///
    /// When the switch changes the parser after input has been accepted,
    /// the pending block is closed with the old settings at the start of the
    /// next call.
    pub fn set_params(&mut self, level: CompressionLevel, strategy: Strategy) {
        let level = level.level();
        let params = MatchParams::for_level(level, strategy);
        let switches = params.parser != self.matcher.parser() || strategy != self.strategy;
        if switches && self.total_in > 0 {
            self.pending_params = Some((level, strategy));
        } else {
            self.pending_params = None;
            self.apply_params(level, strategy);
        }
    }

    fn apply_params(&mut self, level: u8, strategy: Strategy) {
        self.level = level;
        self.strategy = strategy;
        self.matcher
            .set_params(MatchParams::for_level(level, strategy), strategy);
        debug!("deflate params: level={level} strategy={strategy:?}");
    }

    /// Upper bound on the compressed size of `source_len` bytes.
    pub fn bound(&self, source_len: usize) -> usize {
        let wrap = match self.wrapper {
            WrapperType::Raw | WrapperType::Any => 0,
            WrapperType::Zlib => {
                self.wrapper.overhead() + if self.dict_id.is_some() { 4 } else { 0 }
            }
            WrapperType::Gzip => {
                8 + self
                    .gzip_header
                    .as_ref()
                    .map_or(10, GzipHeader::encoded_len)
            }
        };
        conservative_bound(source_len) + wrap
    }

    /// Back to the initial state, keeping level, strategy and framing.
    pub fn reset(&mut self) {
        if let Some((level, strategy)) = self.pending_params.take() {
            self.apply_params(level, strategy);
        }
        self.matcher.reset();
        self.writer.clear();
        self.check.reset();
        self.status = Status::Init;
        self.trailer_written = false;
        self.last_flush = None;
        self.dict_id = None;
        self.total_in = 0;
        self.total_out = 0;
        // A stored preset dictionary is valid for every stream it starts
        if let Err(err) = self.install_preset() {
            debug!("deflate preset dictionary not reinstalled: {err}");
        }
        debug!("deflate reset");
    }

    /// Compress as much as the buffers allow.
    ///
    /// # Returns
    ///
    /// - [`ReturnCode::Ok`]: progress was made; call again
    /// - [`ReturnCode::StreamEnd`]: the trailer is written and drained
    /// - [`ReturnCode::BufError`]: no progress was possible
    pub fn deflate(
        &mut self,
        buf: &mut StreamBuffers<'_, '_>,
        flush: FlushMode,
    ) -> Result<ReturnCode> {
        if self.status == Status::Finish && flush != FlushMode::Finish {
            return Err(OxiFlateError::invalid_state(
                "only Finish is allowed once the stream is finishing",
            ));
        }
        if buf.avail_out() == 0 {
            return Ok(ReturnCode::BufError);
        }

        let old_flush = self.last_flush.replace(flush);

        if self.writer.has_pending() {
            self.drain(buf);
            if buf.avail_out() == 0 {
                self.last_flush = None;
                return Ok(ReturnCode::Ok);
            }
        } else if buf.avail_in() == 0
            && old_flush.is_some_and(|old| flush.rank() <= old.rank())
            && flush != FlushMode::Finish
        {
            return Ok(ReturnCode::BufError);
        }

        if self.status == Status::Finish && buf.avail_in() != 0 {
            return Ok(ReturnCode::BufError);
        }

        if self.status == Status::Init {
            self.write_header();
            self.status = Status::Busy;
            self.drain(buf);
            if self.writer.has_pending() {
                self.last_flush = None;
                return Ok(ReturnCode::Ok);
            }
        }

        if let Some((level, strategy)) = self.pending_params.take() {
            self.close_block_for_params();
            self.apply_params(level, strategy);
        }

        if buf.avail_in() != 0
            || self.matcher.lookahead() != 0
            || (flush != FlushMode::None && self.status != Status::Finish)
        {
            loop {
                match self.parse(buf, flush) {
                    Parse::NeedInput => {
                        self.drain(buf);
                        if buf.avail_out() == 0 {
                            self.last_flush = None;
                        }
                        return Ok(ReturnCode::Ok);
                    }
                    Parse::BlockFull => {
                        self.flush_block(false);
                        self.drain(buf);
                        if buf.avail_out() == 0 {
                            self.last_flush = None;
                            return Ok(ReturnCode::Ok);
                        }
                    }
                    Parse::Drained if flush == FlushMode::Finish => {
                        self.flush_block(true);
                        self.status = Status::Finish;
                        self.drain(buf);
                        if buf.avail_out() == 0 {
                            self.last_flush = None;
                            return Ok(ReturnCode::Ok);
                        }
                        break;
                    }
                    Parse::Drained => {
                        if self.matcher.block().has_data() {
                            self.flush_block(false);
                        }
                        self.write_sync_marker();
                        if flush == FlushMode::Full {
                            self.matcher.full_flush_reset();
                        }
                        self.drain(buf);
                        if buf.avail_out() == 0 {
                            self.last_flush = None;
                            return Ok(ReturnCode::Ok);
                        }
                        break;
                    }
                }
            }
        }

        if flush != FlushMode::Finish {
            return Ok(ReturnCode::Ok);
        }
        if self.trailer_written {
            return Ok(ReturnCode::StreamEnd);
        }

        match self.wrapper {
            WrapperType::Zlib => self
                .writer
                .write_bytes(&zlib::trailer_bytes(self.check.value())),
            WrapperType::Gzip => self.writer.write_bytes(&gzip::trailer_bytes(
                self.check.value(),
                self.total_in as u32,
            )),
            WrapperType::Raw | WrapperType::Any => {}
        }
        self.trailer_written = true;
        self.drain(buf);
        Ok(if self.writer.has_pending() {
            ReturnCode::Ok
        } else {
            ReturnCode::StreamEnd
        })
    }

    fn parse(&mut self, buf: &mut StreamBuffers<'_, '_>, flush: FlushMode) -> Parse {
        let before = buf.consumed();
        let outcome = self.matcher.parse(buf, &mut self.check, flush);
        self.total_in += (buf.consumed() - before) as u64;
        outcome
    }

    fn drain(&mut self, buf: &mut StreamBuffers<'_, '_>) {
        self.total_out += self.writer.drain_into(buf) as u64;
    }

    fn write_header(&mut self) {
        match self.wrapper {
            WrapperType::Zlib => {
                let level = ZlibLevel::from_settings(self.level, self.strategy);
                let header = zlib::header_bytes(self.window_bits, level, self.dict_id);
                self.writer.write_bytes(&header);
            }
            WrapperType::Gzip => {
                let header = self.gzip_header.clone().unwrap_or_default();
                let xfl = gzip::extra_flags_for(self.level, self.strategy);
                self.writer.write_bytes(&header.to_bytes(xfl));
            }
            WrapperType::Raw | WrapperType::Any => {}
        }
    }

    /// Emit everything buffered under the old parameters as a non-final
    /// block, without a sync marker.
    fn close_block_for_params(&mut self) {
        let mut sink = [0u8; 0];
        let mut empty = StreamBuffers::new(&[], &mut sink);
        loop {
            let outcome = self.matcher.parse(&mut empty, &mut self.check, FlushMode::Sync);
            if outcome == Parse::BlockFull || self.matcher.block().has_data() {
                self.flush_block(false);
            }
            if outcome != Parse::BlockFull {
                break;
            }
        }
    }

    /// Empty stored block: the `00 00 FF FF` sync point.
    fn write_sync_marker(&mut self) {
        self.writer.write_bits(0, 3);
        self.writer.align_to_byte();
        self.writer.write_bytes(&[0x00, 0x00, 0xFF, 0xFF]);
    }

    fn flush_block(&mut self, last: bool) {
        let parser = self.matcher.parser();
        write_block(
            &mut self.writer,
            self.matcher.block(),
            last,
            parser,
            self.strategy,
        );
        self.matcher.finish_block();
    }
}

/// Upper bound on raw DEFLATE output for any level and memory setting.
pub(crate) fn conservative_bound(source_len: usize) -> usize {
    source_len + ((source_len + 7) >> 3) + ((source_len + 63) >> 6) + 5
}

/// Symbol frequencies of a block, including one end-of-block.
fn count_frequencies(
    tokens: &[Lz77Token],
) -> ([u32; LITLEN_ALPHABET_SIZE], [u32; DISTANCE_ALPHABET_SIZE]) {
    let mut litlen_freq = [0u32; LITLEN_ALPHABET_SIZE];
    let mut dist_freq = [0u32; DISTANCE_ALPHABET_SIZE];

    for token in tokens {
        match *token {
            Lz77Token::Literal(byte) => litlen_freq[usize::from(byte)] += 1,
            Lz77Token::Match { length, distance } => {
                let (len_code, _, _) = length_to_code(usize::from(length));
                litlen_freq[usize::from(len_code)] += 1;
                let (dist_code, _, _) = distance_to_code(usize::from(distance));
                dist_freq[usize::from(dist_code)] += 1;
            }
        }
    }
    litlen_freq[usize::from(END_OF_BLOCK)] += 1;

    (litlen_freq, dist_freq)
}

/// Bits needed for the block body under the given code lengths.
fn body_bits(
    litlen_freq: &[u32],
    dist_freq: &[u32],
    litlen_lengths: &[u8],
    dist_lengths: &[u8],
) -> u64 {
    let litlen: u64 = litlen_freq
        .iter()
        .enumerate()
        .map(|(sym, &freq)| {
            let extra = sym
                .checked_sub(257)
                .map_or(0, |i| u64::from(LENGTH_EXTRA_BITS[i]));
            u64::from(freq) * (u64::from(litlen_lengths[sym]) + extra)
        })
        .sum();
    let dist: u64 = dist_freq
        .iter()
        .enumerate()
        .map(|(sym, &freq)| {
            u64::from(freq) * (u64::from(dist_lengths[sym]) + u64::from(DISTANCE_EXTRA_BITS[sym]))
        })
        .sum();
    litlen + dist
}

/// The serialized code lengths of a dynamic block.
#[derive(Debug)]
struct DynamicHeader {
    /// Number of literal/length lengths sent (257-286).
    hlit: usize,
    /// Number of distance lengths sent (1-30).
    hdist: usize,
    /// Number of code length code lengths sent (4-19).
    hclen: usize,
    /// Run-length coded lengths: (symbol, extra bit value).
    symbols: Vec<(u8, u8)>,
    codelen_lengths: Vec<u8>,
}

impl DynamicHeader {
    fn new(litlen_lengths: &[u8], dist_lengths: &[u8]) -> Self {
        let hlit = last_used(litlen_lengths).max(257);
        let hdist = last_used(dist_lengths).max(1);

        let mut combined = Vec::with_capacity(hlit + hdist);
        combined.extend_from_slice(&litlen_lengths[..hlit]);
        combined.extend_from_slice(&dist_lengths[..hdist]);
        let symbols = rle_encode_lengths(&combined);

        let mut builder = HuffmanBuilder::new(CODELEN_ALPHABET_SIZE, MAX_CODELEN_LENGTH);
        for &(sym, _) in &symbols {
            builder.add(u16::from(sym));
        }
        let codelen_lengths = builder.build_lengths();

        let hclen = CODE_LENGTH_ORDER
            .iter()
            .rposition(|&sym| codelen_lengths[sym] != 0)
            .map_or(4, |i| (i + 1).max(4));

        Self {
            hlit,
            hdist,
            hclen,
            symbols,
            codelen_lengths,
        }
    }

    fn bits(&self) -> u64 {
        let symbols: u64 = self
            .symbols
            .iter()
            .map(|&(sym, _)| {
                u64::from(self.codelen_lengths[usize::from(sym)] + repeat_extra_bits(sym))
            })
            .sum();
        14 + 3 * self.hclen as u64 + symbols
    }

    fn write(&self, writer: &mut BitWriter) {
        writer.write_bits((self.hlit - 257) as u32, 5);
        writer.write_bits((self.hdist - 1) as u32, 5);
        writer.write_bits((self.hclen - 4) as u32, 4);
        for &sym in &CODE_LENGTH_ORDER[..self.hclen] {
            writer.write_bits(u32::from(self.codelen_lengths[sym]), 3);
        }

        let codes = canonical_codes(&self.codelen_lengths);
        for &(sym, extra) in &self.symbols {
            let code = codes[usize::from(sym)];
            writer.write_bits(u32::from(code.code), code.length);
            writer.write_bits(u32::from(extra), repeat_extra_bits(sym));
        }
    }
}

/// Number of leading entries up to the last nonzero length.
fn last_used(lengths: &[u8]) -> usize {
    lengths.iter().rposition(|&l| l != 0).map_or(0, |i| i + 1)
}

fn repeat_extra_bits(sym: u8) -> u8 {
    match sym {
        16 => 2,
        17 => 3,
        18 => 7,
        _ => 0,
    }
}

/// Run-length encode a code length sequence with symbols 16, 17 and 18.
///
/// Returns (symbol, extra bit value) pairs.
fn rle_encode_lengths(lengths: &[u8]) -> Vec<(u8, u8)> {
    let mut symbols = Vec::new();
    let mut i = 0;

    while i < lengths.len() {
        let len = lengths[i];
        let run = lengths[i..].iter().take_while(|&&l| l == len).count();
        let mut remaining = run;

        if len == 0 {
            while remaining >= 11 {
                let count = remaining.min(138);
                symbols.push((18, (count - 11) as u8));
                remaining -= count;
            }
            if remaining >= 3 {
                symbols.push((17, (remaining - 3) as u8));
                remaining = 0;
            }
        } else {
            // The first occurrence is sent as itself, repeats with 16
            symbols.push((len, 0));
            remaining -= 1;
            while remaining >= 3 {
                let count = remaining.min(6);
                symbols.push((16, (count - 3) as u8));
                remaining -= count;
            }
        }
        symbols.extend(std::iter::repeat_n((len, 0), remaining));
        i += run;
    }

    symbols
}

fn write_tokens(
    writer: &mut BitWriter,
    tokens: &[Lz77Token],
    litlen: &[HuffmanCode],
    dist: &[HuffmanCode],
) {
    for token in tokens {
        match *token {
            Lz77Token::Literal(byte) => {
                let code = litlen[usize::from(byte)];
                writer.write_bits(u32::from(code.code), code.length);
            }
            Lz77Token::Match { length, distance } => {
                let (len_code, len_extra_bits, len_extra) = length_to_code(usize::from(length));
                let code = litlen[usize::from(len_code)];
                writer.write_bits(u32::from(code.code), code.length);
                writer.write_bits(u32::from(len_extra), len_extra_bits);

                let (dist_code, dist_extra_bits, dist_extra) =
                    distance_to_code(usize::from(distance));
                let code = dist[usize::from(dist_code)];
                writer.write_bits(u32::from(code.code), code.length);
                writer.write_bits(u32::from(dist_extra), dist_extra_bits);
            }
        }
    }
    let eob = litlen[usize::from(END_OF_BLOCK)];
    writer.write_bits(u32::from(eob.code), eob.length);
}

/// Write `data` as one or more stored blocks.
fn write_stored(writer: &mut BitWriter, data: &[u8], last: bool) {
    let chunk_count = data.len().div_ceil(MAX_STORED_BLOCK).max(1);
    let mut chunks = data.chunks(MAX_STORED_BLOCK);
    for index in 0..chunk_count {
        let chunk = chunks.next().unwrap_or_default();
        let is_last = last && index + 1 == chunk_count;
        writer.write_bit(is_last);
        writer.write_bits(0b00, 2); // BTYPE=00 (stored)
        writer.align_to_byte();
        let len = chunk.len() as u16;
        writer.write_bytes(&len.to_le_bytes());
        writer.write_bytes(&(!len).to_le_bytes());
        writer.write_bytes(chunk);
    }
}

/// Encode one block in its cheapest form.
fn write_block(
    writer: &mut BitWriter,
    block: Block<'_>,
    last: bool,
    parser: Parser,
    strategy: Strategy,
) {
    if parser == Parser::Stored {
        if let Some(data) = block.stored {
            trace!("deflate block: stored last={last} bytes={}", data.len());
            write_stored(writer, data, last);
            if last {
                writer.align_to_byte();
            }
            return;
        }
    }

    let (litlen_freq, dist_freq) = count_frequencies(block.tokens);
    let litlen_lengths = HuffmanBuilder::from_frequencies(&litlen_freq, MAX_CODE_LENGTH as u8)
        .build_lengths();
    let dist_lengths =
        HuffmanBuilder::from_frequencies(&dist_freq, MAX_CODE_LENGTH as u8).build_lengths();
    let header = DynamicHeader::new(&litlen_lengths, &dist_lengths);

    let dynamic_bits =
        3 + header.bits() + body_bits(&litlen_freq, &dist_freq, &litlen_lengths, &dist_lengths);
    let fixed_bits = 3 + body_bits(
        &litlen_freq,
        &dist_freq,
        &FIXED_LITLEN_LENGTHS,
        &FIXED_DISTANCE_LENGTHS,
    );

    let dynamic_bytes = dynamic_bits.div_ceil(8);
    let fixed_bytes = fixed_bits.div_ceil(8);
    let use_fixed = strategy == Strategy::Fixed || fixed_bytes <= dynamic_bytes;
    let best_bytes = if use_fixed { fixed_bytes } else { dynamic_bytes };

    match block.stored {
        Some(data) if data.len() as u64 + 4 <= best_bytes => {
            trace!("deflate block: stored last={last} bytes={}", data.len());
            write_stored(writer, data, last);
        }
        _ if use_fixed => {
            trace!(
                "deflate block: fixed last={last} tokens={} bits={fixed_bits}",
                block.tokens.len()
            );
            writer.write_bit(last);
            writer.write_bits(0b01, 2); // BTYPE=01 (fixed Huffman)
            write_tokens(
                writer,
                block.tokens,
                fixed_litlen_codes(),
                fixed_distance_codes(),
            );
        }
        _ => {
            trace!(
                "deflate block: dynamic last={last} tokens={} bits={dynamic_bits}",
                block.tokens.len()
            );
            writer.write_bit(last);
            writer.write_bits(0b10, 2); // BTYPE=10 (dynamic Huffman)
            header.write(writer);
            write_tokens(
                writer,
                block.tokens,
                &canonical_codes(&litlen_lengths),
                &canonical_codes(&dist_lengths),
            );
        }
    }

    if last {
        writer.align_to_byte();
    }
}

impl Compressor for Deflater {
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, ReturnCode)> {
        let mut buf = StreamBuffers::new(input, output);
        let code = self.deflate(&mut buf, flush)?;
        Ok((buf.consumed(), buf.produced(), code))
    }

    fn reset(&mut self) {
        Deflater::reset(self);
    }

    fn is_finished(&self) -> bool {
        self.trailer_written && !self.writer.has_pending()
    }
}
