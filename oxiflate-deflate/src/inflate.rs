//! DEFLATE decompression (inflate).
//!
//! This module implements the DEFLATE decompression algorithm as specified
//! in RFC 1951, with zlib and gzip framing. It supports all three block
//! types:
//! - Type 0: Stored (uncompressed)
//! - Type 1: Fixed Huffman codes
//! - Type 2: Dynamic Huffman codes
//!
//! The decoder is a resumable state machine: every call decodes as far as
//! its input and output allow and remembers exactly where it stopped, down
//! to half-read header fields and the remainder of a back-reference copy.

use crate::gzip::{GZIP_MAGIC, GzipHeader, GzipHeaderParser};
use crate::huffman::{CODELEN_ALPHABET_SIZE, END_OF_BLOCK, HuffmanTree};
use crate::tables::{
    CODE_LENGTH_ORDER, DISTANCE_EXTRA_BITS, LENGTH_EXTRA_BITS, decode_distance, decode_length,
    fixed_distance_tree, fixed_litlen_tree,
};
use crate::wrapper::{RunningCheck, WrapperType};
use crate::zlib;
use log::{debug, warn};
use oxiflate_core::adler::Adler32;
use oxiflate_core::buffers::StreamBuffers;
use oxiflate_core::error::{OxiFlateError, Result};
use oxiflate_core::traits::{Decompressor, FlushMode, ReturnCode};
use oxiflate_core::{BitReader, SlidingWindow};

/// Settings for a decompression session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InflateConfig {
    /// log2 of the largest window accepted (8-15).
    pub window_bits: u8,
    /// Expected framing.
    pub wrapper: WrapperType,
    /// Dictionary installed up front for raw streams, or when a zlib header
    /// asks for a dictionary with a matching id.
    pub dictionary: Option<Vec<u8>>,
}

impl Default for InflateConfig {
    fn default() -> Self {
        Self {
            window_bits: 15,
            wrapper: WrapperType::Zlib,
            dictionary: None,
        }
    }
}

impl InflateConfig {
    /// Default settings: 32 KiB window, zlib framing.
    pub fn new() -> Self {
        Self::default()
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

    /// Set the expected framing.
    pub fn with_wrapper(mut self, wrapper: WrapperType) -> Self {
        self.wrapper = wrapper;
        self
    }

    /// Provide a preset dictionary.
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
        if self.wrapper == WrapperType::Gzip && self.dictionary.is_some() {
            return Err(OxiFlateError::invalid_parameter(
                "gzip streams cannot use a preset dictionary",
            ));
        }
        Ok(())
    }
}

/// Decoder position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Zlib header, or framing detection.
    Head,
    GzipHeader,
    /// The four DICTID bytes of a zlib header.
    DictId,
    /// Paused until the caller supplies the dictionary.
    Dict,
    BlockHeader,
    StoredLen,
    Stored { remaining: usize },
    TableCounts,
    CodeLengthLens,
    CodeLens,
    /// Next literal/length symbol.
    Len,
    LenExtra { symbol: u16 },
    Dist { length: u16 },
    DistExtra { length: u16, symbol: u16 },
    Copy { length: usize, distance: usize },
    /// Adler-32 or CRC-32 trailer field.
    Check,
    /// Gzip ISIZE trailer field.
    GzipLength,
    /// Searching for a `00 00 FF FF` marker.
    Sync,
    Done,
    Bad,
}

/// Codes of the current compressed block.
#[derive(Debug, Clone)]
enum Codes {
    Fixed,
    Dynamic {
        litlen: HuffmanTree,
        dist: HuffmanTree,
    },
}

/// DEFLATE decompressor.
#[derive(Debug)]
pub struct Inflater {
    window_bits: u8,
    wrapper: WrapperType,
    /// Framing in effect once detection has run.
    active: WrapperType,
    mode: Mode,
    reader: BitReader,
    window: SlidingWindow,
    check: RunningCheck,
    last_block: bool,
    codes: Codes,
    /// Dynamic table progress.
    hlit: usize,
    hdist: usize,
    hclen: usize,
    have: usize,
    codelen_lens: [u8; CODELEN_ALPHABET_SIZE],
    lens: Vec<u8>,
    codelen_tree: Option<HuffmanTree>,
    /// Partially read multi-byte field.
    field: u32,
    field_len: u8,
    gzip: GzipHeaderParser,
    dict_id: Option<u32>,
    dictionary: Option<Vec<u8>>,
    /// Bytes of the sync marker matched so far.
    sync_have: usize,
    failure: Option<OxiFlateError>,
    /// Call offsets already folded into the totals.
    in_mark: usize,
    out_mark: usize,
    total_in: u64,
    total_out: u64,
}

impl Inflater {
    /// Create a decompressor.
    pub fn new(config: InflateConfig) -> Result<Self> {
        config.validate()?;
        let mut inflater = Self {
            window_bits: config.window_bits,
            wrapper: config.wrapper,
            active: config.wrapper,
            mode: Self::initial_mode(config.wrapper),
            reader: BitReader::new(),
            window: SlidingWindow::new(config.window_bits)?,
            check: RunningCheck::for_wrapper(config.wrapper),
            last_block: false,
            codes: Codes::Fixed,
            hlit: 0,
            hdist: 0,
            hclen: 0,
            have: 0,
            codelen_lens: [0; CODELEN_ALPHABET_SIZE],
            lens: vec![0; 320],
            codelen_tree: None,
            field: 0,
            field_len: 0,
            gzip: GzipHeaderParser::new(),
            dict_id: None,
            dictionary: config.dictionary,
            sync_have: 0,
            failure: None,
            in_mark: 0,
            out_mark: 0,
            total_in: 0,
            total_out: 0,
        };
        if inflater.wrapper == WrapperType::Raw {
            inflater.install_raw_dictionary();
        }
        debug!(
            "inflate init: window_bits={} wrapper={:?}",
            config.window_bits, config.wrapper
        );
        Ok(inflater)
    }

    fn initial_mode(wrapper: WrapperType) -> Mode {
        match wrapper {
            WrapperType::Raw => Mode::BlockHeader,
            WrapperType::Gzip => Mode::GzipHeader,
            WrapperType::Zlib | WrapperType::Any => Mode::Head,
        }
    }

    fn install_raw_dictionary(&mut self) {
        if let Some(dictionary) = &self.dictionary {
            self.window.preload_dictionary(dictionary);
        }
    }

    /// Total input bytes consumed.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Total output bytes produced.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Framing requested at construction.
    pub fn wrapper(&self) -> WrapperType {
        self.wrapper
    }

    /// Framing in effect; resolves [`WrapperType::Any`] once the header has
    /// been seen.
    pub fn detected_wrapper(&self) -> WrapperType {
        self.active
    }

    /// The gzip header, once it has been read completely.
    pub fn gzip_header(&self) -> Option<&GzipHeader> {
        self.gzip.is_done().then(|| self.gzip.header())
    }

    /// Running checksum of the output, or the requested dictionary id while
    /// paused for a dictionary.
    pub fn adler(&self) -> u32 {
        match (self.mode, self.dict_id) {
            (Mode::Dict, Some(id)) => id,
            _ => self.check.value(),
        }
    }

    /// Check whether the stream has ended.
    pub fn is_done(&self) -> bool {
        self.mode == Mode::Done
    }

    /// Install a preset dictionary.
    ///
    /// Zlib streams accept it only while paused for a dictionary, and only
    /// if its Adler-32 equals the id in the header. Raw streams accept it
    /// before any output has been produced.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<u32> {
        let id = Adler32::checksum(dictionary);
        match (self.mode, self.dict_id) {
            (Mode::Dict, Some(expected)) => {
                if id != expected {
                    return Err(OxiFlateError::dictionary_mismatch(expected, id));
                }
                self.window.preload_dictionary(dictionary);
                self.mode = Mode::BlockHeader;
                debug!("inflate dictionary accepted: id={id:#010x}");
                Ok(id)
            }
            _ if self.wrapper == WrapperType::Raw && self.total_out == 0 => {
                self.window.clear();
                self.window.preload_dictionary(dictionary);
                debug!("inflate dictionary installed: {} bytes", dictionary.len());
                Ok(id)
            }
            _ => Err(OxiFlateError::invalid_state(
                "no dictionary is expected at this point of the stream",
            )),
        }
    }

    /// Back to the initial state, keeping window size and framing.
    pub fn reset(&mut self) {
        self.active = self.wrapper;
        self.mode = Self::initial_mode(self.wrapper);
        self.reader.clear();
        self.window.clear();
        self.check = RunningCheck::for_wrapper(self.wrapper);
        self.last_block = false;
        self.codes = Codes::Fixed;
        self.codelen_tree = None;
        self.have = 0;
        self.field = 0;
        self.field_len = 0;
        self.gzip = GzipHeaderParser::new();
        self.dict_id = None;
        self.sync_have = 0;
        self.failure = None;
        self.total_in = 0;
        self.total_out = 0;
        if self.wrapper == WrapperType::Raw {
            self.install_raw_dictionary();
        }
        debug!("inflate reset");
    }

    /// Decompress as much as the buffers allow.
    ///
    /// # Returns
    ///
    /// - [`ReturnCode::Ok`]: progress was made; call again
    /// - [`ReturnCode::StreamEnd`]: the trailer was verified
    /// - [`ReturnCode::NeedDict`]: call [`set_dictionary`](Self::set_dictionary)
    /// - [`ReturnCode::BufError`]: no progress, or `Finish` before the end
    ///
    /// Corrupt input is an error; the session then stays failed until
    /// [`sync`](Self::sync) finds a marker or the session is reset.
    pub fn inflate(
        &mut self,
        buf: &mut StreamBuffers<'_, '_>,
        flush: FlushMode,
    ) -> Result<ReturnCode> {
        if matches!(self.mode, Mode::Bad | Mode::Sync) {
            return Err(self.failure.clone().unwrap_or_else(|| {
                OxiFlateError::corrupted(self.total_in, "stream needs resynchronization")
            }));
        }

        let (in_start, out_start) = (buf.consumed(), buf.produced());
        self.in_mark = in_start;
        self.out_mark = out_start;

        let result = self.run(buf);
        self.fold_progress(buf);

        match result {
            Ok(()) => {}
            Err(err) => {
                warn!("inflate failed after {} input bytes: {err}", self.total_in);
                self.mode = Mode::Bad;
                self.failure = Some(err.clone());
                return Err(err);
            }
        }

        let code = match self.mode {
            Mode::Done => ReturnCode::StreamEnd,
            Mode::Dict => ReturnCode::NeedDict,
            _ => {
                let progressed = buf.consumed() != in_start || buf.produced() != out_start;
                if !progressed || flush == FlushMode::Finish {
                    ReturnCode::BufError
                } else {
                    ReturnCode::Ok
                }
            }
        };
        Ok(code)
    }

    /// Skip to the next `00 00 FF FF` marker and resume decoding after it.
    ///
    /// Scans bits already held first, then the input. A marker split across
    /// calls is found. History and the running check start over; byte
    /// counters do not.
    pub fn sync(&mut self, buf: &mut StreamBuffers<'_, '_>) -> Result<ReturnCode> {
        if buf.avail_in() == 0 && self.reader.available() < 8 {
            return Ok(ReturnCode::BufError);
        }
        self.in_mark = buf.consumed();
        self.out_mark = buf.produced();

        if self.mode != Mode::Sync {
            self.mode = Mode::Sync;
            self.sync_have = 0;
            self.reader.align_to_byte();
            while self.reader.held_bytes() > 0 {
                let byte = self.reader.read_bits(8) as u8;
                self.sync_have = sync_step(self.sync_have, byte);
            }
        }

        let start = buf.consumed();
        while self.sync_have < 4 {
            let Some(byte) = buf.next_byte() else {
                break;
            };
            self.sync_have = sync_step(self.sync_have, byte);
        }
        let scanned = buf.consumed() - start;
        self.fold_progress(buf);

        if self.sync_have < 4 {
            let err = OxiFlateError::no_sync_marker(scanned);
            debug!("inflate sync: {err}");
            self.failure = Some(err.clone());
            return Err(err);
        }

        self.reader.clear();
        self.window.clear();
        self.check.reset();
        self.last_block = false;
        self.sync_have = 0;
        self.failure = None;
        self.mode = Mode::BlockHeader;
        debug!("inflate sync: marker found, resuming at input offset {}", self.total_in);
        Ok(ReturnCode::Ok)
    }

    /// Add this call's progress to the totals and the running check.
    fn fold_progress(&mut self, buf: &StreamBuffers<'_, '_>) {
        self.total_in += (buf.consumed() - self.in_mark) as u64;
        self.in_mark = buf.consumed();
        self.check.update(buf.written_since(self.out_mark));
        self.total_out += (buf.produced() - self.out_mark) as u64;
        self.out_mark = buf.produced();
    }

    fn corrupt(&self, buf: &StreamBuffers<'_, '_>, message: &str) -> OxiFlateError {
        let offset = self.total_in + (buf.consumed() - self.in_mark) as u64;
        OxiFlateError::corrupted(offset, message)
    }

    /// Read a byte-aligned field of `len` bytes, resuming a partial read.
    fn read_field(
        &mut self,
        buf: &mut StreamBuffers<'_, '_>,
        len: u8,
        big_endian: bool,
    ) -> Option<u32> {
        while self.field_len < len {
            let byte = u32::from(self.reader.read_aligned_byte(buf)?);
            if big_endian {
                self.field = (self.field << 8) | byte;
            } else {
                self.field |= byte << (8 * self.field_len);
            }
            self.field_len += 1;
        }
        let value = self.field;
        self.field = 0;
        self.field_len = 0;
        Some(value)
    }

    /// Advance the state machine until input or output runs out.
    fn run(&mut self, buf: &mut StreamBuffers<'_, '_>) -> Result<()> {
        loop {
            match self.mode {
                Mode::Head => {
                    if !self.reader.fill(buf, 16) {
                        return Ok(());
                    }
                    let first = self.reader.peek_bits(16).to_le_bytes();
                    let (cmf, flg) = (first[0], first[1]);
                    if self.wrapper == WrapperType::Any {
                        self.active = if [cmf, flg] == GZIP_MAGIC {
                            WrapperType::Gzip
                        } else if zlib::is_header(cmf, flg) {
                            WrapperType::Zlib
                        } else {
                            WrapperType::Raw
                        };
                        self.check = RunningCheck::for_wrapper(self.active);
                        debug!("inflate detected {:?} framing", self.active);
                        match self.active {
                            WrapperType::Gzip => {
                                self.mode = Mode::GzipHeader;
                                continue;
                            }
                            WrapperType::Raw => {
                                self.install_raw_dictionary();
                                self.mode = Mode::BlockHeader;
                                continue;
                            }
                            _ => {}
                        }
                    }

                    let header = zlib::parse_header(cmf, flg, self.window_bits)?;
                    self.reader.skip_bits(16);
                    self.mode = if header.has_dictionary {
                        Mode::DictId
                    } else {
                        Mode::BlockHeader
                    };
                }

                Mode::GzipHeader => loop {
                    let Some(byte) = self.reader.read_aligned_byte(buf) else {
                        return Ok(());
                    };
                    if self.gzip.push(byte)? {
                        self.mode = Mode::BlockHeader;
                        break;
                    }
                },

                Mode::DictId => {
                    let Some(id) = self.read_field(buf, 4, true) else {
                        return Ok(());
                    };
                    self.dict_id = Some(id);
                    let preset = self
                        .dictionary
                        .as_deref()
                        .filter(|dict| Adler32::checksum(dict) == id);
                    match preset {
                        Some(dict) => {
                            self.window.preload_dictionary(dict);
                            self.mode = Mode::BlockHeader;
                        }
                        None => {
                            debug!("inflate needs dictionary {id:#010x}");
                            self.mode = Mode::Dict;
                        }
                    }
                }

                Mode::Dict => return Ok(()),

                Mode::BlockHeader => {
                    if self.last_block {
                        self.reader.align_to_byte();
                        self.mode = Mode::Check;
                        continue;
                    }
                    let Some(header) = self.reader.try_read_bits(buf, 3) else {
                        return Ok(());
                    };
                    self.last_block = header & 1 != 0;
                    self.mode = match header >> 1 {
                        0 => {
                            self.reader.align_to_byte();
                            Mode::StoredLen
                        }
                        1 => {
                            self.codes = Codes::Fixed;
                            Mode::Len
                        }
                        2 => Mode::TableCounts,
                        _ => return Err(self.corrupt(buf, "invalid block type")),
                    };
                }

                Mode::StoredLen => {
                    let Some(lengths) = self.reader.try_read_bits(buf, 32) else {
                        return Ok(());
                    };
                    let len = lengths & 0xFFFF;
                    if len != !(lengths >> 16) & 0xFFFF {
                        return Err(self.corrupt(buf, "invalid stored block lengths"));
                    }
                    self.mode = Mode::Stored {
                        remaining: len as usize,
                    };
                }

                Mode::Stored { mut remaining } => {
                    while remaining > 0 && buf.avail_out() > 0 {
                        if self.reader.held_bytes() > 0 {
                            let byte = self.reader.read_bits(8) as u8;
                            buf.push(byte);
                            self.window.record_byte(byte);
                            remaining -= 1;
                            continue;
                        }
                        let count = remaining.min(buf.avail_in()).min(buf.avail_out());
                        if count == 0 {
                            break;
                        }
                        let bytes = &buf.remaining_input()[..count];
                        buf.write(bytes);
                        buf.advance_input(count);
                        self.window.record(bytes);
                        remaining -= count;
                    }
                    if remaining > 0 {
                        self.mode = Mode::Stored { remaining };
                        return Ok(());
                    }
                    self.mode = Mode::BlockHeader;
                }

                Mode::TableCounts => {
                    let Some(counts) = self.reader.try_read_bits(buf, 14) else {
                        return Ok(());
                    };
                    self.hlit = (counts & 0x1F) as usize + 257;
                    self.hdist = ((counts >> 5) & 0x1F) as usize + 1;
                    self.hclen = (counts >> 10) as usize + 4;
                    if self.hlit > 286 || self.hdist > 30 {
                        return Err(self.corrupt(buf, "too many length or distance symbols"));
                    }
                    self.codelen_lens = [0; CODELEN_ALPHABET_SIZE];
                    self.have = 0;
                    self.mode = Mode::CodeLengthLens;
                }

                Mode::CodeLengthLens => {
                    while self.have < self.hclen {
                        let Some(len) = self.reader.try_read_bits(buf, 3) else {
                            return Ok(());
                        };
                        self.codelen_lens[CODE_LENGTH_ORDER[self.have]] = len as u8;
                        self.have += 1;
                    }
                    let tree = HuffmanTree::from_code_lengths(&self.codelen_lens)
                        .ok()
                        .filter(HuffmanTree::is_complete)
                        .ok_or_else(|| self.corrupt(buf, "invalid code lengths set"))?;
                    self.codelen_tree = Some(tree);
                    self.lens.fill(0);
                    self.have = 0;
                    self.mode = Mode::CodeLens;
                }

                Mode::CodeLens => {
                    if !self.read_code_lengths(buf)? {
                        return Ok(());
                    }
                    if self.lens[usize::from(END_OF_BLOCK)] == 0 {
                        return Err(self.corrupt(buf, "invalid code -- missing end-of-block"));
                    }
                    let (hlit, hdist) = (self.hlit, self.hdist);
                    let litlen = HuffmanTree::from_code_lengths(&self.lens[..hlit])
                        .map_err(|_| self.corrupt(buf, "invalid literal/lengths set"))?;
                    let dist = HuffmanTree::from_code_lengths(&self.lens[hlit..hlit + hdist])
                        .map_err(|_| self.corrupt(buf, "invalid distances set"))?;
                    self.codes = Codes::Dynamic { litlen, dist };
                    self.codelen_tree = None;
                    self.mode = Mode::Len;
                }

                Mode::Len
                | Mode::LenExtra { .. }
                | Mode::Dist { .. }
                | Mode::DistExtra { .. }
                | Mode::Copy { .. } => {
                    if !self.decode_body(buf)? {
                        return Ok(());
                    }
                }

                Mode::Check => {
                    if self.active == WrapperType::Raw {
                        self.finish(buf);
                        continue;
                    }
                    // The trailer covers everything written so far
                    self.fold_progress(buf);
                    let big_endian = self.active == WrapperType::Zlib;
                    let Some(expected) = self.read_field(buf, 4, big_endian) else {
                        return Ok(());
                    };
                    let computed = self.check.value();
                    if expected != computed {
                        return Err(OxiFlateError::checksum_mismatch(expected, computed));
                    }
                    if self.active == WrapperType::Gzip {
                        self.mode = Mode::GzipLength;
                    } else {
                        self.finish(buf);
                    }
                }

                Mode::GzipLength => {
                    self.fold_progress(buf);
                    let Some(expected) = self.read_field(buf, 4, false) else {
                        return Ok(());
                    };
                    let computed = self.total_out as u32;
                    if expected != computed {
                        return Err(OxiFlateError::length_mismatch(expected, computed));
                    }
                    self.finish(buf);
                }

                Mode::Done | Mode::Sync | Mode::Bad => return Ok(()),
            }
        }
    }

    fn finish(&mut self, buf: &StreamBuffers<'_, '_>) {
        self.mode = Mode::Done;
        debug!(
            "inflate stream end: {} bytes in, {} bytes out",
            self.total_in + (buf.consumed() - self.in_mark) as u64,
            self.total_out + (buf.produced() - self.out_mark) as u64
        );
    }

    /// Read the run-length coded literal/length and distance code lengths.
    ///
    /// Returns `false` when the input ran out first.
    fn read_code_lengths(&mut self, buf: &mut StreamBuffers<'_, '_>) -> Result<bool> {
        let total = self.hlit + self.hdist;
        let Some(tree) = self.codelen_tree.as_ref() else {
            return Err(self.corrupt(buf, "invalid code lengths set"));
        };

        while self.have < total {
            let Some((symbol, length)) = tree.peek_symbol(&mut self.reader, buf)? else {
                return Ok(false);
            };
            if symbol < 16 {
                self.reader.skip_bits(length);
                self.lens[self.have] = symbol as u8;
                self.have += 1;
                continue;
            }

            let (extra_bits, base) = match symbol {
                16 => (2, 3),
                17 => (3, 3),
                _ => (7, 11),
            };
            // Symbol and repeat count are consumed together
            if !self.reader.fill(buf, length + extra_bits) {
                return Ok(false);
            }
            self.reader.skip_bits(length);
            let count = base + self.reader.read_bits(extra_bits) as usize;

            let value = match symbol {
                16 if self.have == 0 => {
                    let offset = self.total_in + (buf.consumed() - self.in_mark) as u64;
                    return Err(OxiFlateError::corrupted(offset, "invalid bit length repeat"));
                }
                16 => self.lens[self.have - 1],
                _ => 0,
            };
            if self.have + count > total {
                let offset = self.total_in + (buf.consumed() - self.in_mark) as u64;
                return Err(OxiFlateError::corrupted(offset, "invalid bit length repeat"));
            }
            self.lens[self.have..self.have + count].fill(value);
            self.have += count;
        }
        Ok(true)
    }

    /// Decode literals and back-references of the current block.
    ///
    /// Returns `true` at the end of the block, `false` when input or output
    /// ran out first.
    fn decode_body(&mut self, buf: &mut StreamBuffers<'_, '_>) -> Result<bool> {
        let (litlen, dist) = match &self.codes {
            Codes::Fixed => (fixed_litlen_tree(), fixed_distance_tree()),
            Codes::Dynamic { litlen, dist } => (litlen, dist),
        };
        let reader = &mut self.reader;
        let window = &mut self.window;

        loop {
            match self.mode {
                Mode::Len => {
                    let Some((symbol, length)) = litlen.peek_symbol(reader, buf)? else {
                        return Ok(false);
                    };
                    match symbol {
                        // End-of-block and lengths need no output space yet
                        0..=255 if buf.avail_out() == 0 => return Ok(false),
                        0..=255 => {
                            reader.skip_bits(length);
                            buf.push(symbol as u8);
                            window.record_byte(symbol as u8);
                        }
                        END_OF_BLOCK => {
                            reader.skip_bits(length);
                            self.mode = Mode::BlockHeader;
                            return Ok(true);
                        }
                        257..=285 => {
                            reader.skip_bits(length);
                            self.mode = Mode::LenExtra { symbol };
                        }
                        _ => {
                            let offset = self.total_in + (buf.consumed() - self.in_mark) as u64;
                            return Err(OxiFlateError::corrupted(
                                offset,
                                "invalid literal/length code",
                            ));
                        }
                    }
                }

                Mode::LenExtra { symbol } => {
                    let extra_bits = LENGTH_EXTRA_BITS[usize::from(symbol - 257)];
                    let Some(extra) = reader.try_read_bits(buf, extra_bits) else {
                        return Ok(false);
                    };
                    self.mode = Mode::Dist {
                        length: decode_length(symbol, extra as u16),
                    };
                }

                Mode::Dist { length } => {
                    let Some((symbol, code_length)) = dist.peek_symbol(reader, buf)? else {
                        return Ok(false);
                    };
                    if symbol >= 30 {
                        let offset = self.total_in + (buf.consumed() - self.in_mark) as u64;
                        return Err(OxiFlateError::corrupted(offset, "invalid distance code"));
                    }
                    reader.skip_bits(code_length);
                    self.mode = Mode::DistExtra { length, symbol };
                }

                Mode::DistExtra { length, symbol } => {
                    let extra_bits = DISTANCE_EXTRA_BITS[usize::from(symbol)];
                    let Some(extra) = reader.try_read_bits(buf, extra_bits) else {
                        return Ok(false);
                    };
                    let distance = usize::from(decode_distance(symbol, extra as u16));
                    if distance > window.len() {
                        let offset = self.total_in + (buf.consumed() - self.in_mark) as u64;
                        return Err(OxiFlateError::corrupted(
                            offset,
                            "invalid distance too far back",
                        ));
                    }
                    self.mode = Mode::Copy {
                        length: usize::from(length),
                        distance,
                    };
                }

                Mode::Copy { length, distance } => {
                    if buf.avail_out() == 0 {
                        return Ok(false);
                    }
                    let copied = window.copy_match(distance, length, buf)?;
                    self.mode = if copied == length {
                        Mode::Len
                    } else {
                        Mode::Copy {
                            length: length - copied,
                            distance,
                        }
                    };
                }

                _ => return Ok(true),
            }
        }
    }
}

/// Advance the sync marker match by one byte.
fn sync_step(have: usize, byte: u8) -> usize {
    let wanted = if have < 2 { 0x00 } else { 0xFF };
    if byte == wanted {
        have + 1
    } else if byte != 0 {
        0
    } else {
        4 - have
    }
}

impl Decompressor for Inflater {
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, ReturnCode)> {
        let mut buf = StreamBuffers::new(input, output);
        let code = self.inflate(&mut buf, flush)?;
        Ok((buf.consumed(), buf.produced(), code))
    }

    fn reset(&mut self) {
        Inflater::reset(self);
    }

    fn is_finished(&self) -> bool {
        self.is_done()
    }
}
