//! Gzip member framing (RFC 1952).
//!
//! ```text
//! +---+---+---+---+---+---+---+---+---+---+
//! |ID1|ID2|CM |FLG|     MTIME     |XFL|OS |
//! +---+---+---+---+---+---+---+---+---+---+
//! (if FEXTRA)   XLEN (2 bytes LE) + XLEN bytes
//! (if FNAME)    zero-terminated file name
//! (if FCOMMENT) zero-terminated comment
//! (if FHCRC)    CRC16 (low half of the CRC-32 of the header so far)
//! compressed blocks
//! CRC32 (4 bytes LE) + ISIZE (4 bytes LE)
//! ```
//!
//! [`GzipHeader`] is written in one piece by the compressor. The
//! decompressor feeds header bytes one at a time into a
//! [`GzipHeaderParser`], so a header may straddle any number of calls.

use crate::deflate::Strategy;
use oxiflate_core::crc::Crc32;
use oxiflate_core::error::{OxiFlateError, Result};

/// Gzip magic bytes.
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Compression method for DEFLATE.
const METHOD_DEFLATE: u8 = 8;

const FLAG_TEXT: u8 = 0x01;
const FLAG_HCRC: u8 = 0x02;
const FLAG_EXTRA: u8 = 0x04;
const FLAG_NAME: u8 = 0x08;
const FLAG_COMMENT: u8 = 0x10;
const FLAG_RESERVED: u8 = 0xE0;

/// OS byte meaning "unknown".
pub const OS_UNKNOWN: u8 = 255;

/// Longest name or comment kept by [`GzipHeaderParser`]; further bytes are
/// read but dropped.
pub const MAX_TEXT_FIELD: usize = 4096;

/// Metadata carried by a gzip member header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GzipHeader {
    /// The payload is probably text.
    pub text: bool,
    /// Modification time (seconds since the Unix epoch, 0 if unknown).
    pub mtime: u32,
    /// Extra flags (XFL); set from the level when compressing.
    pub extra_flags: u8,
    /// Operating system the member was created on.
    pub os: u8,
    /// Extra field payload.
    pub extra: Option<Vec<u8>>,
    /// Original file name, without the terminating zero.
    pub name: Option<Vec<u8>>,
    /// Comment, without the terminating zero.
    pub comment: Option<Vec<u8>>,
    /// Whether the header is protected by a CRC16.
    pub header_crc: bool,
}

impl Default for GzipHeader {
    fn default() -> Self {
        Self {
            text: false,
            mtime: 0,
            extra_flags: 0,
            os: OS_UNKNOWN,
            extra: None,
            name: None,
            comment: None,
            header_crc: false,
        }
    }
}

impl GzipHeader {
    /// Create an empty header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the file name.
    pub fn with_name(mut self, name: impl Into<Vec<u8>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the comment.
    pub fn with_comment(mut self, comment: impl Into<Vec<u8>>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Set the modification time.
    pub fn with_mtime(mut self, mtime: u32) -> Self {
        self.mtime = mtime;
        self
    }

    /// Set the OS byte.
    pub fn with_os(mut self, os: u8) -> Self {
        self.os = os;
        self
    }

    /// Set the extra field.
    pub fn with_extra(mut self, extra: impl Into<Vec<u8>>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    /// Protect the header with a CRC16.
    pub fn with_header_crc(mut self, enabled: bool) -> Self {
        self.header_crc = enabled;
        self
    }

    /// Mark the payload as text.
    pub fn with_text(mut self, text: bool) -> Self {
        self.text = text;
        self
    }

    fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.text {
            flags |= FLAG_TEXT;
        }
        if self.header_crc {
            flags |= FLAG_HCRC;
        }
        if self.extra.is_some() {
            flags |= FLAG_EXTRA;
        }
        if self.name.is_some() {
            flags |= FLAG_NAME;
        }
        if self.comment.is_some() {
            flags |= FLAG_COMMENT;
        }
        flags
    }

    /// Serialize the header.
    ///
    /// Names and comments end at their first zero byte; an extra field is
    /// cut to 65535 bytes.
    pub fn to_bytes(&self, extra_flags: u8) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&GZIP_MAGIC);
        out.push(METHOD_DEFLATE);
        out.push(self.flags());
        out.extend_from_slice(&self.mtime.to_le_bytes());
        out.push(extra_flags);
        out.push(self.os);

        if let Some(extra) = &self.extra {
            let extra = &extra[..extra.len().min(usize::from(u16::MAX))];
            out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
            out.extend_from_slice(extra);
        }
        for field in [&self.name, &self.comment].into_iter().flatten() {
            out.extend_from_slice(until_nul(field));
            out.push(0);
        }
        if self.header_crc {
            let crc = Crc32::checksum(&out) as u16;
            out.extend_from_slice(&crc.to_le_bytes());
        }
        out
    }

    /// Size of the serialized header.
    pub fn encoded_len(&self) -> usize {
        let mut len = 10;
        if let Some(extra) = &self.extra {
            len += 2 + extra.len().min(usize::from(u16::MAX));
        }
        for field in [&self.name, &self.comment].into_iter().flatten() {
            len += until_nul(field).len() + 1;
        }
        if self.header_crc {
            len += 2;
        }
        len
    }
}

fn until_nul(field: &[u8]) -> &[u8] {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..end]
}

/// XFL byte for a compression level and strategy.
pub fn extra_flags_for(level: u8, strategy: Strategy) -> u8 {
    if level == 9 {
        2
    } else if level < 2
        || matches!(
            strategy,
            Strategy::HuffmanOnly | Strategy::Rle | Strategy::Fixed
        )
    {
        4
    } else {
        0
    }
}

/// Build the trailer: CRC-32 and ISIZE, both little-endian.
pub fn trailer_bytes(crc: u32, isize: u32) -> [u8; 8] {
    let mut trailer = [0u8; 8];
    trailer[..4].copy_from_slice(&crc.to_le_bytes());
    trailer[4..].copy_from_slice(&isize.to_le_bytes());
    trailer
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Fixed,
    ExtraLen,
    Extra,
    Name,
    Comment,
    HeaderCrc,
    Done,
}

/// Byte-at-a-time gzip header reader.
#[derive(Debug, Clone)]
pub struct GzipHeaderParser {
    stage: Stage,
    fixed: [u8; 10],
    count: usize,
    flags: u8,
    extra_len: usize,
    crc: Crc32,
    field: Vec<u8>,
    header: GzipHeader,
}

impl Default for GzipHeaderParser {
    fn default() -> Self {
        Self::new()
    }
}

impl GzipHeaderParser {
    /// Create a parser waiting for the first header byte.
    pub fn new() -> Self {
        Self {
            stage: Stage::Fixed,
            fixed: [0; 10],
            count: 0,
            flags: 0,
            extra_len: 0,
            crc: Crc32::new(),
            field: Vec::new(),
            header: GzipHeader::default(),
        }
    }

    /// Check whether the whole header has been read.
    pub fn is_done(&self) -> bool {
        self.stage == Stage::Done
    }

    /// The header fields read so far.
    pub fn header(&self) -> &GzipHeader {
        &self.header
    }

    /// Feed one header byte.
    ///
    /// # Returns
    ///
    /// `true` once the header is complete.
    pub fn push(&mut self, byte: u8) -> Result<bool> {
        if self.stage != Stage::HeaderCrc {
            self.crc.update(&[byte]);
        }

        match self.stage {
            Stage::Fixed => {
                self.fixed[self.count] = byte;
                self.count += 1;
                match self.count {
                    2 if self.fixed[..2] != GZIP_MAGIC => {
                        return Err(OxiFlateError::invalid_magic(GZIP_MAGIC, &self.fixed[..2]));
                    }
                    3 if byte != METHOD_DEFLATE => {
                        return Err(OxiFlateError::unsupported_method(byte));
                    }
                    4 if byte & FLAG_RESERVED != 0 => {
                        return Err(OxiFlateError::invalid_header(format!(
                            "reserved gzip flag bits set: {byte:#04x}"
                        )));
                    }
                    4 => self.flags = byte,
                    10 => {
                        let f = &self.fixed;
                        self.header.text = self.flags & FLAG_TEXT != 0;
                        self.header.mtime = u32::from_le_bytes([f[4], f[5], f[6], f[7]]);
                        self.header.extra_flags = f[8];
                        self.header.os = f[9];
                        self.header.header_crc = self.flags & FLAG_HCRC != 0;
                        self.advance();
                    }
                    _ => {}
                }
            }
            Stage::ExtraLen => {
                self.field.push(byte);
                if self.field.len() == 2 {
                    let len = u16::from_le_bytes([self.field[0], self.field[1]]);
                    self.extra_len = usize::from(len);
                    self.field.clear();
                    if self.extra_len == 0 {
                        self.header.extra = Some(Vec::new());
                        self.advance();
                    } else {
                        self.stage = Stage::Extra;
                    }
                }
            }
            Stage::Extra => {
                self.field.push(byte);
                if self.field.len() == self.extra_len {
                    self.header.extra = Some(std::mem::take(&mut self.field));
                    self.advance();
                }
            }
            Stage::Name | Stage::Comment => {
                if byte == 0 {
                    let text = Some(std::mem::take(&mut self.field));
                    if self.stage == Stage::Name {
                        self.header.name = text;
                    } else {
                        self.header.comment = text;
                    }
                    self.advance();
                } else if self.field.len() < MAX_TEXT_FIELD {
                    self.field.push(byte);
                }
            }
            Stage::HeaderCrc => {
                self.field.push(byte);
                if self.field.len() == 2 {
                    let stored = u16::from_le_bytes([self.field[0], self.field[1]]);
                    let computed = self.crc.value() as u16;
                    if stored != computed {
                        return Err(OxiFlateError::invalid_header(format!(
                            "header crc mismatch: stored {stored:#06x}, computed {computed:#06x}"
                        )));
                    }
                    self.field.clear();
                    self.stage = Stage::Done;
                }
            }
            Stage::Done => {}
        }
        Ok(self.stage == Stage::Done)
    }

    /// Move to the next flagged field after the current stage.
    fn advance(&mut self) {
        const FIELDS: [(Stage, u8); 4] = [
            (Stage::ExtraLen, FLAG_EXTRA),
            (Stage::Name, FLAG_NAME),
            (Stage::Comment, FLAG_COMMENT),
            (Stage::HeaderCrc, FLAG_HCRC),
        ];
        let next = match self.stage {
            Stage::Fixed => 0,
            Stage::ExtraLen | Stage::Extra => 1,
            Stage::Name => 2,
            Stage::Comment => 3,
            Stage::HeaderCrc | Stage::Done => 4,
        };
        self.stage = FIELDS[next..]
            .iter()
            .find(|&&(_, flag)| self.flags & flag != 0)
            .map_or(Stage::Done, |&(stage, _)| stage);
    }
}
