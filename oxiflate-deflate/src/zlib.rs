//! Zlib format framing for DEFLATE streams.
//!
//! The zlib format (RFC 1950) wraps raw DEFLATE data with a header and
//! an Adler-32 checksum. It is widely used in PNG, HTTP compression, and
//! many other applications.
//!
//! # Format
//!
//! ```text
//! +---+---+=======+============+---+---+---+---+
//! |CMF|FLG|DICTID?| compressed |    ADLER32    |
//! +---+---+=======+============+---+---+---+---+
//! ```
//!
//! - CMF: Compression Method and Flags
//!   - Bits 0-3: CM (Compression Method) - must be 8 for DEFLATE
//!   - Bits 4-7: CINFO (Compression Info) - log2(window size) - 8
//! - FLG: Flags
//!   - Bits 0-4: FCHECK - check bits so (CMF*256 + FLG) mod 31 == 0
//!   - Bit 5: FDICT - preset dictionary present
//!   - Bits 6-7: FLEVEL - compression level (0-3)
//! - DICTID: Adler-32 of the preset dictionary (big-endian), if FDICT
//! - Compressed data (DEFLATE format)
//! - ADLER32: Adler-32 checksum of uncompressed data (big-endian)
//!
//! The engines drive the byte-level state machines; this module only
//! builds and validates the fixed fields.

use crate::deflate::Strategy;
use oxiflate_core::error::{OxiFlateError, Result};

/// The DEFLATE compression method.
const METHOD_DEFLATE: u8 = 8;

/// FDICT bit of the FLG byte.
const FLAG_DICT: u8 = 0x20;

/// Zlib compression level indicator in header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ZlibLevel {
    /// Fastest compression.
    Fastest = 0,
    /// Fast compression.
    Fast = 1,
    /// Default compression.
    Default = 2,
    /// Maximum compression.
    Maximum = 3,
}

impl ZlibLevel {
    /// Level indicator for a compression level (0-9) and strategy.
    pub fn from_settings(level: u8, strategy: Strategy) -> Self {
        if level < 2
            || matches!(
                strategy,
                Strategy::HuffmanOnly | Strategy::Rle | Strategy::Fixed
            )
        {
            return Self::Fastest;
        }
        match level {
            2..=5 => Self::Fast,
            6 => Self::Default,
            _ => Self::Maximum,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits & 3 {
            0 => Self::Fastest,
            1 => Self::Fast,
            2 => Self::Default,
            _ => Self::Maximum,
        }
    }
}

/// Fields of a parsed zlib header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZlibHeader {
    /// log2 of the window the stream was compressed with.
    pub window_bits: u8,
    /// Compression level indicator.
    pub level: ZlibLevel,
    /// Whether a DICTID field follows.
    pub has_dictionary: bool,
}

/// Build the header: CMF, FLG and, with a dictionary, its DICTID.
pub fn header_bytes(window_bits: u8, level: ZlibLevel, dict_id: Option<u32>) -> Vec<u8> {
    let cmf = METHOD_DEFLATE | ((window_bits - 8) << 4);
    let mut flg = (level as u8) << 6;
    if dict_id.is_some() {
        flg |= FLAG_DICT;
    }
    let check = (u16::from(cmf) << 8) | u16::from(flg);
    flg += 31 - (check % 31) as u8;

    let mut header = vec![cmf, flg];
    if let Some(id) = dict_id {
        header.extend_from_slice(&id.to_be_bytes());
    }
    header
}

/// Validate the two header bytes.
///
/// # Arguments
///
/// * `cmf` - First header byte
/// * `flg` - Second header byte
/// * `max_window_bits` - Largest window the decoder was configured for
pub fn parse_header(cmf: u8, flg: u8, max_window_bits: u8) -> Result<ZlibHeader> {
    if ((u16::from(cmf) << 8) | u16::from(flg)) % 31 != 0 {
        return Err(OxiFlateError::invalid_header("incorrect header check"));
    }
    if cmf & 0x0F != METHOD_DEFLATE {
        return Err(OxiFlateError::unsupported_method(cmf & 0x0F));
    }
    let window_bits = (cmf >> 4) + 8;
    if window_bits > 15 || window_bits > max_window_bits {
        return Err(OxiFlateError::invalid_header(format!(
            "invalid window size: stream needs {window_bits} bits, decoder allows {max_window_bits}"
        )));
    }
    Ok(ZlibHeader {
        window_bits,
        level: ZlibLevel::from_bits(flg >> 6),
        has_dictionary: flg & FLAG_DICT != 0,
    })
}

/// Check whether two bytes look like a zlib header.
pub fn is_header(cmf: u8, flg: u8) -> bool {
    cmf & 0x0F == METHOD_DEFLATE
        && cmf >> 4 <= 7
        && ((u16::from(cmf) << 8) | u16::from(flg)) % 31 == 0
}

/// Build the trailer.
pub fn trailer_bytes(adler: u32) -> [u8; 4] {
    adler.to_be_bytes()
}
