//! Stream wrapper selection and the running integrity check.

use oxiflate_core::adler::Adler32;
use oxiflate_core::crc::Crc32;
use oxiflate_core::error::{OxiFlateError, Result};

/// Framing around the DEFLATE block stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapperType {
    /// Bare DEFLATE blocks, no header or trailer.
    Raw,
    /// zlib (RFC 1950): 2-byte header, Adler-32 trailer.
    #[default]
    Zlib,
    /// gzip (RFC 1952): member header, CRC-32 and length trailer.
    Gzip,
    /// Decompression only: detect zlib or gzip from the first bytes,
    /// otherwise fall back to raw.
    Any,
}

impl WrapperType {
    /// Decode a zlib-style `windowBits` argument.
    ///
    /// - `-15..=-8`: raw
    /// - `8..=15`: zlib
    /// - `24..=31` (16 + bits): gzip
    /// - `40..=47` (32 + bits): auto-detect
    ///
    /// # Returns
    ///
    /// The wrapper and the log2 window size.
    pub fn from_window_bits(window_bits: i32) -> Result<(Self, u8)> {
        let (wrapper, bits) = match window_bits {
            -15..=-8 => (Self::Raw, -window_bits),
            8..=15 => (Self::Zlib, window_bits),
            24..=31 => (Self::Gzip, window_bits - 16),
            40..=47 => (Self::Any, window_bits - 32),
            _ => {
                return Err(OxiFlateError::invalid_parameter(format!(
                    "window bits {window_bits} outside the supported ranges"
                )));
            }
        };
        Ok((wrapper, bits as u8))
    }

    /// Bytes of fixed header and trailer this wrapper adds.
    pub fn overhead(self) -> usize {
        match self {
            Self::Raw | Self::Any => 0,
            Self::Zlib => 6,
            Self::Gzip => 18,
        }
    }
}

/// Checksum of the uncompressed data, as the wrapper's trailer needs it.
#[derive(Debug, Clone, Default)]
pub enum RunningCheck {
    /// Raw streams carry no check.
    #[default]
    None,
    /// zlib trailer.
    Adler(Adler32),
    /// gzip trailer.
    Crc(Crc32),
}

impl RunningCheck {
    /// The check a wrapper uses.
    pub fn for_wrapper(wrapper: WrapperType) -> Self {
        match wrapper {
            WrapperType::Zlib => Self::Adler(Adler32::new()),
            WrapperType::Gzip => Self::Crc(Crc32::new()),
            WrapperType::Raw | WrapperType::Any => Self::None,
        }
    }

    /// Fold more uncompressed bytes into the check.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::None => {}
            Self::Adler(adler) => adler.update(data),
            Self::Crc(crc) => crc.update(data),
        }
    }

    /// Current value; raw streams report the Adler-32 seed.
    pub fn value(&self) -> u32 {
        match self {
            Self::None => 1,
            Self::Adler(adler) => adler.value(),
            Self::Crc(crc) => crc.value(),
        }
    }

    /// Start over on a new stream.
    pub fn reset(&mut self) {
        match self {
            Self::None => {}
            Self::Adler(adler) => adler.reset(),
            Self::Crc(crc) => crc.reset(),
        }
    }
}
