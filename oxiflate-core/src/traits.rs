//! Core traits and shared vocabulary for streaming codecs.
//!
//! This module defines the flush modes and result codes every session speaks,
//! the compression level newtype, and the [`Compressor`] / [`Decompressor`]
//! traits implemented by the DEFLATE engines.

use crate::error::{OxiFlateError, Result};

/// Caller-visible result of a streaming call.
///
/// The numeric values are part of the public contract and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ReturnCode {
    /// Call succeeded; more input or output may remain.
    Ok = 0,
    /// Logical end of the compressed data was reached.
    StreamEnd = 1,
    /// Decoding is paused until a matching preset dictionary is installed.
    NeedDict = 2,
    /// Invalid parameters or a call made in an invalid session state.
    StreamError = -2,
    /// Malformed compressed data, bad checksum, or no sync marker found.
    DataError = -3,
    /// An internal allocation failed.
    MemError = -4,
    /// No progress was possible with the buffers supplied.
    BufError = -5,
}

impl ReturnCode {
    /// Get the stable numeric value.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Check whether this code reports a failure.
    pub fn is_error(self) -> bool {
        self.code() < 0
    }
}

/// Flush mode for a streaming call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FlushMode {
    /// No flush - batch freely for best compression.
    #[default]
    None,
    /// Partial flush - treated like [`FlushMode::Sync`].
    Partial,
    /// Sync flush - close the block and emit an empty stored block.
    Sync,
    /// Full flush - sync flush plus a reset of the match history.
    Full,
    /// Finish - close the final block and write the trailer.
    Finish,
}

impl FlushMode {
    /// Relative strength, used to decide whether a repeated call can progress.
    pub fn rank(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Partial => 1,
            Self::Sync => 2,
            Self::Full => 3,
            Self::Finish => 4,
        }
    }
}

/// A streaming compressor (encoder).
pub trait Compressor {
    /// Compress data from input to output.
    ///
    /// # Arguments
    ///
    /// * `input` - Input data to compress
    /// * `output` - Output buffer for compressed data
    /// * `flush` - Flush mode
    ///
    /// # Returns
    ///
    /// A tuple of (bytes consumed from input, bytes written to output, code).
    /// Failures are reported through the error instead of a code.
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, ReturnCode)>;

    /// Reset the compressor to its initial state, keeping its settings.
    fn reset(&mut self);

    /// Check if the compressor has written its trailer.
    fn is_finished(&self) -> bool;

    /// Compress all data at once (convenience method).
    fn compress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut input_pos = 0;
        let mut buffer = vec![0u8; 32768];

        loop {
            let (consumed, produced, code) =
                self.compress(&input[input_pos..], &mut buffer, FlushMode::Finish)?;

            input_pos += consumed;
            output.extend_from_slice(&buffer[..produced]);

            match code {
                ReturnCode::StreamEnd => break,
                ReturnCode::Ok => continue,
                other => {
                    return Err(OxiFlateError::invalid_state(format!(
                        "compressor stalled with {other:?}"
                    )));
                }
            }
        }

        Ok(output)
    }
}

/// A streaming decompressor (decoder).
pub trait Decompressor {
    /// Decompress data from input to output.
    ///
    /// # Arguments
    ///
    /// * `input` - Input compressed data
    /// * `output` - Output buffer for decompressed data
    /// * `flush` - Flush mode ([`FlushMode::Finish`] asserts the input is complete)
    ///
    /// # Returns
    ///
    /// A tuple of (bytes consumed from input, bytes written to output, code).
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, ReturnCode)>;

    /// Reset the decompressor to its initial state.
    fn reset(&mut self);

    /// Check if the decompressor has reached the end of the stream.
    fn is_finished(&self) -> bool;

    /// Decompress all data at once (convenience method).
    fn decompress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut input_pos = 0;
        let mut buffer = vec![0u8; 32768];

        loop {
            let (consumed, produced, code) =
                self.decompress(&input[input_pos..], &mut buffer, FlushMode::None)?;

            input_pos += consumed;
            output.extend_from_slice(&buffer[..produced]);

            match code {
                ReturnCode::StreamEnd => break,
                ReturnCode::Ok => continue,
                ReturnCode::NeedDict => {
                    return Err(OxiFlateError::invalid_state(
                        "stream requires a preset dictionary",
                    ));
                }
                _ => {
                    return Err(OxiFlateError::corrupted(
                        input_pos as u64,
                        "unexpected end of compressed data",
                    ));
                }
            }
        }

        Ok(output)
    }
}

/// Compression level for algorithms that support it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    /// No compression (store only).
    pub const NONE: Self = Self(0);
    /// Fastest compression.
    pub const FAST: Self = Self(1);
    /// Default compression (balanced).
    pub const DEFAULT: Self = Self(6);
    /// Best compression (slowest).
    pub const BEST: Self = Self(9);

    /// Create a custom compression level (0-9).
    pub fn new(level: u8) -> Self {
        Self(level.min(9))
    }

    /// Create a level from a value, rejecting anything above 9.
    pub fn try_new(level: u8) -> Result<Self> {
        if level > 9 {
            return Err(OxiFlateError::invalid_parameter(format!(
                "compression level {level} is out of range 0-9"
            )));
        }
        Ok(Self(level))
    }

    /// Get the level value.
    pub fn level(&self) -> u8 {
        self.0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u8> for CompressionLevel {
    fn from(level: u8) -> Self {
        Self::new(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_level() {
        assert_eq!(CompressionLevel::NONE.level(), 0);
        assert_eq!(CompressionLevel::FAST.level(), 1);
        assert_eq!(CompressionLevel::DEFAULT.level(), 6);
        assert_eq!(CompressionLevel::BEST.level(), 9);

        // Clamping
        assert_eq!(CompressionLevel::new(100).level(), 9);
        assert!(CompressionLevel::try_new(10).is_err());
        assert_eq!(CompressionLevel::try_new(3).map(|l| l.level()), Ok(3));
    }

    #[test]
    fn test_flush_mode_default() {
        assert_eq!(FlushMode::default(), FlushMode::None);
        assert!(FlushMode::Finish.rank() > FlushMode::Full.rank());
        assert!(FlushMode::Sync.rank() > FlushMode::Partial.rank());
    }

    #[test]
    fn test_return_code_values() {
        assert_eq!(ReturnCode::Ok.code(), 0);
        assert_eq!(ReturnCode::StreamEnd.code(), 1);
        assert_eq!(ReturnCode::NeedDict.code(), 2);
        assert_eq!(ReturnCode::StreamError.code(), -2);
        assert_eq!(ReturnCode::DataError.code(), -3);
        assert_eq!(ReturnCode::MemError.code(), -4);
        assert_eq!(ReturnCode::BufError.code(), -5);
        assert!(ReturnCode::BufError.is_error());
        assert!(!ReturnCode::NeedDict.is_error());
    }
}
