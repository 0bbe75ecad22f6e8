//! Error types for OxiFlate operations.
//!
//! Internally every failure is an [`OxiFlateError`] propagated with `?`. At the
//! stream boundary each variant collapses onto one of the stable result codes
//! in [`ReturnCode`](crate::traits::ReturnCode) through
//! [`OxiFlateError::return_code`].

use crate::traits::ReturnCode;
use thiserror::Error;

/// The main error type for OxiFlate operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OxiFlateError {
    /// Invalid magic number in a wrapper header.
    #[error("Invalid magic number: expected {expected:02x?}, found {found:02x?}")]
    InvalidMagic {
        /// Expected magic bytes.
        expected: Vec<u8>,
        /// Actual magic bytes found.
        found: Vec<u8>,
    },

    /// Unsupported compression method in a wrapper header.
    #[error("Unsupported compression method: {method}")]
    UnsupportedMethod {
        /// The compression method identifier.
        method: u8,
    },

    /// Trailer checksum or length mismatch.
    #[error("Incorrect {kind} check: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Which check failed ("data" or "length").
        kind: &'static str,
        /// Value stored in the stream.
        expected: u32,
        /// Value computed from the decoded data.
        computed: u32,
    },

    /// Invalid Huffman code encountered during decompression.
    #[error("Invalid Huffman code at bit position {bit_position}")]
    InvalidHuffmanCode {
        /// Bit position where the invalid code was found.
        bit_position: u64,
    },

    /// Corrupted compressed data.
    #[error("Corrupted data at offset {offset}: {message}")]
    CorruptedData {
        /// Input byte offset where corruption was detected.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// Invalid wrapper header.
    #[error("Invalid header: {message}")]
    InvalidHeader {
        /// Description of the header error.
        message: String,
    },

    /// Back-reference reaching further than the available history.
    #[error("Invalid back-reference distance: {distance} exceeds history size {history_size}")]
    InvalidDistance {
        /// The invalid distance value.
        distance: usize,
        /// Current history size.
        history_size: usize,
    },

    /// Preset dictionary does not match the identifier declared by the stream.
    #[error("Dictionary mismatch: expected id {expected:#010x}, got {actual:#010x}")]
    DictionaryMismatch {
        /// Dictionary id declared in the stream header.
        expected: u32,
        /// Adler-32 of the supplied dictionary.
        actual: u32,
    },

    /// No `00 00 FF FF` marker in the scanned input.
    #[error("No sync marker found after scanning {scanned} bytes")]
    NoSyncMarker {
        /// Number of input bytes scanned.
        scanned: usize,
    },

    /// Invalid parameter passed by the caller.
    #[error("Invalid parameter: {message}")]
    InvalidParameter {
        /// Description of the bad parameter.
        message: String,
    },

    /// Operation not permitted in the current session state.
    #[error("Invalid stream state: {message}")]
    InvalidState {
        /// Description of the misuse.
        message: String,
    },

    /// An internal buffer could not be allocated.
    #[error("Out of memory allocating {bytes} bytes")]
    OutOfMemory {
        /// Size of the failed allocation.
        bytes: usize,
    },
}

/// Result type alias for OxiFlate operations.
pub type Result<T> = std::result::Result<T, OxiFlateError>;

impl OxiFlateError {
    /// Create an invalid magic error.
    pub fn invalid_magic(expected: impl Into<Vec<u8>>, found: impl Into<Vec<u8>>) -> Self {
        Self::InvalidMagic {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create an unsupported method error.
    pub fn unsupported_method(method: u8) -> Self {
        Self::UnsupportedMethod { method }
    }

    /// Create a data checksum mismatch error.
    pub fn checksum_mismatch(expected: u32, computed: u32) -> Self {
        Self::ChecksumMismatch {
            kind: "data",
            expected,
            computed,
        }
    }

    /// Create a length check mismatch error.
    pub fn length_mismatch(expected: u32, computed: u32) -> Self {
        Self::ChecksumMismatch {
            kind: "length",
            expected,
            computed,
        }
    }

    /// Create an invalid Huffman code error.
    pub fn invalid_huffman(bit_position: u64) -> Self {
        Self::InvalidHuffmanCode { bit_position }
    }

    /// Create a corrupted data error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::CorruptedData {
            offset,
            message: message.into(),
        }
    }

    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Create an invalid distance error.
    pub fn invalid_distance(distance: usize, history_size: usize) -> Self {
        Self::InvalidDistance {
            distance,
            history_size,
        }
    }

    /// Create a dictionary mismatch error.
    pub fn dictionary_mismatch(expected: u32, actual: u32) -> Self {
        Self::DictionaryMismatch { expected, actual }
    }

    /// Create a missing sync marker error.
    pub fn no_sync_marker(scanned: usize) -> Self {
        Self::NoSyncMarker { scanned }
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create an out of memory error.
    pub fn out_of_memory(bytes: usize) -> Self {
        Self::OutOfMemory { bytes }
    }

    /// Map this error onto the public result-code taxonomy.
    pub fn return_code(&self) -> ReturnCode {
        match self {
            Self::InvalidParameter { .. } | Self::InvalidState { .. } => ReturnCode::StreamError,
            Self::OutOfMemory { .. } => ReturnCode::MemError,
            _ => ReturnCode::DataError,
        }
    }
}
