//! # OxiFlate Core
//!
//! Core components for the OxiFlate codec.
//!
//! This crate provides the building blocks shared by the compressor and the
//! decompressor:
//!
//! - [`bitstream`]: Resumable LSB-first bit reader and pending-buffer bit writer
//! - [`buffers`]: Per-call input/output cursors
//! - [`window`]: Sliding window for back-reference resolution
//! - [`adler`]: Adler-32 checksum (zlib)
//! - [`crc`]: CRC-32 checksum (gzip)
//! - [`traits`]: Flush modes, result codes, and codec traits
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: Stream                                              │
//! │     Session façade, zlib/gzip framing, result codes    │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Codec                                               │
//! │     Deflate/Inflate engines, LZ77 matcher, Huffman     │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: BitStream (this crate)                              │
//! │     BitReader/BitWriter, SlidingWindow, Adler-32, CRC  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use oxiflate_core::adler::Adler32;
//! use oxiflate_core::crc::Crc32;
//!
//! assert_eq!(Crc32::checksum(b"Hello, World!"), 0xEC4AC3D0);
//!
//! let a = Adler32::checksum(b"Hello, ");
//! let b = Adler32::checksum(b"World!");
//! assert_eq!(Adler32::combine(a, b, 6), Adler32::checksum(b"Hello, World!"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod adler;
pub mod bitstream;
pub mod buffers;
pub mod crc;
pub mod error;
pub mod traits;
pub mod window;

// Re-exports for convenience
pub use adler::Adler32;
pub use bitstream::{BitReader, BitWriter};
pub use buffers::StreamBuffers;
pub use crc::Crc32;
pub use error::{OxiFlateError, Result};
pub use traits::{CompressionLevel, Compressor, Decompressor, FlushMode, ReturnCode};
pub use window::SlidingWindow;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::adler::Adler32;
    pub use crate::crc::Crc32;
    pub use crate::error::{OxiFlateError, Result};
    pub use crate::traits::{CompressionLevel, Compressor, Decompressor, FlushMode, ReturnCode};
}
