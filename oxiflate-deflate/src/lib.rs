//! # OxiFlate Deflate
//!
//! Pure Rust streaming implementation of DEFLATE (RFC 1951) with zlib
//! (RFC 1950) and gzip (RFC 1952) framing.
//!
//! ## Features
//!
//! - **Decompression**: Full support for all DEFLATE block types
//!   - Stored (uncompressed) blocks
//!   - Fixed Huffman codes
//!   - Dynamic Huffman codes
//! - **Compression**: hash-chain LZ77 with lazy matching + Huffman encoding
//!   - Compression levels 0-9 and five strategies
//!   - Per-block choice of stored, fixed or dynamic encoding
//! - **Streaming**: every call can stop after any input or output byte
//!   - Partial, sync and full flushes; `00 00 FF FF` resynchronization
//!   - Preset dictionaries, with a NEED_DICT pause on decompression
//!   - Auto-detection of zlib, gzip or raw input
//!
//! ## Example
//!
//! ```rust
//! use oxiflate_deflate::{WrapperType, compress, decompress};
//!
//! let original = b"Hello, World! Hello, World!";
//! let compressed = compress(original, 6, WrapperType::Gzip).unwrap();
//! let decompressed = decompress(&compressed, WrapperType::Any).unwrap();
//! assert_eq!(&decompressed, original);
//! ```
//!
//! ## Compression Levels
//!
//! - Level 0: No compression (stored blocks)
//! - Level 1-3: Greedy matching
//! - Level 4-9: Lazy matching (default is 6)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod deflate;
pub mod gzip;
pub mod huffman;
pub mod inflate;
pub mod lz77;
pub mod stream;
pub mod tables;
pub mod wrapper;
pub mod zlib;

// Re-exports
pub use deflate::{DeflateConfig, Deflater, Strategy};
pub use gzip::GzipHeader;
pub use huffman::{HuffmanBuilder, HuffmanTree};
pub use inflate::{InflateConfig, Inflater};
pub use lz77::{Lz77Matcher, Lz77Token};
pub use stream::{Progress, Stream};
pub use wrapper::WrapperType;

use oxiflate_core::error::Result;
use oxiflate_core::traits::{CompressionLevel, Compressor, Decompressor};

/// Compress `data` in one call.
///
/// # Arguments
///
/// * `data` - Bytes to compress
/// * `level` - Compression level (0-9)
/// * `wrapper` - Output framing (raw, zlib or gzip)
pub fn compress(
    data: &[u8],
    level: impl Into<CompressionLevel>,
    wrapper: WrapperType,
) -> Result<Vec<u8>> {
    let config = DeflateConfig::new().with_level(level).with_wrapper(wrapper);
    Deflater::new(config)?.compress_all(data)
}

/// Decompress a complete stream in one call.
///
/// [`WrapperType::Any`] accepts zlib, gzip and raw input.
pub fn decompress(data: &[u8], wrapper: WrapperType) -> Result<Vec<u8>> {
    Inflater::new(InflateConfig::new().with_wrapper(wrapper))?.decompress_all(data)
}
