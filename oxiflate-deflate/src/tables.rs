//! Static code tables for DEFLATE (RFC 1951).
//!
//! Holds the length/distance base and extra-bit tables, the fixed Huffman
//! code lengths, and the reverse lookups the encoder uses to map a match
//! onto its length and distance symbols.

use crate::huffman::{HuffmanCode, HuffmanTree, canonical_codes};
use std::sync::OnceLock;

/// Largest payload of a single stored block.
pub const MAX_STORED_BLOCK: usize = 65535;

/// Fixed literal/length code lengths (RFC 1951 Section 3.2.6).
///
/// - Symbols 0-143: 8 bits
/// - Symbols 144-255: 9 bits
/// - Symbols 256-279: 7 bits
/// - Symbols 280-287: 8 bits
pub const fn fixed_litlen_lengths() -> [u8; 288] {
    let mut lengths = [8u8; 288];
    let mut i = 144;
    while i < 256 {
        lengths[i] = 9;
        i += 1;
    }
    while i < 280 {
        lengths[i] = 7;
        i += 1;
    }
    lengths
}

/// Fixed literal/length code lengths, all 288 symbols.
pub const FIXED_LITLEN_LENGTHS: [u8; 288] = fixed_litlen_lengths();

/// Fixed distance code lengths.
///
/// All 32 codes use 5 bits. Codes 30 and 31 never occur in valid data but
/// take part in the code so a decoder can recognize and reject them.
pub const FIXED_DISTANCE_LENGTHS: [u8; 32] = [5u8; 32];

/// Get the fixed literal/length decoding tree.
///
/// This tree is cached after first construction.
pub fn fixed_litlen_tree() -> &'static HuffmanTree {
    static TREE: OnceLock<HuffmanTree> = OnceLock::new();
    TREE.get_or_init(|| HuffmanTree::build(&FIXED_LITLEN_LENGTHS))
}

/// Get the fixed distance decoding tree.
///
/// This tree is cached after first construction.
pub fn fixed_distance_tree() -> &'static HuffmanTree {
    static TREE: OnceLock<HuffmanTree> = OnceLock::new();
    TREE.get_or_init(|| HuffmanTree::build(&FIXED_DISTANCE_LENGTHS))
}

/// Get the fixed literal/length codes, indexed by symbol.
pub fn fixed_litlen_codes() -> &'static [HuffmanCode] {
    static CODES: OnceLock<Vec<HuffmanCode>> = OnceLock::new();
    CODES.get_or_init(|| canonical_codes(&FIXED_LITLEN_LENGTHS))
}

/// Get the fixed distance codes, indexed by symbol.
pub fn fixed_distance_codes() -> &'static [HuffmanCode] {
    static CODES: OnceLock<Vec<HuffmanCode>> = OnceLock::new();
    CODES.get_or_init(|| canonical_codes(&FIXED_DISTANCE_LENGTHS))
}

/// Length code base values (RFC 1951 Section 3.2.5).
///
/// For length codes 257-285, this gives the base length value.
/// Extra bits are added to get the final length.
pub const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, // 257-264: 0 extra bits
    11, 13, 15, 17, // 265-268: 1 extra bit
    19, 23, 27, 31, // 269-272: 2 extra bits
    35, 43, 51, 59, // 273-276: 3 extra bits
    67, 83, 99, 115, // 277-280: 4 extra bits
    131, 163, 195, 227, // 281-284: 5 extra bits
    258, // 285: 0 extra bits (special case)
];

/// Number of extra bits for length codes 257-285.
pub const LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, // 257-264
    1, 1, 1, 1, // 265-268
    2, 2, 2, 2, // 269-272
    3, 3, 3, 3, // 273-276
    4, 4, 4, 4, // 277-280
    5, 5, 5, 5, // 281-284
    0, // 285
];

/// Distance code base values (RFC 1951 Section 3.2.5).
///
/// For distance codes 0-29, this gives the base distance value.
pub const DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, // 0-3: 0 extra bits
    5, 7, // 4-5: 1 extra bit
    9, 13, // 6-7: 2 extra bits
    17, 25, // 8-9: 3 extra bits
    33, 49, // 10-11: 4 extra bits
    65, 97, // 12-13: 5 extra bits
    129, 193, // 14-15: 6 extra bits
    257, 385, // 16-17: 7 extra bits
    513, 769, // 18-19: 8 extra bits
    1025, 1537, // 20-21: 9 extra bits
    2049, 3073, // 22-23: 10 extra bits
    4097, 6145, // 24-25: 11 extra bits
    8193, 12289, // 26-27: 12 extra bits
    16385, 24577, // 28-29: 13 extra bits
];

/// Number of extra bits for distance codes 0-29.
pub const DISTANCE_EXTRA_BITS: [u8; 30] = [
    0, 0, 0, 0, // 0-3
    1, 1, // 4-5
    2, 2, // 6-7
    3, 3, // 8-9
    4, 4, // 10-11
    5, 5, // 12-13
    6, 6, // 14-15
    7, 7, // 16-17
    8, 8, // 18-19
    9, 9, // 20-21
    10, 10, // 22-23
    11, 11, // 24-25
    12, 12, // 26-27
    13, 13, // 28-29
];

/// Order of code length codes in dynamic block header.
///
/// Code length codes are transmitted in this order (RFC 1951 Section 3.2.7).
pub const CODE_LENGTH_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Length code index (symbol - 257) for every match length 3-258,
/// indexed by `length - 3`.
pub const LENGTH_CODE: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut code = 0;
    while code < 28 {
        let base = LENGTH_BASE[code] as usize - 3;
        let span = 1usize << LENGTH_EXTRA_BITS[code];
        let mut i = 0;
        while i < span {
            table[base + i] = code as u8;
            i += 1;
        }
        code += 1;
    }
    // 258 has its own code even though 284 could reach it
    table[255] = 28;
    table
};

/// Distance code for every distance.
///
/// The first 256 entries are indexed by `distance - 1`. Longer distances use
/// entry `256 + ((distance - 1) >> 7)`.
pub const DIST_CODE: [u8; 512] = {
    let mut table = [0u8; 512];
    let mut code = 0;
    while code < 30 {
        let base = DISTANCE_BASE[code] as usize - 1;
        let extra = DISTANCE_EXTRA_BITS[code];
        let (start, span) = if code < 16 {
            (base, 1usize << extra)
        } else {
            (256 + (base >> 7), 1usize << (extra - 7))
        };
        let mut i = 0;
        while i < span {
            table[start + i] = code as u8;
            i += 1;
        }
        code += 1;
    }
    table
};

/// Convert a length value (3-258) to a length symbol (257-285).
///
/// # Returns
///
/// A tuple of (symbol, extra bit count, extra bit value).
#[inline]
pub fn length_to_code(length: usize) -> (u16, u8, u16) {
    debug_assert!((3..=258).contains(&length), "Length out of range: {length}");
    let index = usize::from(LENGTH_CODE[length - 3]);
    let extra_value = (length - usize::from(LENGTH_BASE[index])) as u16;
    (index as u16 + 257, LENGTH_EXTRA_BITS[index], extra_value)
}

/// Convert a distance value (1-32768) to a distance symbol (0-29).
///
/// # Returns
///
/// A tuple of (symbol, extra bit count, extra bit value).
#[inline]
pub fn distance_to_code(distance: usize) -> (u16, u8, u16) {
    debug_assert!(
        (1..=32768).contains(&distance),
        "Distance out of range: {distance}"
    );
    let d = distance - 1;
    let code = if d < 256 {
        DIST_CODE[d]
    } else {
        DIST_CODE[256 + (d >> 7)]
    };
    let index = usize::from(code);
    let extra_value = (distance - usize::from(DISTANCE_BASE[index])) as u16;
    (u16::from(code), DISTANCE_EXTRA_BITS[index], extra_value)
}

/// Decode a length from a length symbol and extra bits.
pub fn decode_length(code: u16, extra: u16) -> u16 {
    debug_assert!((257..=285).contains(&code), "Invalid length code: {code}");
    LENGTH_BASE[(code - 257) as usize] + extra
}

/// Decode a distance from a distance symbol and extra bits.
pub fn decode_distance(code: u16, extra: u16) -> u16 {
    debug_assert!(code < 30, "Invalid distance code: {code}");
    DISTANCE_BASE[code as usize] + extra
}
