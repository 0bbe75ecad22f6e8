//! Edge case tests for DEFLATE compression.

use oxiflate_deflate::{WrapperType, compress, decompress};

fn roundtrip(input: &[u8], level: u8) -> Vec<u8> {
    let compressed = compress(input, level, WrapperType::Raw).unwrap();
    let decompressed = decompress(&compressed, WrapperType::Raw).unwrap();
    assert_eq!(decompressed, input, "level {level}");
    compressed
}

#[test]
fn test_empty_input() {
    let compressed = roundtrip(b"", 6);
    assert_eq!(compressed, [0x03, 0x00]);
}

#[test]
fn test_single_byte() {
    roundtrip(b"A", 6);
}

#[test]
fn test_all_zeros() {
    let input = vec![0u8; 1000];
    let compressed = roundtrip(&input, 6);
    // All zeros should compress very well
    assert!(compressed.len() < input.len() / 10);
}

#[test]
fn test_all_same_byte() {
    let input = vec![255u8; 5000];
    let compressed = roundtrip(&input, 6);
    assert!(compressed.len() < input.len() / 20);
}

#[test]
fn test_max_match_length() {
    // Runs longer than the 258-byte maximum match
    let input = vec![42u8; 258 * 10];
    roundtrip(&input, 9);
}

#[test]
fn test_all_literals() {
    let mut seed = 0x2545_F491_4F6C_DD1Du64;
    let input: Vec<u8> = (0..20_000)
        .map(|_| {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed as u8
        })
        .collect();
    for level in [1, 6, 9] {
        roundtrip(&input, level);
    }
}

#[test]
fn test_alternating_pattern() {
    let input: Vec<u8> = (0..1000)
        .map(|i| if i % 2 == 0 { b'A' } else { b'B' })
        .collect();
    roundtrip(&input, 6);
}

#[test]
fn test_large_input() {
    let pattern = b"The quick brown fox jumps over the lazy dog. ";
    let input: Vec<u8> = pattern.iter().copied().cycle().take(1024 * 1024).collect();
    let compressed = roundtrip(&input, 5);
    assert!(compressed.len() < input.len() / 50);
}

#[test]
fn test_incremental_pattern() {
    let input: Vec<u8> = (0..=255u8)
        .flat_map(|byte| std::iter::repeat_n(byte, 10))
        .collect();
    for level in [1, 6] {
        roundtrip(&input, level);
    }
}

#[test]
fn test_compression_levels() {
    let input = b"Hello, world! This is a test of DEFLATE compression with various levels.";

    for level in 0..=9 {
        let compressed = roundtrip(input, level);
        // Level 0 is stored blocks
        if level == 0 {
            assert_eq!(compressed.len(), input.len() + 5);
        }
    }
}

#[test]
fn test_binary_data() {
    let input: Vec<u8> = (0..=255).cycle().take(5000).collect();
    roundtrip(&input, 6);
}

#[test]
fn test_long_distance_match() {
    // A match close to the largest distance the window allows
    let mut input = vec![0u8; 32768];
    let pattern = b"PATTERN_TO_MATCH";
    input[..pattern.len()].copy_from_slice(pattern);
    input[32768 - 300..32768 - 300 + pattern.len()].copy_from_slice(pattern);
    for level in [1, 9] {
        roundtrip(&input, level);
    }
}

#[test]
fn test_utf8_text() {
    let input = "Grüße aus Köln. Ελληνικά κείμενα. 日本語のテキスト。 Grüße aus Köln!"
        .repeat(40)
        .into_bytes();
    for level in [1, 4, 9] {
        roundtrip(&input, level);
    }
}

#[test]
fn test_small_window() {
    use oxiflate_core::traits::{Compressor, Decompressor};
    use oxiflate_deflate::{DeflateConfig, Deflater, InflateConfig, Inflater};

    let input = b"small windows still round-trip ".repeat(100);
    for window_bits in [8, 9, 12] {
        let compressed = Deflater::new(DeflateConfig::new().with_window_bits(window_bits))
            .unwrap()
            .compress_all(&input)
            .unwrap();
        // The stream needs a 2^9 window even when 8 was asked for
        let decoder_bits = window_bits.max(9);
        let decompressed = Inflater::new(InflateConfig::new().with_window_bits(decoder_bits))
            .unwrap()
            .decompress_all(&compressed)
            .unwrap();
        assert_eq!(decompressed, input);
    }
}
