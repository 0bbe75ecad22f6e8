//! Streaming behaviour across wrappers, flush modes and session operations.

use oxiflate_core::{CompressionLevel, Crc32, FlushMode, ReturnCode};
use oxiflate_deflate::{
    DeflateConfig, GzipHeader, InflateConfig, Strategy, Stream, WrapperType, compress, decompress,
};
use rstest::rstest;

fn pseudo_random(len: usize, mut seed: u64) -> Vec<u8> {
    (0..len)
        .map(|_| {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) as u8
        })
        .collect()
}

fn text(len: usize) -> Vec<u8> {
    let words: &[&[u8]] = &[
        b"stream", b"window", b"block", b"huffman", b"match", b"literal", b"flush", b"the",
        b"of", b"and", b"distance", b"length",
    ];
    let mut seed = 7u32;
    let mut data = Vec::with_capacity(len + 16);
    while data.len() < len {
        seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        data.extend_from_slice(words[(seed >> 16) as usize % words.len()]);
        data.push(b' ');
    }
    data.truncate(len);
    data
}

fn deflater(wrapper: WrapperType) -> Stream {
    Stream::deflate(DeflateConfig::new().with_wrapper(wrapper)).unwrap()
}

fn inflater(wrapper: WrapperType) -> Stream {
    Stream::inflate(InflateConfig::new().with_wrapper(wrapper)).unwrap()
}

/// Drive a session to the end of the stream with fixed-size buffers.
fn drive(
    stream: &mut Stream,
    input: &[u8],
    chunk_in: usize,
    chunk_out: usize,
    flush: FlushMode,
) -> (Vec<u8>, ReturnCode) {
    let mut output = Vec::new();
    let mut pos = 0;
    let mut out = vec![0u8; chunk_out];
    loop {
        let end = (pos + chunk_in).min(input.len());
        let last = end == input.len();
        let mode = if last { flush } else { FlushMode::None };
        let progress = stream.process(&input[pos..end], &mut out, mode);
        pos += progress.consumed;
        output.extend_from_slice(&out[..progress.produced]);
        match progress.code {
            ReturnCode::Ok => {}
            ReturnCode::BufError if !last || progress.produced > 0 => {}
            code => return (output, code),
        }
    }
}

#[rstest]
fn test_roundtrip_matrix(
    #[values(WrapperType::Raw, WrapperType::Zlib, WrapperType::Gzip)] wrapper: WrapperType,
    #[values(0, 1, 3, 4, 6, 9)] level: u8,
    #[values(
        Strategy::Default,
        Strategy::Filtered,
        Strategy::HuffmanOnly,
        Strategy::Rle,
        Strategy::Fixed
    )]
    strategy: Strategy,
) {
    let mut data = text(40_000);
    data.extend(pseudo_random(5_000, u64::from(level)));
    data.extend(std::iter::repeat_n(b'z', 3_000));

    let config = DeflateConfig::new()
        .with_level(level)
        .with_strategy(strategy)
        .with_wrapper(wrapper);
    let mut deflate = Stream::deflate(config).unwrap();
    let (compressed, code) = drive(&mut deflate, &data, 4096, 4096, FlushMode::Finish);
    assert_eq!(code, ReturnCode::StreamEnd);
    assert!(compressed.len() <= deflate.bound(data.len()));

    let mut inflate = inflater(wrapper);
    let (decompressed, code) = drive(&mut inflate, &compressed, 1000, 3000, FlushMode::None);
    assert_eq!(code, ReturnCode::StreamEnd);
    assert_eq!(decompressed, data);
    assert_eq!(inflate.total_in(), compressed.len() as u64);
    assert_eq!(inflate.total_out(), data.len() as u64);
}

#[rstest]
#[case(WrapperType::Zlib, WrapperType::Zlib, true)]
#[case(WrapperType::Zlib, WrapperType::Any, true)]
#[case(WrapperType::Gzip, WrapperType::Gzip, true)]
#[case(WrapperType::Gzip, WrapperType::Any, true)]
#[case(WrapperType::Raw, WrapperType::Raw, true)]
#[case(WrapperType::Raw, WrapperType::Any, true)]
#[case(WrapperType::Zlib, WrapperType::Gzip, false)]
#[case(WrapperType::Gzip, WrapperType::Zlib, false)]
#[case(WrapperType::Zlib, WrapperType::Raw, false)]
#[case(WrapperType::Gzip, WrapperType::Raw, false)]
#[case(WrapperType::Raw, WrapperType::Gzip, false)]
#[case(WrapperType::Raw, WrapperType::Zlib, false)]
fn test_wrapper_negotiation(
    #[case] encoder: WrapperType,
    #[case] decoder: WrapperType,
    #[case] compatible: bool,
) {
    let compressed = compress(b"hello", 6, encoder).unwrap();
    let mut inflate = inflater(decoder);
    let mut out = [0u8; 64];
    let progress = inflate.process(&compressed, &mut out, FlushMode::Finish);

    if compatible {
        assert_eq!(progress.code, ReturnCode::StreamEnd);
        assert_eq!(&out[..progress.produced], b"hello");
    } else {
        assert_eq!(progress.code, ReturnCode::DataError);
        assert!(inflate.message().is_some());
    }
}

#[rstest]
#[case(WrapperType::Zlib)]
#[case(WrapperType::Gzip)]
fn test_window_bits_auto_detect(#[case] wrapper: WrapperType) {
    let compressed = compress(b"detect me", 9, wrapper).unwrap();
    let config = InflateConfig::new().with_zlib_window_bits(15 + 32).unwrap();
    let mut inflate = Stream::inflate(config).unwrap();
    let mut out = [0u8; 32];
    let progress = inflate.process(&compressed, &mut out, FlushMode::None);
    assert_eq!(progress.code, ReturnCode::StreamEnd);
    assert_eq!(&out[..progress.produced], b"detect me");
}

#[test]
fn test_known_gzip_vector() {
    let data = [
        0x1f, 0x8b, 0x08, 0x18, 0x08, 0xeb, 0x7a, 0x0b, 0x00, 0x0b, 0x58, 0x00, 0x59, 0x00,
        0x4b, 0xcb, 0xcf, 0x07, 0x00, 0x21, 0x65, 0x73, 0x8c, 0x03, 0x00, 0x00, 0x00,
    ];
    let mut inflate = inflater(WrapperType::Any);
    let mut out = [0u8; 16];
    let progress = inflate.process(&data, &mut out, FlushMode::Finish);

    assert_eq!(progress.code, ReturnCode::StreamEnd);
    assert_eq!(&out[..progress.produced], b"foo");
    let header = inflate.gzip_header().expect("header read");
    assert_eq!(header.name.as_deref(), Some(&b"X"[..]));
    assert_eq!(header.comment.as_deref(), Some(&b"Y"[..]));
    assert_eq!(header.mtime, 0x0b7a_eb08);
}

#[test]
fn test_gzip_name_and_comment_roundtrip() {
    let data = text(10_000);
    let mut deflate = deflater(WrapperType::Gzip);
    let header = GzipHeader::new()
        .with_name("payload.txt")
        .with_comment("generated text")
        .with_mtime(1_700_000_000)
        .with_header_crc(true);
    assert_eq!(deflate.set_gzip_header(header), ReturnCode::Ok);
    let (compressed, code) = drive(
        &mut deflate,
        &data,
        data.len(),
        64 * 1024,
        FlushMode::Finish,
    );
    assert_eq!(code, ReturnCode::StreamEnd);

    let trailer = &compressed[compressed.len() - 8..];
    assert_eq!(trailer[..4], Crc32::checksum(&data).to_le_bytes());
    assert_eq!(trailer[4..], (data.len() as u32).to_le_bytes());

    let mut inflate = inflater(WrapperType::Gzip);
    let (decompressed, code) = drive(&mut inflate, &compressed, 333, 1000, FlushMode::None);
    assert_eq!(code, ReturnCode::StreamEnd);
    assert_eq!(decompressed, data);

    let header = inflate.gzip_header().expect("header read");
    assert_eq!(header.name.as_deref(), Some(&b"payload.txt"[..]));
    assert_eq!(header.comment.as_deref(), Some(&b"generated text"[..]));
    assert_eq!(header.mtime, 1_700_000_000);
}

#[test]
fn test_gzip_header_only_before_first_call() {
    let mut zlib = Stream::deflate(DeflateConfig::new()).unwrap();
    assert_eq!(
        zlib.set_gzip_header(GzipHeader::new()),
        ReturnCode::StreamError
    );

    let mut gzip = deflater(WrapperType::Gzip);
    let mut out = [0u8; 64];
    gzip.process(b"x", &mut out, FlushMode::None);
    assert_eq!(
        gzip.set_gzip_header(GzipHeader::new()),
        ReturnCode::StreamError
    );
}

#[test]
fn test_preset_dictionary() {
    let dictionary = b"the quick brown fox jumps over the lazy dog";
    let data = b"the lazy dog jumps over the quick brown fox";

    let mut deflate = Stream::deflate(DeflateConfig::new()).unwrap();
    assert_eq!(deflate.set_dictionary(dictionary), ReturnCode::Ok);
    let mut compressed = vec![0u8; 128];
    let progress = deflate.process(data, &mut compressed, FlushMode::Finish);
    assert_eq!(progress.code, ReturnCode::StreamEnd);
    compressed.truncate(progress.produced);
    assert_eq!(deflate.set_dictionary(dictionary), ReturnCode::StreamError);

    // Without the dictionary the stream pauses
    let mut inflate = Stream::inflate(InflateConfig::new()).unwrap();
    let mut out = [0u8; 128];
    let first = inflate.process(&compressed, &mut out, FlushMode::None);
    assert_eq!(first.code, ReturnCode::NeedDict);
    assert_eq!(
        inflate.adler(),
        oxiflate_core::Adler32::checksum(dictionary)
    );

    // A wrong dictionary is a data error and the pause continues
    assert_eq!(inflate.set_dictionary(b"not it"), ReturnCode::DataError);
    assert_eq!(inflate.set_dictionary(dictionary), ReturnCode::Ok);

    let rest = inflate.process(&compressed[first.consumed..], &mut out, FlushMode::None);
    assert_eq!(rest.code, ReturnCode::StreamEnd);
    assert_eq!(&out[..rest.produced], data);

    // A configured dictionary is installed on demand
    let config = InflateConfig::new().with_dictionary(dictionary.to_vec());
    let mut inflate = Stream::inflate(config).unwrap();
    let progress = inflate.process(&compressed, &mut out, FlushMode::None);
    assert_eq!(progress.code, ReturnCode::StreamEnd);
    assert_eq!(&out[..progress.produced], data);
}

#[test]
fn test_raw_dictionary() {
    let dictionary = b"raw streams share history out of band";
    let data = b"raw streams share history";
    let config = DeflateConfig::new()
        .with_wrapper(WrapperType::Raw)
        .with_dictionary(dictionary.to_vec());
    let mut deflate = Stream::deflate(config).unwrap();
    let mut compressed = vec![0u8; 128];
    let progress = deflate.process(data, &mut compressed, FlushMode::Finish);
    compressed.truncate(progress.produced);

    let mut inflate = inflater(WrapperType::Raw);
    assert_eq!(inflate.set_dictionary(dictionary), ReturnCode::Ok);
    let mut out = [0u8; 64];
    let progress = inflate.process(&compressed, &mut out, FlushMode::None);
    assert_eq!(progress.code, ReturnCode::StreamEnd);
    assert_eq!(&out[..progress.produced], data);
    assert_eq!(inflate.set_dictionary(dictionary), ReturnCode::StreamError);
}

#[test]
fn test_gzip_rejects_dictionary() {
    let mut deflate = deflater(WrapperType::Gzip);
    assert_eq!(deflate.set_dictionary(b"dict"), ReturnCode::StreamError);
}

#[test]
fn test_sync_after_corruption() {
    let mut deflate = Stream::deflate(DeflateConfig::new()).unwrap();
    let mut compressed = vec![0u8; 64];
    let first = deflate.process(b"hel", &mut compressed, FlushMode::Full);
    assert_eq!(first.code, ReturnCode::Ok);
    let mut tail = vec![0u8; 64];
    let second = deflate.process(b"lo", &mut tail, FlushMode::Finish);
    assert_eq!(second.code, ReturnCode::StreamEnd);
    compressed.truncate(first.produced);
    compressed.extend_from_slice(&tail[..second.produced]);

    compressed[3] ^= 0xFF;

    let mut inflate = Stream::inflate(InflateConfig::new()).unwrap();
    let mut out = [0u8; 64];
    let header = inflate.process(&compressed[..2], &mut out, FlushMode::None);
    assert_eq!(header.code, ReturnCode::Ok);
    assert_eq!(header.consumed, 2);

    let sync = inflate.sync(&compressed[2..]);
    assert_eq!(sync.code, ReturnCode::Ok);
    assert_eq!(2 + sync.consumed, first.produced);

    // The trailer checks "hello", but only "lo" follows the sync point
    let resumed = inflate.process(
        &compressed[2 + sync.consumed..],
        &mut out,
        FlushMode::Finish,
    );
    assert_eq!(resumed.code, ReturnCode::DataError);
    assert_eq!(&out[..resumed.produced], b"lo");
}

#[test]
fn test_sync_skips_corrupt_flush_segment() {
    let parts: [(&[u8], FlushMode); 3] = [
        (b"first part ", FlushMode::Full),
        (b"second part ", FlushMode::Full),
        (b"third part recovered", FlushMode::Finish),
    ];
    let mut deflate = deflater(WrapperType::Raw);
    let mut segments = Vec::new();
    for (data, flush) in parts {
        let mut out = vec![0u8; 256];
        let progress = deflate.process(data, &mut out, flush);
        assert_eq!(progress.consumed, data.len());
        out.truncate(progress.produced);
        segments.push(out);
    }
    let (first, second, third) = (&segments[0], &segments[1], &segments[2]);

    // Damage the block right after the first marker
    let mut damaged = second.clone();
    damaged[0] ^= 0xFF;

    let mut inflate = inflater(WrapperType::Raw);
    let mut out = [0u8; 64];
    let before = inflate.process(first, &mut out, FlushMode::None);
    assert_eq!(before.code, ReturnCode::Ok);
    assert_eq!(&out[..before.produced], b"first part ");

    let sync = inflate.sync(&damaged);
    assert_eq!(sync.code, ReturnCode::Ok);
    assert_eq!(sync.consumed, damaged.len());

    let after = inflate.process(third, &mut out, FlushMode::Finish);
    assert_eq!(after.code, ReturnCode::StreamEnd);
    assert_eq!(&out[..after.produced], b"third part recovered");
}

#[rstest]
#[case(WrapperType::Raw)]
#[case(WrapperType::Zlib)]
#[case(WrapperType::Gzip)]
fn test_exact_output_buffer_reaches_stream_end(#[case] wrapper: WrapperType) {
    let data = b"hello, hello!";
    let compressed = compress(data, 6, wrapper).unwrap();

    let mut inflate = inflater(wrapper);
    let mut out = [0u8; 13];
    let progress = inflate.process(&compressed, &mut out, FlushMode::Finish);
    assert_eq!(progress.code, ReturnCode::StreamEnd);
    assert_eq!(progress.consumed, compressed.len());
    assert_eq!(progress.produced, data.len());
    assert_eq!(&out, data);

    // Trailing calls with no output space still see the end
    let mut none = [0u8; 0];
    let again = inflate.process(&[], &mut none, FlushMode::Finish);
    assert_eq!(again.code, ReturnCode::StreamEnd);
}

#[test]
fn test_sync_without_marker() {
    let mut inflate = inflater(WrapperType::Raw);
    let progress = inflate.sync(&[1, 2, 3, 4, 5]);
    assert_eq!(progress.code, ReturnCode::DataError);
    assert_eq!(progress.consumed, 5);
    assert_eq!(inflate.total_in(), 5);
    assert_eq!(inflate.sync(&[]).code, ReturnCode::BufError);
}

#[test]
fn test_set_params_mid_stream() {
    let data = text(30_000);
    let mut deflate = Stream::deflate(DeflateConfig::new().with_level(1)).unwrap();
    let mut compressed = Vec::new();
    let mut out = vec![0u8; 64 * 1024];

    let progress = deflate.process(&data[..10_000], &mut out, FlushMode::None);
    compressed.extend_from_slice(&out[..progress.produced]);
    assert_eq!(progress.consumed, 10_000);

    assert_eq!(
        deflate.set_params(CompressionLevel::NONE, Strategy::Default),
        ReturnCode::Ok
    );
    let progress = deflate.process(&data[10_000..20_000], &mut out, FlushMode::None);
    compressed.extend_from_slice(&out[..progress.produced]);
    assert_eq!(progress.consumed, 10_000);

    assert_eq!(
        deflate.set_params(CompressionLevel::BEST, Strategy::Filtered),
        ReturnCode::Ok
    );
    let progress = deflate.process(&data[20_000..], &mut out, FlushMode::Finish);
    compressed.extend_from_slice(&out[..progress.produced]);
    assert_eq!(progress.code, ReturnCode::StreamEnd);

    assert_eq!(decompress(&compressed, WrapperType::Zlib).unwrap(), data);
}

#[test]
fn test_byte_granular_resumability() {
    let data = text(3_000);
    let mut deflate = deflater(WrapperType::Gzip);
    let (compressed, code) = drive(&mut deflate, &data, 1, 1, FlushMode::Finish);
    assert_eq!(code, ReturnCode::StreamEnd);
    assert_eq!(deflate.total_in(), data.len() as u64);
    assert_eq!(deflate.total_out(), compressed.len() as u64);

    let mut inflate = inflater(WrapperType::Gzip);
    let (decompressed, code) = drive(&mut inflate, &compressed, 1, 1, FlushMode::None);
    assert_eq!(code, ReturnCode::StreamEnd);
    assert_eq!(decompressed, data);
    assert_eq!(inflate.total_in(), compressed.len() as u64);
    assert_eq!(inflate.total_out(), data.len() as u64);
}

#[rstest]
#[case(FlushMode::Partial)]
#[case(FlushMode::Sync)]
#[case(FlushMode::Full)]
fn test_flush_makes_prefix_decodable(#[case] flush: FlushMode) {
    let mut deflate = deflater(WrapperType::Raw);
    let mut out = vec![0u8; 1024];
    let progress = deflate.process(b"first part, ", &mut out, flush);
    assert_eq!(progress.code, ReturnCode::Ok);

    let mut inflate = inflater(WrapperType::Raw);
    let mut decoded = [0u8; 64];
    let partial = inflate.process(&out[..progress.produced], &mut decoded, FlushMode::None);
    assert_eq!(partial.code, ReturnCode::Ok);
    assert_eq!(&decoded[..partial.produced], b"first part, ");

    let mut tail = vec![0u8; 1024];
    let finish = deflate.process(b"first part, again", &mut tail, FlushMode::Finish);
    assert_eq!(finish.code, ReturnCode::StreamEnd);
    let rest = inflate.process(&tail[..finish.produced], &mut decoded, FlushMode::Finish);
    assert_eq!(rest.code, ReturnCode::StreamEnd);
    assert_eq!(&decoded[..rest.produced], b"first part, again");
}

#[test]
fn test_buf_error_rules() {
    let mut deflate = Stream::deflate(DeflateConfig::new()).unwrap();
    let mut empty = [0u8; 0];
    assert_eq!(deflate.process(b"x", &mut empty, FlushMode::None).code, ReturnCode::BufError);

    let mut out = [0u8; 64];
    assert_eq!(deflate.process(b"x", &mut out, FlushMode::Sync).code, ReturnCode::Ok);
    assert_eq!(
        deflate.process(&[], &mut out, FlushMode::None).code,
        ReturnCode::BufError
    );
    assert_eq!(
        deflate.process(&[], &mut out, FlushMode::Full).code,
        ReturnCode::Ok
    );
    assert_eq!(
        deflate.process(&[], &mut out, FlushMode::Finish).code,
        ReturnCode::StreamEnd
    );

    let compressed = compress(b"finish early", 6, WrapperType::Zlib).unwrap();
    let mut inflate = Stream::inflate(InflateConfig::new()).unwrap();
    let half = compressed.len() / 2;
    let progress = inflate.process(&compressed[..half], &mut out, FlushMode::Finish);
    assert_eq!(progress.code, ReturnCode::BufError);
    assert_eq!(progress.consumed, half);
}

#[rstest]
#[case::bad_block_type(vec![0x07, 0x00])]
#[case::stored_length_mismatch(vec![0x01, 0x04, 0x00, 0x04, 0x00, 1, 2, 3, 4])]
#[case::too_many_symbols(vec![0xFD, 0xFF, 0xFF, 0xFF])]
#[case::distance_too_far(vec![0x03, 0x02, 0x00])]
fn test_corrupt_raw_streams(#[case] data: Vec<u8>) {
    let mut inflate = inflater(WrapperType::Raw);
    let mut out = [0u8; 64];
    let progress = inflate.process(&data, &mut out, FlushMode::Finish);
    assert_eq!(progress.code, ReturnCode::DataError, "{:?}", inflate.message());

    // The session stays failed
    assert_eq!(
        inflate.process(&data, &mut out, FlushMode::Finish).code,
        ReturnCode::DataError
    );
}

#[test]
fn test_mutated_streams_never_panic() {
    let data = text(4_000);
    for wrapper in [WrapperType::Raw, WrapperType::Zlib, WrapperType::Gzip] {
        let compressed = compress(&data, 6, wrapper).unwrap();
        let noise = pseudo_random(compressed.len() * 2, 99);
        for (i, pair) in noise.chunks(2).enumerate().step_by(7) {
            let mut mutated = compressed.clone();
            mutated[i] ^= pair[0] | 1;
            let _ = decompress(&mutated, WrapperType::Any);
        }
        // Truncated trailer
        let truncated = &compressed[..compressed.len() - 3];
        assert!(decompress(truncated, wrapper).is_err());
    }
}

#[test]
fn test_reset_reuses_session() {
    let mut deflate = Stream::deflate(DeflateConfig::new()).unwrap();
    let mut first = vec![0u8; 256];
    let a = deflate.process(b"same input", &mut first, FlushMode::Finish);
    assert_eq!(deflate.reset(), ReturnCode::Ok);
    assert_eq!(deflate.total_in(), 0);
    let mut second = vec![0u8; 256];
    let b = deflate.process(b"same input", &mut second, FlushMode::Finish);
    assert_eq!(first[..a.produced], second[..b.produced]);
}
