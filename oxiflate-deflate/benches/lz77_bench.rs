//! Benchmarks for the LZ77 matcher on its own, without block encoding.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use oxiflate_core::{FlushMode, StreamBuffers};
use oxiflate_deflate::deflate::Strategy;
use oxiflate_deflate::lz77::{Lz77Matcher, MatchParams, Parse};
use oxiflate_deflate::wrapper::{RunningCheck, WrapperType};
use std::hint::black_box;

fn generate_random(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut seed = 12345u32;
    for _ in 0..size {
        seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        data.push((seed >> 16) as u8);
    }
    data
}

fn generate_repeated(size: usize) -> Vec<u8> {
    let pattern = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    pattern.iter().copied().cycle().take(size).collect()
}

fn generate_text_like(size: usize) -> Vec<u8> {
    let words: &[&[u8]] = &[
        b"the", b"quick", b"brown", b"fox", b"jumps", b"over", b"lazy", b"dog", b"and",
        b"runs", b"away", b"from", b"hunter", b"who", b"is", b"chasing", b"it",
    ];
    let mut data = Vec::with_capacity(size + 16);
    let mut seed = 42u32;
    while data.len() < size {
        seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        data.extend_from_slice(words[(seed >> 16) as usize % words.len()]);
        data.push(b' ');
    }
    data.truncate(size);
    data
}

/// Parse all of `data`, returning the number of tokens produced.
fn parse_all(matcher: &mut Lz77Matcher, data: &[u8]) -> usize {
    matcher.reset();
    let mut check = RunningCheck::for_wrapper(WrapperType::Raw);
    let mut sink = [0u8; 0];
    let mut buf = StreamBuffers::new(data, &mut sink);
    let mut tokens = 0;
    loop {
        let outcome = matcher.parse(&mut buf, &mut check, FlushMode::Finish);
        tokens += matcher.block().tokens.len();
        matcher.finish_block();
        if outcome == Parse::Drained {
            return tokens;
        }
    }
}

fn bench_lz77_levels(c: &mut Criterion) {
    let cases = [
        ("random", generate_random(256 * 1024)),
        ("repeated", generate_repeated(256 * 1024)),
        ("text", generate_text_like(256 * 1024)),
    ];

    for (name, data) in &cases {
        let mut group = c.benchmark_group(format!("lz77_{name}"));
        group.throughput(Throughput::Bytes(data.len() as u64));

        for level in [1u8, 5, 9] {
            let params = MatchParams::for_level(level, Strategy::Default);
            let Ok(mut matcher) = Lz77Matcher::new(15, 8, params, Strategy::Default) else {
                continue;
            };
            group.bench_with_input(BenchmarkId::new("level", level), data, |b, data| {
                b.iter(|| black_box(parse_all(&mut matcher, black_box(data))));
            });
        }

        group.finish();
    }
}

fn bench_lz77_strategies(c: &mut Criterion) {
    let data = generate_text_like(128 * 1024);
    let mut group = c.benchmark_group("lz77_strategies");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for strategy in [
        Strategy::Default,
        Strategy::Filtered,
        Strategy::HuffmanOnly,
        Strategy::Rle,
    ] {
        let params = MatchParams::for_level(6, strategy);
        let Ok(mut matcher) = Lz77Matcher::new(15, 8, params, strategy) else {
            continue;
        };
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{strategy:?}")),
            &data,
            |b, data| b.iter(|| black_box(parse_all(&mut matcher, black_box(data)))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_lz77_levels, bench_lz77_strategies);
criterion_main!(benches);
