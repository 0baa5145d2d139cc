//! Writer throughput benchmarks.
//!
//! - Whole-stream compression at different block sizes
//! - Data patterns from incompressible to all-runs
//! - Scaling with the number of encode workers
//! - The per-block stages on their own
//! - Rotation sorting: block levels, periodic input, the parallel sort cutover

use bzwrite::{BlockEncoder, BlockSize, Book, BzWriter, WriterOptions, bwt, compress, mtf, rle};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

/// Type alias for pattern generator functions
type PatternGenerator = fn(usize) -> Vec<u8>;

mod test_data {
    /// Uniform data - all bytes are the same (best for RLE)
    pub fn uniform(size: usize) -> Vec<u8> {
        vec![0xAA; size]
    }

    /// Random data - no patterns (worst compression)
    pub fn random(size: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(size);
        let mut seed: u64 = 0x123456789ABCDEF0;
        for _ in 0..size {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            data.push((seed >> 32) as u8);
        }
        data
    }

    /// Repetitive pattern - long repeats, hardest case for rotation sorting
    pub fn repetitive(size: usize) -> Vec<u8> {
        let pattern = b"TOBEORNOTTOBEORTOBEORNOT";
        let mut data = Vec::with_capacity(size);
        while data.len() < size {
            let remaining = size - data.len();
            let chunk_size = remaining.min(pattern.len());
            data.extend_from_slice(&pattern[..chunk_size]);
        }
        data
    }

    /// Text-like data
    pub fn text_like(size: usize) -> Vec<u8> {
        let words: &[&[u8]] = &[
            b"the", b"quick", b"brown", b"fox", b"jumps", b"over", b"lazy", b"dog", b"pack",
            b"my", b"box", b"with", b"five", b"dozen", b"liquor", b"jugs",
        ];
        let mut data = Vec::with_capacity(size);
        let mut seed = 42u32;
        while data.len() < size {
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            data.extend_from_slice(words[(seed >> 8) as usize % words.len()]);
            data.push(if seed % 13 == 0 { b'\n' } else { b' ' });
        }
        data.truncate(size);
        data
    }
}

mod data_sizes {
    pub const SMALL: usize = 10 * 1024;
    pub const MEDIUM: usize = 256 * 1024;
    pub const LARGE: usize = 4 * 1024 * 1024;
}

fn bench_block_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_sizes");
    group.sample_size(10);

    let data = test_data::text_like(data_sizes::LARGE);
    group.throughput(Throughput::Bytes(data.len() as u64));

    for level in [1, 5, 9] {
        let block_size = BlockSize::new(level).unwrap();
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("level_{}", level)),
            &data,
            |b, data| {
                b.iter(|| black_box(compress(black_box(data), block_size).unwrap()));
            },
        );
    }

    group.finish();
}

fn bench_data_types(c: &mut Criterion) {
    let mut group = c.benchmark_group("data_types");

    let patterns: [(&str, PatternGenerator); 4] = [
        ("uniform", test_data::uniform as PatternGenerator),
        ("random", test_data::random as PatternGenerator),
        ("repetitive", test_data::repetitive as PatternGenerator),
        ("text", test_data::text_like as PatternGenerator),
    ];

    let block_size = BlockSize::new(1).unwrap();
    for (pattern_name, generator) in patterns {
        let data = generator(data_sizes::MEDIUM);

        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(pattern_name),
            &data,
            |b, data| {
                b.iter(|| black_box(compress(black_box(data), block_size).unwrap()));
            },
        );
    }

    group.finish();
}

fn bench_workers(c: &mut Criterion) {
    let mut group = c.benchmark_group("workers");
    group.sample_size(10);

    let data = test_data::text_like(data_sizes::LARGE);
    group.throughput(Throughput::Bytes(data.len() as u64));

    for workers in [1, 2, 4, 8] {
        let options = WriterOptions::new()
            .with_block_size(BlockSize::new(1).unwrap())
            .with_workers(workers);
        group.bench_with_input(BenchmarkId::from_parameter(workers), &data, |b, data| {
            b.iter(|| {
                let mut writer = BzWriter::with_options(Vec::new(), options.clone()).unwrap();
                for chunk in data.chunks(64 * 1024) {
                    writer.write(black_box(chunk)).unwrap();
                }
                black_box(writer.finish().unwrap())
            });
        });
    }

    group.finish();
}

fn bench_stages(c: &mut Criterion) {
    let mut group = c.benchmark_group("stages");

    let data = test_data::text_like(data_sizes::SMALL * 10);
    let rle_bytes = rle::rle1_finish(&data);
    let (transformed, _) = bwt::transform(&rle_bytes);
    let (_, positions) = mtf::transform(&transformed);

    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("rle1", |b| b.iter(|| black_box(rle::rle1_finish(black_box(&data)))));
    group.bench_function("bwt", |b| b.iter(|| black_box(bwt::transform(black_box(&rle_bytes)))));
    group.bench_function("mtf", |b| b.iter(|| black_box(mtf::transform(black_box(&transformed)))));
    group.bench_function("zero_runs", |b| {
        b.iter(|| black_box(rle::encode_zero_runs(black_box(&positions)).unwrap()))
    });
    group.bench_function("block", |b| {
        b.iter(|| {
            let mut block = BlockEncoder::new(0, rle_bytes.len());
            block.write(black_box(&rle_bytes));
            black_box(block.encode().unwrap())
        })
    });

    let mut freqs = vec![0u32; 258];
    for (i, f) in freqs.iter_mut().enumerate() {
        *f = ((i * 7919) % 1000) as u32;
    }
    group.bench_function("huffman_book", |b| {
        b.iter(|| black_box(Book::build(black_box(&freqs)).unwrap()))
    });

    group.finish();
}

fn bench_bwt(c: &mut Criterion) {
    let mut group = c.benchmark_group("bwt");
    group.sample_size(10);

    // A full block at every level
    for level in 1..=9u8 {
        let data = test_data::text_like(BlockSize::new(level).unwrap().capacity());
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("text", level), &data, |b, data| {
            b.iter(|| black_box(bwt::transform(black_box(data))))
        });
    }

    // Periodic input keeps rotations tied through every doubling round
    for level in [1u8, 9] {
        let data = test_data::repetitive(BlockSize::new(level).unwrap().capacity());
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("periodic", level), &data, |b, data| {
            b.iter(|| black_box(bwt::transform(black_box(data))))
        });
    }

    // Either side of the switch to rayon's parallel sort
    for size in [(1 << 16) - 1, 1 << 16] {
        let data = test_data::random(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("sort_cutover", size), &data, |b, data| {
            b.iter(|| black_box(bwt::transform(black_box(data))))
        });
    }

    let data = test_data::text_like(BlockSize::default().capacity());
    let (transformed, origin) = bwt::transform(&data);
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("inverse", |b| {
        b.iter(|| black_box(bwt::inverse_transform(black_box(&transformed), origin)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_block_sizes,
    bench_data_types,
    bench_workers,
    bench_stages,
    bench_bwt,
);
criterion_main!(benches);
