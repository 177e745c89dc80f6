//! Performance benchmarks for wsframe.
//!
//! Run with: `cargo bench`

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use wsframe::config::{DEFAULT_RECEIVE_CHUNK_SIZE, DEFAULT_SEND_CHUNK_SIZE};
use wsframe::connection::{ChunkSplitter, MessageAccumulator};
use wsframe::MessageKind;

const SIZES: [usize; 4] = [16, 4 * 1024, 64 * 1024, 1024 * 1024];

// =============================================================================
// Chunk Splitting Benchmarks
// =============================================================================

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split");

    for size in SIZES {
        let payload = vec![0xAB; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| {
                ChunkSplitter::new(black_box(payload), DEFAULT_SEND_CHUNK_SIZE)
                    .map(|chunk| chunk.data.len())
                    .sum::<usize>()
            })
        });
    }

    group.finish();
}

// =============================================================================
// Reassembly Benchmarks
// =============================================================================

fn bench_reassemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("reassemble");

    for size in SIZES {
        let payload = vec![0xCD; size];
        let mut accumulator = MessageAccumulator::new(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| {
                for chunk in ChunkSplitter::new(payload, DEFAULT_RECEIVE_CHUNK_SIZE) {
                    accumulator
                        .push(chunk.data, MessageKind::Binary, chunk.end_of_message)
                        .unwrap();
                }
                let len = black_box(accumulator.message()).len();
                accumulator.reset();
                len
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_split, bench_reassemble);
criterion_main!(benches);
