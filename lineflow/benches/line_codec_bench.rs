//! Benchmarks for line decoding.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use lineflow::pipeline::codec::LineDecoder;

fn sample_input(lines: usize) -> Vec<u8> {
    (0..lines)
        .map(|i| format!("line {i} with some payload text\r\n"))
        .collect::<String>()
        .into_bytes()
}

fn decode_benchmark(c: &mut Criterion) {
    let input = sample_input(10_000);
    let mut group = c.benchmark_group("line_decoder");
    group.throughput(Throughput::Bytes(input.len() as u64));

    for chunk_size in [64usize, 8192] {
        group.bench_function(format!("chunk_{chunk_size}"), |b| {
            b.iter(|| {
                let mut decoder = LineDecoder::new();
                let mut count = 0;
                for chunk in input.chunks(chunk_size) {
                    count += decoder.push(black_box(chunk)).len();
                }
                count += usize::from(decoder.finish().is_some());
                black_box(count)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, decode_benchmark);
criterion_main!(benches);
