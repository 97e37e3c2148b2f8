//! Benchmarks for the fused aggregation combiners

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use bitfold::{Aggregator, BitVector};

fn random_vectors(count: usize, bits_each: usize, seed: u64) -> Vec<BitVector> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let mut v = BitVector::new();
            for _ in 0..bits_each {
                v.set_bit(rng.gen_range(0..1 << 24), true);
            }
            v
        })
        .collect()
}

/// Fused OR against the horizontal pairwise reduction
fn bench_combine_or(c: &mut Criterion) {
    let mut group = c.benchmark_group("combine_or");
    for n in [2usize, 8, 32] {
        let vs = random_vectors(n, 2_000, 1);
        let refs: Vec<&BitVector> = vs.iter().collect();
        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(BenchmarkId::new("fused", n), &refs, |b, refs| {
            let mut agg = Aggregator::new();
            let mut target = BitVector::new();
            b.iter(|| {
                agg.combine_or_from(&mut target, black_box(refs)).unwrap();
            });
        });
        group.bench_with_input(BenchmarkId::new("horizontal", n), &refs, |b, refs| {
            let agg = Aggregator::new();
            let mut target = BitVector::new();
            b.iter(|| {
                agg.combine_or_horizontal(&mut target, black_box(refs));
            });
        });
    }
    group.finish();
}

fn bench_combine_and(c: &mut Criterion) {
    let mut group = c.benchmark_group("combine_and");
    for n in [2usize, 8, 32] {
        // overlapping inputs so the digest stays live
        let base = random_vectors(1, 4_000, 2).pop().unwrap();
        let vs: Vec<BitVector> = random_vectors(n, 500, 3)
            .into_iter()
            .map(|mut v| {
                v.bit_or(&base);
                v
            })
            .collect();
        let refs: Vec<&BitVector> = vs.iter().collect();
        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(BenchmarkId::new("fused", n), &refs, |b, refs| {
            let mut agg = Aggregator::new();
            let mut target = BitVector::new();
            b.iter(|| {
                agg.combine_and_from(&mut target, black_box(refs)).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_and_sub_any(c: &mut Criterion) {
    let vs = random_vectors(8, 2_000, 4);
    let refs: Vec<&BitVector> = vs.iter().collect();
    let subs = &refs[..2];

    let mut group = c.benchmark_group("combine_and_sub");
    group.bench_function("full", |b| {
        let mut agg = Aggregator::new();
        let mut target = BitVector::new();
        b.iter(|| {
            agg.combine_and_sub_from(&mut target, black_box(&refs[2..]), black_box(subs), false)
                .unwrap()
        });
    });
    group.bench_function("any", |b| {
        let mut agg = Aggregator::new();
        let mut target = BitVector::new();
        b.iter(|| {
            agg.combine_and_sub_from(&mut target, black_box(&refs[2..]), black_box(subs), true)
                .unwrap()
        });
    });
    group.finish();
}

fn bench_shift_right_and(c: &mut Criterion) {
    let vs = random_vectors(4, 2_000, 5);
    let refs: Vec<&BitVector> = vs.iter().collect();

    c.bench_function("combine_shift_right_and/4", |b| {
        let mut agg = Aggregator::new();
        let mut target = BitVector::new();
        b.iter(|| {
            agg.combine_shift_right_and_from(&mut target, black_box(&refs), false)
                .unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_combine_or,
    bench_combine_and,
    bench_and_sub_any,
    bench_shift_right_and
);
criterion_main!(benches);
