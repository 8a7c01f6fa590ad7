//! Benchmarks for the full comparison and the stages after divergence.
//!
//! Measures:
//! - Diamond binning
//! - Shift list and balance projection
//! - The whole facade, reference-only and with the accelerated backend

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use allotax::{
    balance, combine, diamond_bin, divergence, shift_list, Allotaxonograph, Alpha, BackendMode,
    ComparisonConfig, ElementRecord,
};

const SIZES: [usize; 3] = [1_000, 10_000, 50_000];

fn system(n: usize, offset: usize, scale: usize) -> Vec<ElementRecord> {
    (offset..offset + n)
        .map(|i| ElementRecord::new(format!("w{i}"), (n * scale / (i - offset + 1)) as f64))
        .collect()
}

// =============================================================================
// Stages
// =============================================================================

fn bench_stages(c: &mut Criterion) {
    let mut group = c.benchmark_group("stages");

    for n in SIZES {
        let a = system(n, 0, 4);
        let b = system(n, n / 2, 3);
        let combined = combine(&a, &b).unwrap_or_else(|err| unreachable!("{err}"));
        let rtd = divergence(&combined, Alpha::STANDARD);
        let bins = diamond_bin(&combined, &rtd);
        group.throughput(Throughput::Elements(combined[0].len() as u64));

        group.bench_with_input(BenchmarkId::new("diamond_bin", n), &n, |bench, _| {
            bench.iter(|| black_box(diamond_bin(black_box(&combined), black_box(&rtd))));
        });

        group.bench_with_input(BenchmarkId::new("shift_list", n), &n, |bench, _| {
            bench.iter(|| black_box(shift_list(black_box(&combined), black_box(&bins))));
        });

        group.bench_with_input(BenchmarkId::new("balance", n), &n, |bench, _| {
            bench.iter(|| black_box(balance(black_box(&a), black_box(&b))));
        });
    }

    group.finish();
}

// =============================================================================
// Full comparison
// =============================================================================

fn bench_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare");
    group.sample_size(20);

    let reference =
        Allotaxonograph::new(ComparisonConfig::default().with_backend(BackendMode::Reference));
    let auto = Allotaxonograph::new(ComparisonConfig::default());

    for n in SIZES {
        let a = system(n, 0, 4);
        let b = system(n, n / 2, 3);
        group.throughput(Throughput::Elements((n + n / 2) as u64));

        group.bench_with_input(BenchmarkId::new("reference", n), &n, |bench, _| {
            bench.iter(|| black_box(reference.compare(black_box(&a), black_box(&b))));
        });

        group.bench_with_input(BenchmarkId::new("auto", n), &n, |bench, _| {
            bench.iter(|| black_box(auto.compare(black_box(&a), black_box(&b))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_stages, bench_compare);
criterion_main!(benches);
