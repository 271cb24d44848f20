//! Criterion benchmarks for the science exposure path.
//!
//! Every `GETSCIENCE` rescans the whole science log to find planet entries, so
//! the cost grows with the number of retained exposures. These benchmarks track:
//! - Recording a star exposure (no pruning) against logs of various sizes
//! - Recording a new planet that prunes all earlier planet entries
//!
//! Run with: cargo bench --bench dedup

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dark_hole_control::database::ExposureDatabase;
use dark_hole_control::fiber::{FiberPosition, DEFAULT_DIST_THRESHOLD_MAS};

/// Alternating star and same-planet exposures, `len` entries in total.
fn populated(len: usize) -> ExposureDatabase {
    let mut db = ExposureDatabase::new();
    for i in 0..len {
        let position = if i % 2 == 0 {
            FiberPosition::new(0.0, 0.0)
        } else {
            FiberPosition::new(25.0, (i % 5) as f64)
        };
        db.begin_science(position, DEFAULT_DIST_THRESHOLD_MAS);
    }
    db
}

fn star_exposure(c: &mut Criterion) {
    let mut group = c.benchmark_group("dedup_star");

    for len in [10, 100, 1_000] {
        let base = populated(len);
        group.bench_with_input(BenchmarkId::new("begin_science", len), &base, |b, base| {
            b.iter_batched(
                || base.clone(),
                |mut db| {
                    let position = black_box(FiberPosition::new(1.0, 1.0));
                    db.begin_science(position, DEFAULT_DIST_THRESHOLD_MAS)
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn new_planet_exposure(c: &mut Criterion) {
    let mut group = c.benchmark_group("dedup_new_planet");

    for len in [10, 100, 1_000] {
        let base = populated(len);
        group.bench_with_input(BenchmarkId::new("begin_science", len), &base, |b, base| {
            b.iter_batched(
                || base.clone(),
                |mut db| {
                    let position = black_box(FiberPosition::new(-40.0, 0.0));
                    db.begin_science(position, DEFAULT_DIST_THRESHOLD_MAS)
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, star_exposure, new_planet_exposure);
criterion_main!(benches);
