//! # Strategy Benchmarks
//!
//! Compares the reference aggregation strategies on the same input.
//!
//! Run: `cargo bench --bench strategy_bench`

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use groupwise_core::{AggregationStrategy, StrategyKind, WeightedVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategy_30x1024");

    let mut rng = StdRng::seed_from_u64(3);
    let vectors: Vec<Vec<f64>> = (0..30)
        .map(|_| (0..1024).map(|_| rng.gen_range(-1.0..=1.0)).collect())
        .collect();
    let inputs: Vec<WeightedVector<'_>> = vectors
        .iter()
        .map(|v| WeightedVector::new(1.0 / 30.0, v))
        .collect();

    let kinds = [
        StrategyKind::WeightedMean,
        StrategyKind::CoordinateMedian,
        StrategyKind::TrimmedMean { trim_ratio: 0.1 },
        StrategyKind::MultiKrum { byzantine_count: 5 },
    ];

    for kind in kinds {
        let mut strategy = kind.build();
        group.bench_function(strategy.name(), |b| {
            b.iter(|| black_box(strategy.aggregate(&inputs).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_strategies);
criterion_main!(benches);
