//! # Round Benchmarks
//!
//! Measures a full federated round: parallel local stage plus hierarchical
//! aggregation.
//!
//! Run: `cargo bench --bench round_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use groupwise_sim::{ExperimentConfig, Federation};

fn bench_round_workers(c: &mut Criterion) {
    let mut group = c.benchmark_group("federated_round");

    for workers in [1, 4] {
        let config = ExperimentConfig {
            clients: 60,
            workers,
            faulty: vec![0, 1, 2],
            malicious: vec![3, 4],
            ..ExperimentConfig::default()
        };
        let mut federation = Federation::new(config).unwrap();

        group.bench_with_input(BenchmarkId::new("workers", workers), &workers, |b, _| {
            b.iter(|| black_box(federation.run_round().unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_round_workers);
criterion_main!(benches);
