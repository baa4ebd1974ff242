//! # Clustering Benchmarks
//!
//! Measures the cosine k-means loop across client counts and dimensions.
//!
//! Run: `cargo bench --bench clustering_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use groupwise_core::{ClientUpdate, ClusteringParams, SimilarityClusterer, WeightedMean};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Clients drawn around `groups` random directions
fn grouped_updates(clients: usize, dim: usize, groups: usize, seed: u64) -> Vec<ClientUpdate> {
    let mut rng = StdRng::seed_from_u64(seed);
    let directions: Vec<Vec<f64>> = (0..groups)
        .map(|_| (0..dim).map(|_| rng.gen_range(-1.0..=1.0)).collect())
        .collect();

    (0..clients)
        .map(|i| {
            let vector = directions[i % groups]
                .iter()
                .map(|x| x + rng.gen_range(-0.1..=0.1))
                .collect();
            ClientUpdate::new(i as u64, vector, 1.0 / clients as f64)
        })
        .collect()
}

fn bench_cluster_clients(c: &mut Criterion) {
    let mut group = c.benchmark_group("cluster_clients");

    for clients in [10, 30, 100] {
        let updates = grouped_updates(clients, 256, 3, 7);
        let params = ClusteringParams {
            cluster_count: 3,
            ..ClusteringParams::default()
        };

        group.bench_with_input(BenchmarkId::from_parameter(clients), &updates, |b, updates| {
            b.iter(|| {
                let mut clusterer = SimilarityClusterer::new(params, 42).unwrap();
                black_box(clusterer.cluster(updates, &mut WeightedMean).unwrap())
            })
        });
    }

    group.finish();
}

fn bench_cluster_dimension(c: &mut Criterion) {
    let mut group = c.benchmark_group("cluster_dimension");

    for dim in [64, 1024, 16384] {
        let updates = grouped_updates(30, dim, 3, 11);
        let params = ClusteringParams {
            cluster_count: 3,
            ..ClusteringParams::default()
        };

        group.bench_with_input(BenchmarkId::from_parameter(dim), &updates, |b, updates| {
            b.iter(|| {
                let mut clusterer = SimilarityClusterer::new(params, 42).unwrap();
                black_box(clusterer.cluster(updates, &mut WeightedMean).unwrap())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_cluster_clients, bench_cluster_dimension);
criterion_main!(benches);
