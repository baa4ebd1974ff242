//! Integration tests for simulated federations

use groupwise_core::StrategyKind;
use groupwise_sim::*;

fn honest_config() -> ExperimentConfig {
    ExperimentConfig {
        name: "honest".into(),
        rounds: 10,
        seed: 17,
        ..ExperimentConfig::default()
    }
}

fn byzantine_config(internal: StrategyKind) -> ExperimentConfig {
    let mut config = ExperimentConfig {
        name: "byzantine".into(),
        rounds: 4,
        seed: 3,
        faulty: (0..6).collect(),
        ..ExperimentConfig::default()
    };
    config.aggregator.cluster_count = 1;
    config.aggregator.internal = internal;
    config
}

#[test]
fn test_honest_federation_converges() {
    let mut federation = Federation::new(honest_config()).unwrap();
    let report = federation.run().unwrap();

    assert_eq!(report.rounds.len(), 10);
    let first = report.rounds[0].error;
    let last = report.final_error().unwrap();
    assert!(first < 1.0);
    assert!(last < first);
    assert!(last < 0.05, "final error {last}");
    assert_eq!(report.blocked, BlockedCounts::default());

    for summary in &report.rounds {
        assert_eq!(summary.member_counts.iter().sum::<usize>(), 30);
    }
    assert_eq!(federation.aggregator().ledger().len(), 10);
}

#[test]
fn test_median_resists_faulty_clients() {
    let mut robust = Federation::new(byzantine_config(StrategyKind::CoordinateMedian)).unwrap();
    let mut naive = Federation::new(byzantine_config(StrategyKind::WeightedMean)).unwrap();

    let robust_error = robust.run().unwrap().final_error().unwrap();
    let naive_error = naive.run().unwrap().final_error().unwrap();

    assert!(robust_error < 0.2, "median error {robust_error}");
    assert!(naive_error > 1.0, "mean error {naive_error}");
}

#[test]
fn test_krum_flags_exactly_the_faulty_clients() {
    let config = byzantine_config(StrategyKind::MultiKrum { byzantine_count: 6 });
    let rounds = config.rounds;
    let mut federation = Federation::new(config).unwrap();
    let report = federation.run().unwrap();

    assert_eq!(report.blocked.faulty, 6 * rounds);
    assert_eq!(report.blocked.benign, 0);
    for summary in &report.rounds {
        assert_eq!(summary.flagged, (0..6).collect::<Vec<u64>>());
    }
}

#[test]
fn test_same_seed_same_report() {
    let config = ExperimentConfig {
        rounds: 3,
        malicious: vec![1, 2],
        free_riding: vec![7],
        workers: 3,
        ..honest_config()
    };

    let a = Federation::new(config.clone()).unwrap().run().unwrap();
    let b = Federation::new(config).unwrap().run().unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_mixed_adversaries_complete() {
    let mut config = ExperimentConfig {
        rounds: 5,
        faulty: vec![0, 1],
        malicious: vec![2, 3],
        free_riding: vec![4, 5],
        ..honest_config()
    };
    config.aggregator.internal = StrategyKind::TrimmedMean { trim_ratio: 0.2 };
    config.aggregator.external = StrategyKind::CoordinateMedian;

    let mut federation = Federation::new(config).unwrap();
    let report = federation.run_rounds(2).unwrap();
    assert_eq!(report.rounds.len(), 2);

    let report = federation.run_rounds(3).unwrap();
    assert_eq!(report.rounds.len(), 5);
    let rounds: Vec<u64> = report.rounds.iter().map(|r| r.round).collect();
    assert_eq!(rounds, vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_report_json_layout() {
    let config = ExperimentConfig {
        rounds: 2,
        ..byzantine_config(StrategyKind::MultiKrum { byzantine_count: 6 })
    };
    let report = Federation::new(config).unwrap().run().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    report.write_json(&path).unwrap();

    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["name"], "byzantine");
    assert_eq!(value["blocked"]["freeRider"], 0);
    assert_eq!(value["rounds"][1]["memberCounts"][0], 30);
}

#[test]
fn test_experiment_from_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("experiment.toml");
    std::fs::write(
        &path,
        r#"
name = "tiny"
rounds = 2
clients = 8
workers = 2
free_riding = [7]

[aggregator]
cluster_count = 2
seed = 5
internal = { kind = "trimmed_mean", trim_ratio = 0.25 }

[[template.blocks]]
name = "w"
shape = [2, 2]

[[template.blocks]]
name = "b"
shape = [2]
"#,
    )
    .unwrap();

    let config = ExperimentConfig::from_file(&path).unwrap();
    let mut federation = Federation::new(config).unwrap();
    let report = federation.run().unwrap();

    assert_eq!(report.rounds.len(), 2);
    let global = federation.aggregator().global_model();
    assert_eq!(global.block("w").map(|b| b.values.len()), Some(4));
    assert_eq!(global.block("b").map(|b| b.values.len()), Some(2));
}
