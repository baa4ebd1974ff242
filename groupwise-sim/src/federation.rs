//! Round driver for a simulated federation

use std::collections::BTreeSet;
use std::path::Path;

use groupwise_core::similarity::{norm, squared_distance};
use groupwise_core::{ClientId, HierarchicalAggregator, RoundRecord, StructuredModel};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::behavior::ClientBehavior;
use crate::client::{sample_weights, LocalTraining, SimulatedClient};
use crate::config::ExperimentConfig;
use crate::error::SimResult;
use crate::stage::run_local_stage;

/// What one round looked like from the outside
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSummary {
    pub round: u64,
    /// Relative distance of the global model to the honest optimum
    pub error: f64,
    pub iterations: usize,
    pub converged: bool,
    pub member_counts: Vec<usize>,
    /// Clients set aside by either strategy level this round
    pub flagged: Vec<ClientId>,
}

/// How often each role was set aside across a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedCounts {
    pub benign: usize,
    pub faulty: usize,
    pub malicious: usize,
    pub free_rider: usize,
}

impl BlockedCounts {
    pub fn record(&mut self, behavior: ClientBehavior) {
        match behavior {
            ClientBehavior::Honest => self.benign += 1,
            ClientBehavior::Faulty => self.faulty += 1,
            ClientBehavior::Malicious => self.malicious += 1,
            ClientBehavior::FreeRider => self.free_rider += 1,
        }
    }

    pub fn adversarial(&self) -> usize {
        self.faulty + self.malicious + self.free_rider
    }
}

/// Outcome of a full experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentReport {
    pub name: String,
    pub rounds: Vec<RoundSummary>,
    pub blocked: BlockedCounts,
}

impl ExperimentReport {
    pub fn final_error(&self) -> Option<f64> {
        self.rounds.last().map(|r| r.error)
    }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> SimResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// ‖global − optimum‖ / ‖optimum‖, or the plain distance for a zero optimum
pub fn relative_error(global: &[f64], optimum: &[f64]) -> f64 {
    let distance = squared_distance(global, optimum).sqrt();
    let scale = norm(optimum);
    if scale > 0.0 { distance / scale } else { distance }
}

/// Clients flagged internally plus members of externally flagged clusters
pub fn flagged_clients(record: &RoundRecord) -> Vec<ClientId> {
    let mut flagged: BTreeSet<ClientId> = record.flagged.internal.values().flatten().copied().collect();
    for &cluster in &record.flagged.external {
        flagged.extend(
            record
                .assignments
                .iter()
                .filter(|&(_, &c)| c == cluster)
                .map(|(&id, _)| id),
        );
    }
    flagged.into_iter().collect()
}

/// Simulated clients around one aggregator
pub struct Federation {
    config: ExperimentConfig,
    aggregator: HierarchicalAggregator,
    clients: Vec<SimulatedClient>,
    weights: Vec<f64>,
    optimum: Vec<f64>,
    training: LocalTraining,
    summaries: Vec<RoundSummary>,
    blocked: BlockedCounts,
}

impl Federation {
    /// Build clients and the aggregator from a validated configuration
    pub fn new(config: ExperimentConfig) -> SimResult<Self> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let dim = config.template.total_len();
        let optimum: Vec<f64> = (0..dim).map(|_| rng.gen_range(-1.0..=1.0)).collect();

        let spread = config.heterogeneity;
        let clients: Vec<SimulatedClient> = (0..config.clients as ClientId)
            .map(|id| {
                let samples = rng.gen_range(config.min_samples..=config.max_samples);
                let local_optimum = optimum
                    .iter()
                    .map(|&x| x + rng.gen_range(-spread..=spread))
                    .collect();
                SimulatedClient::new(id, config.behavior_of(id), samples, local_optimum, rng.next_u64())
            })
            .collect();
        let weights = sample_weights(&clients);

        let aggregator = HierarchicalAggregator::new(
            config.aggregator.clone(),
            StructuredModel::zeros(&config.template),
        )?;

        let training = LocalTraining {
            steps: config.local_steps,
            learning_rate: config.learning_rate,
            noise: config.noise,
            faulty_scale: config.faulty_scale,
        };

        info!(
            experiment = %config.name,
            clients = config.clients,
            faulty = config.faulty.len(),
            malicious = config.malicious.len(),
            free_riding = config.free_riding.len(),
            dimension = dim,
            "federation ready"
        );

        Ok(Self {
            config,
            aggregator,
            clients,
            weights,
            optimum,
            training,
            summaries: Vec::new(),
            blocked: BlockedCounts::default(),
        })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn aggregator(&self) -> &HierarchicalAggregator {
        &self.aggregator
    }

    pub fn clients(&self) -> &[SimulatedClient] {
        &self.clients
    }

    /// Client stakes n_i / Σ n in client order
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Point the honest clients are collectively training towards
    pub fn optimum(&self) -> &[f64] {
        &self.optimum
    }

    pub fn summaries(&self) -> &[RoundSummary] {
        &self.summaries
    }

    /// Current error of the broadcast model
    pub fn current_error(&self) -> f64 {
        relative_error(&self.aggregator.global_model().flatten(), &self.optimum)
    }

    /// Local stage, then one aggregation round
    pub fn run_round(&mut self) -> SimResult<RoundSummary> {
        let global = self.aggregator.global_model();
        let submissions = run_local_stage(
            &mut self.clients,
            &self.weights,
            &global,
            self.aggregator.codec(),
            &self.training,
            self.config.workers,
        )?;

        let outcome = self.aggregator.run_round(&submissions)?;
        let flagged = flagged_clients(&outcome.record);
        for &id in &flagged {
            self.blocked.record(self.config.behavior_of(id));
        }

        let summary = RoundSummary {
            round: outcome.round,
            error: relative_error(&outcome.global_vector, &self.optimum),
            iterations: outcome.record.clustering.iterations,
            converged: outcome.record.clustering.converged,
            member_counts: outcome.record.member_counts.clone(),
            flagged,
        };
        info!(
            round = summary.round,
            error = summary.error,
            flagged = summary.flagged.len(),
            "round complete"
        );

        self.summaries.push(summary.clone());
        Ok(summary)
    }

    /// Run `rounds` more rounds
    pub fn run_rounds(&mut self, rounds: usize) -> SimResult<ExperimentReport> {
        for _ in 0..rounds {
            self.run_round()?;
        }
        Ok(self.report())
    }

    /// Run the configured number of rounds
    pub fn run(&mut self) -> SimResult<ExperimentReport> {
        self.run_rounds(self.config.rounds)
    }

    pub fn report(&self) -> ExperimentReport {
        ExperimentReport {
            name: self.config.name.clone(),
            rounds: self.summaries.clone(),
            blocked: self.blocked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupwise_core::{ClusteringReport, StrategyAudit};
    use std::collections::BTreeMap;

    #[test]
    fn test_relative_error() {
        assert_eq!(relative_error(&[3.0, 4.0], &[0.0, 0.0]), 5.0);
        assert!((relative_error(&[0.0, 0.0], &[3.0, 4.0]) - 1.0).abs() < 1e-12);
        assert_eq!(relative_error(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_flagged_clients_merges_levels() {
        let record = RoundRecord {
            round: 0,
            assignments: BTreeMap::from([(0, 0), (1, 0), (2, 1), (3, 1)]),
            cluster_weights: BTreeMap::from([(0, 0.5), (1, 0.5)]),
            member_counts: vec![2, 2],
            clustering: ClusteringReport { iterations: 1, converged: true },
            flagged: StrategyAudit {
                internal: BTreeMap::from([(0, vec![1])]),
                external: vec![1],
            },
        };
        assert_eq!(flagged_clients(&record), vec![1, 2, 3]);
    }

    #[test]
    fn test_blocked_counts() {
        let mut counts = BlockedCounts::default();
        counts.record(ClientBehavior::Faulty);
        counts.record(ClientBehavior::Honest);
        counts.record(ClientBehavior::FreeRider);
        assert_eq!(counts.benign, 1);
        assert_eq!(counts.adversarial(), 2);
    }

    #[test]
    fn test_federation_setup() {
        let config = ExperimentConfig {
            clients: 6,
            faulty: vec![0],
            ..ExperimentConfig::default()
        };
        let federation = Federation::new(config).unwrap();
        assert_eq!(federation.clients().len(), 6);
        assert_eq!(federation.clients()[0].behavior(), ClientBehavior::Faulty);
        assert!((federation.weights().iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert_eq!(federation.optimum().len(), 58);
        assert!((federation.current_error() - 1.0).abs() < 1e-12);
    }
}
