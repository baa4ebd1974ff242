//! # Hierarchical Aggregator
//!
//! Drives one federated round end to end:
//!
//! ```text
//! submissions ──flatten──▶ clusterer ──▶ internal strategy per cluster
//!                                              │  (representative, members/N)
//!                                              ▼
//!                      restore ◀── external strategy across clusters
//!                         │
//!                         ▼
//!                new global model + ledger record
//! ```
//!
//! The broadcast model is held behind an `Arc` and replaced wholesale once a
//! round succeeds; readers holding the previous `Arc` never observe a partial
//! update. A failing round leaves both the model and the ledger untouched.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clusterer::{Centroids, ClusteringOutcome, SimilarityClusterer};
use crate::codec::{StructuredModel, VectorCodec};
use crate::config::AggregatorConfig;
use crate::error::{GroupwiseError, Result};
use crate::ledger::{ClusteringReport, RoundLedger, RoundRecord, StrategyAudit};
use crate::strategy::{AggregationStrategy, WeightedVector};
use crate::types::{ClientSubmission, ClientUpdate, ClusterAssignment, ClusterRepresentative};

/// Allowed drift of Σ client weights away from 1 before warning
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-3;

/// Everything produced by one successful round
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    pub round: u64,
    pub global: Arc<StructuredModel>,
    pub global_vector: Vec<f64>,
    pub representatives: Vec<ClusterRepresentative>,
    pub record: RoundRecord,
}

/// Size-proportional cluster weights: members / total
pub fn cluster_weights(member_counts: &[usize]) -> Vec<f64> {
    let total: usize = member_counts.iter().sum();
    if total == 0 {
        return vec![0.0; member_counts.len()];
    }
    member_counts
        .iter()
        .map(|&n| n as f64 / total as f64)
        .collect()
}

/// Two-level robust aggregator
pub struct HierarchicalAggregator {
    config: AggregatorConfig,
    codec: VectorCodec,
    clusterer: SimilarityClusterer,
    internal: Box<dyn AggregationStrategy>,
    external: Box<dyn AggregationStrategy>,
    global: Arc<StructuredModel>,
    ledger: RoundLedger,
    next_round: u64,
}

impl std::fmt::Debug for HierarchicalAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HierarchicalAggregator")
            .field("config", &self.config)
            .field("internal", &self.internal.name())
            .field("external", &self.external.name())
            .field("next_round", &self.next_round)
            .field("ledger_len", &self.ledger.len())
            .finish()
    }
}

impl HierarchicalAggregator {
    /// Aggregator with strategies built from the configuration
    pub fn new(config: AggregatorConfig, initial_model: StructuredModel) -> Result<Self> {
        let internal = config.internal.build();
        let external = config.external.build();
        Self::with_strategies(config, initial_model, internal, external)
    }

    /// Aggregator with externally constructed strategies
    ///
    /// `config.internal` / `config.external` are ignored in favour of the
    /// supplied instances.
    pub fn with_strategies(
        config: AggregatorConfig,
        initial_model: StructuredModel,
        internal: Box<dyn AggregationStrategy>,
        external: Box<dyn AggregationStrategy>,
    ) -> Result<Self> {
        config.validate()?;
        let codec = VectorCodec::new(initial_model.template());
        let clusterer = SimilarityClusterer::new(config.clustering(), config.seed)?;

        Ok(Self {
            config,
            codec,
            clusterer,
            internal,
            external,
            global: Arc::new(initial_model),
            ledger: RoundLedger::new(),
            next_round: 0,
        })
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn codec(&self) -> &VectorCodec {
        &self.codec
    }

    /// Current broadcast model
    pub fn global_model(&self) -> Arc<StructuredModel> {
        Arc::clone(&self.global)
    }

    pub fn ledger(&self) -> &RoundLedger {
        &self.ledger
    }

    /// Index the next round will be recorded under
    pub fn next_round(&self) -> u64 {
        self.next_round
    }

    pub fn clusterer(&self) -> &SimilarityClusterer {
        &self.clusterer
    }

    /// Start the next clustering from known centroids
    pub fn warm_start(&mut self, centroids: Centroids) -> Result<()> {
        self.clusterer.warm_start(centroids)
    }

    /// Run one round from structured submissions
    pub fn run_round(&mut self, submissions: &[ClientSubmission]) -> Result<RoundOutcome> {
        let updates = submissions
            .iter()
            .map(|s| {
                Ok(ClientUpdate::new(
                    s.client_id,
                    self.codec.flatten(&s.model)?,
                    s.weight,
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        self.aggregate_updates(&updates)
    }

    /// Run one round from already-flattened updates
    pub fn aggregate_updates(&mut self, updates: &[ClientUpdate]) -> Result<RoundOutcome> {
        self.validate_updates(updates)?;

        let checkpoint = self.clusterer.clone();
        let result = self.try_aggregate(updates);
        if result.is_err() {
            self.clusterer = checkpoint;
        }
        result
    }

    fn try_aggregate(&mut self, updates: &[ClientUpdate]) -> Result<RoundOutcome> {
        let round = self.next_round;

        let clustering = self.clusterer.cluster(updates, self.internal.as_mut())?;
        let member_counts = clustering.assignment.counts();
        debug!(round, ?member_counts, iterations = clustering.iterations, "clustering finished");

        let mut audit = StrategyAudit::default();
        let representatives = self.build_representatives(updates, &clustering.assignment, &mut audit)?;
        if representatives.is_empty() {
            return Err(GroupwiseError::EmptyAggregationInput(
                "every cluster came back empty".into(),
            ));
        }

        let inputs: Vec<WeightedVector<'_>> = representatives
            .iter()
            .map(|r| WeightedVector::new(r.weight, &r.vector))
            .collect();
        let global_vector = self.external.aggregate(&inputs)?;
        if global_vector.iter().any(|x| !x.is_finite()) {
            return Err(GroupwiseError::InvalidInput(format!(
                "{} strategy produced a non-finite global model",
                self.external.name()
            )));
        }
        audit.external = self
            .external
            .flagged()
            .iter()
            .filter_map(|&pos| match representatives.get(pos) {
                Some(rep) => Some(rep.cluster),
                None => {
                    warn!(position = pos, strategy = self.external.name(), "ignoring out-of-range flag");
                    None
                }
            })
            .collect();

        let model = self.codec.restore(&global_vector)?;
        let record = self.build_record(round, &clustering, &member_counts, audit);
        self.ledger.append(record.clone())?;

        self.global = Arc::new(model);
        self.next_round += 1;

        info!(
            round,
            clients = updates.len(),
            non_empty_clusters = representatives.len(),
            converged = clustering.converged,
            "round aggregated"
        );

        Ok(RoundOutcome {
            round,
            global: self.global_model(),
            global_vector,
            representatives,
            record,
        })
    }

    fn validate_updates(&self, updates: &[ClientUpdate]) -> Result<()> {
        if updates.is_empty() {
            return Err(GroupwiseError::EmptyAggregationInput(
                "round has no client updates".into(),
            ));
        }

        let dim = self.codec.dimension();
        let mut seen = HashSet::with_capacity(updates.len());
        for update in updates {
            if update.vector.len() != dim {
                return Err(GroupwiseError::ShapeMismatch {
                    expected: dim,
                    actual: update.vector.len(),
                });
            }
            if !(update.weight > 0.0 && update.weight <= 1.0) {
                return Err(GroupwiseError::InvalidWeight {
                    client_id: update.client_id,
                    weight: update.weight,
                });
            }
            if let Some(index) = update.vector.iter().position(|x| !x.is_finite()) {
                return Err(GroupwiseError::NonFiniteUpdate {
                    client_id: update.client_id,
                    index,
                });
            }
            if !seen.insert(update.client_id) {
                return Err(GroupwiseError::DuplicateClient(update.client_id));
            }
        }

        let total: f64 = updates.iter().map(|u| u.weight).sum();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            warn!(total, "client weights do not sum to 1");
        }
        Ok(())
    }

    /// Internal-level aggregate for every non-empty cluster, in index order
    fn build_representatives(
        &mut self,
        updates: &[ClientUpdate],
        assignment: &ClusterAssignment,
        audit: &mut StrategyAudit,
    ) -> Result<Vec<ClusterRepresentative>> {
        let weights = cluster_weights(&assignment.counts());
        let mut representatives = Vec::new();

        for cluster in 0..assignment.cluster_count() {
            let members = assignment.members(cluster);
            if members.is_empty() {
                continue;
            }

            let inputs: Vec<WeightedVector<'_>> = members
                .iter()
                .map(|&pos| WeightedVector::new(updates[pos].weight, &updates[pos].vector))
                .collect();
            let vector = self.internal.aggregate(&inputs)?;

            let flagged: Vec<_> = self
                .internal
                .flagged()
                .iter()
                .filter_map(|&i| match members.get(i) {
                    Some(&pos) => Some(updates[pos].client_id),
                    None => {
                        warn!(cluster, position = i, strategy = self.internal.name(), "ignoring out-of-range flag");
                        None
                    }
                })
                .collect();
            if !flagged.is_empty() {
                debug!(cluster, ?flagged, "internal strategy set clients aside");
                audit.internal.insert(cluster, flagged);
            }

            representatives.push(ClusterRepresentative {
                cluster,
                vector,
                weight: weights[cluster],
                member_count: members.len(),
            });
        }

        Ok(representatives)
    }

    fn build_record(
        &self,
        round: u64,
        clustering: &ClusteringOutcome,
        member_counts: &[usize],
        flagged: StrategyAudit,
    ) -> RoundRecord {
        let cluster_weights: BTreeMap<usize, f64> = cluster_weights(member_counts)
            .into_iter()
            .enumerate()
            .collect();

        RoundRecord {
            round,
            assignments: clustering.assignment.to_map(),
            cluster_weights,
            member_counts: member_counts.to_vec(),
            clustering: ClusteringReport {
                iterations: clustering.iterations,
                converged: clustering.converged,
            },
            flagged,
        }
    }
}
