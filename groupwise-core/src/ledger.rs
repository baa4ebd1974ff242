//! # Round Ledger
//!
//! Append-only audit trail: one record per completed round with the cluster
//! assignment, cluster weights and whatever the strategies flagged.
//!
//! Serialised as JSON, keyed by round:
//!
//! ```json
//! {"round": 0, "assignments": {"0": 1, "1": 0}, "clusterWeights": {"0": 0.5, "1": 0.5}, ...}
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GroupwiseError, Result};
use crate::types::ClientId;

/// How the clustering loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusteringReport {
    pub iterations: usize,
    pub converged: bool,
}

/// Strategy introspection captured for audit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyAudit {
    /// cluster index → clients the internal strategy set aside
    pub internal: BTreeMap<usize, Vec<ClientId>>,
    /// cluster indices the external strategy set aside
    pub external: Vec<usize>,
}

impl StrategyAudit {
    pub fn is_empty(&self) -> bool {
        self.internal.is_empty() && self.external.is_empty()
    }
}

/// One completed round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    pub round: u64,
    /// client id → cluster index
    pub assignments: BTreeMap<ClientId, usize>,
    /// cluster index → external weight (zero for empty clusters)
    pub cluster_weights: BTreeMap<usize, f64>,
    pub member_counts: Vec<usize>,
    pub clustering: ClusteringReport,
    #[serde(default)]
    pub flagged: StrategyAudit,
}

impl RoundRecord {
    /// Sum of weights over non-empty clusters
    pub fn weight_sum(&self) -> f64 {
        self.cluster_weights.values().sum()
    }

    pub fn empty_clusters(&self) -> Vec<usize> {
        self.member_counts
            .iter()
            .enumerate()
            .filter(|&(_, &n)| n == 0)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Append-only history of round records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundLedger {
    entries: Vec<RoundRecord>,
}

impl RoundLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record; rounds must be strictly increasing
    pub fn append(&mut self, record: RoundRecord) -> Result<()> {
        if let Some(last) = self.entries.last() {
            if record.round <= last.round {
                return Err(GroupwiseError::InvalidInput(format!(
                    "round {} recorded after round {}",
                    record.round, last.round
                )));
            }
        }
        self.entries.push(record);
        Ok(())
    }

    pub fn entries(&self) -> &[RoundRecord] {
        &self.entries
    }

    pub fn get(&self, round: u64) -> Option<&RoundRecord> {
        self.entries.iter().find(|r| r.round == round)
    }

    pub fn latest(&self) -> Option<&RoundRecord> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rounds whose clustering hit the iteration cap
    pub fn nonconverged_rounds(&self) -> Vec<u64> {
        self.entries
            .iter()
            .filter(|r| !r.clustering.converged)
            .map(|r| r.round)
            .collect()
    }

    /// Cluster history of one client across all recorded rounds
    pub fn client_history(&self, client_id: ClientId) -> Vec<(u64, usize)> {
        self.entries
            .iter()
            .filter_map(|r| r.assignments.get(&client_id).map(|&c| (r.round, c)))
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let entries: Vec<RoundRecord> = serde_json::from_str(content)?;
        let mut ledger = Self::new();
        for record in entries {
            ledger.append(record)?;
        }
        Ok(ledger)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}
