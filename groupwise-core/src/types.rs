//! Round-scoped data types shared by the clusterer and the aggregator

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::codec::StructuredModel;

/// Client identifier as assigned by the training side
pub type ClientId = u64;

/// Structured update as submitted by the training collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSubmission {
    pub client_id: ClientId,
    pub model: StructuredModel,
    /// Stake proportional to the client's local sample count
    pub weight: f64,
}

impl ClientSubmission {
    pub fn new(client_id: ClientId, model: StructuredModel, weight: f64) -> Self {
        Self { client_id, model, weight }
    }
}

/// Flattened client update for one round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientUpdate {
    pub client_id: ClientId,
    pub vector: Vec<f64>,
    pub weight: f64,
}

impl ClientUpdate {
    pub fn new(client_id: ClientId, vector: Vec<f64>, weight: f64) -> Self {
        Self { client_id, vector, weight }
    }
}

/// Cluster index per client, in submission order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterAssignment {
    cluster_count: usize,
    client_ids: Vec<ClientId>,
    choices: Vec<usize>,
}

impl ClusterAssignment {
    pub(crate) fn new(cluster_count: usize, client_ids: Vec<ClientId>, choices: Vec<usize>) -> Self {
        debug_assert_eq!(client_ids.len(), choices.len());
        debug_assert!(choices.iter().all(|&c| c < cluster_count));
        Self {
            cluster_count,
            client_ids,
            choices,
        }
    }

    pub fn cluster_count(&self) -> usize {
        self.cluster_count
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    /// Cluster index per submission position
    pub fn choices(&self) -> &[usize] {
        &self.choices
    }

    pub fn cluster_of(&self, client_id: ClientId) -> Option<usize> {
        self.client_ids
            .iter()
            .position(|&id| id == client_id)
            .map(|pos| self.choices[pos])
    }

    /// Submission positions assigned to `cluster`
    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.choices
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c == cluster)
            .map(|(pos, _)| pos)
            .collect()
    }

    /// Client ids assigned to `cluster`
    pub fn member_ids(&self, cluster: usize) -> Vec<ClientId> {
        self.members(cluster)
            .into_iter()
            .map(|pos| self.client_ids[pos])
            .collect()
    }

    /// Member count per cluster index
    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.cluster_count];
        for &c in &self.choices {
            counts[c] += 1;
        }
        counts
    }

    /// client id → cluster index
    pub fn to_map(&self) -> BTreeMap<ClientId, usize> {
        self.client_ids
            .iter()
            .copied()
            .zip(self.choices.iter().copied())
            .collect()
    }
}

/// Internal-level aggregate of one non-empty cluster
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRepresentative {
    pub cluster: usize,
    pub vector: Vec<f64>,
    /// members / total clients
    pub weight: f64,
    pub member_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_views() {
        let a = ClusterAssignment::new(3, vec![10, 11, 12, 13], vec![1, 0, 1, 1]);
        assert_eq!(a.counts(), vec![1, 3, 0]);
        assert_eq!(a.members(1), vec![0, 2, 3]);
        assert_eq!(a.member_ids(1), vec![10, 12, 13]);
        assert_eq!(a.cluster_of(11), Some(0));
        assert_eq!(a.cluster_of(99), None);
        assert_eq!(a.to_map().len(), 4);
        assert!(a.members(2).is_empty());
    }
}
