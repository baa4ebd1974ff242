//! Aggregator configuration

use serde::{Deserialize, Serialize};

use crate::error::{GroupwiseError, Result};
use crate::strategy::StrategyKind;

pub const DEFAULT_CLUSTER_COUNT: usize = 3;
pub const DEFAULT_CONVERGENCE_THRESHOLD: f64 = 0.99;
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Clustering knobs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusteringParams {
    /// Number of clusters K, fixed for a run
    pub cluster_count: usize,
    /// Minimum per-centroid cosine similarity between iterations to stop
    pub convergence_threshold: f64,
    /// Hard cap on assignment/update iterations
    pub max_iterations: usize,
}

impl Default for ClusteringParams {
    fn default() -> Self {
        Self {
            cluster_count: DEFAULT_CLUSTER_COUNT,
            convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl ClusteringParams {
    pub fn validate(&self) -> Result<()> {
        if self.cluster_count == 0 {
            return Err(GroupwiseError::ConfigError("cluster_count must be positive".into()));
        }
        if !(self.convergence_threshold > 0.0 && self.convergence_threshold < 1.0) {
            return Err(GroupwiseError::ConfigError(format!(
                "convergence_threshold must be in (0, 1), got {}",
                self.convergence_threshold
            )));
        }
        if self.max_iterations == 0 {
            return Err(GroupwiseError::ConfigError("max_iterations must be positive".into()));
        }
        Ok(())
    }
}

/// Full configuration consumed by [`crate::HierarchicalAggregator`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub cluster_count: usize,
    pub convergence_threshold: f64,
    pub max_iterations: usize,
    /// Seed for centroid initialisation
    pub seed: u64,
    /// Strategy applied within each cluster (and for centroid updates)
    pub internal: StrategyKind,
    /// Strategy applied across cluster representatives
    pub external: StrategyKind,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        let clustering = ClusteringParams::default();
        Self {
            cluster_count: clustering.cluster_count,
            convergence_threshold: clustering.convergence_threshold,
            max_iterations: clustering.max_iterations,
            seed: 0,
            internal: StrategyKind::default(),
            external: StrategyKind::default(),
        }
    }
}

impl AggregatorConfig {
    pub fn clustering(&self) -> ClusteringParams {
        ClusteringParams {
            cluster_count: self.cluster_count,
            convergence_threshold: self.convergence_threshold,
            max_iterations: self.max_iterations,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.clustering().validate()?;
        self.internal.validate()?;
        self.external.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(AggregatorConfig::default().validate().is_ok());
        assert_eq!(AggregatorConfig::default().cluster_count, 3);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let mut config = AggregatorConfig::default();
        config.cluster_count = 0;
        assert!(config.validate().is_err());

        let mut config = AggregatorConfig::default();
        config.convergence_threshold = 1.0;
        assert!(config.validate().is_err());

        let mut config = AggregatorConfig::default();
        config.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AggregatorConfig =
            serde_json::from_str(r#"{"cluster_count": 2, "external": {"kind": "coordinate_median"}}"#).unwrap();
        assert_eq!(config.cluster_count, 2);
        assert_eq!(config.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(config.external, StrategyKind::CoordinateMedian);
    }
}
