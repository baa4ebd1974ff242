//! # Aggregation strategies
//!
//! Pluggable combiners used at both levels of the hierarchy. The aggregator
//! only sees the [`AggregationStrategy`] contract; which concrete strategy runs
//! is decided by configuration through [`StrategyKind`].
//!
//! | Strategy | Byzantine tolerance | Uses weights |
//! |----------|---------------------|--------------|
//! | [`WeightedMean`] | none (baseline) | yes |
//! | [`CoordinateMedian`] | < 50% | no |
//! | [`TrimmedMean`] | ≈ trim ratio | no |
//! | [`MultiKrum`] | n ≥ 2f + 3 | yes (over the kept set) |

pub mod krum;
pub mod mean;
pub mod median;
pub mod trimmed;

pub use krum::MultiKrum;
pub use mean::WeightedMean;
pub use median::CoordinateMedian;
pub use trimmed::TrimmedMean;

use serde::{Deserialize, Serialize};

use crate::error::{GroupwiseError, Result};

/// One `(weight, vector)` entry handed to a strategy
#[derive(Debug, Clone, Copy)]
pub struct WeightedVector<'a> {
    pub weight: f64,
    pub vector: &'a [f64],
}

impl<'a> WeightedVector<'a> {
    pub fn new(weight: f64, vector: &'a [f64]) -> Self {
        Self { weight, vector }
    }
}

/// Contract every robust combiner satisfies
///
/// Implementations must accept any non-empty input of equal-length vectors and
/// return `v` unchanged for the single entry `(1.0, v)`.
pub trait AggregationStrategy: Send + Sync {
    /// Combine the entries into one vector of the same length
    fn aggregate(&mut self, inputs: &[WeightedVector<'_>]) -> Result<Vec<f64>>;

    /// Strategy name for logs and ledger records
    fn name(&self) -> &'static str;

    /// Input positions treated as outliers by the most recent call
    ///
    /// Audit only; the aggregator never branches on it.
    fn flagged(&self) -> &[usize] {
        &[]
    }
}

/// Validate strategy input and return the common dimension
pub fn check_inputs(inputs: &[WeightedVector<'_>]) -> Result<usize> {
    let first = inputs.first().ok_or_else(|| {
        GroupwiseError::EmptyAggregationInput("strategy received zero entries".into())
    })?;
    let dim = first.vector.len();

    for entry in inputs {
        if entry.vector.len() != dim {
            return Err(GroupwiseError::DimensionMismatch {
                expected: dim,
                actual: entry.vector.len(),
            });
        }
        if !entry.weight.is_finite() || entry.weight < 0.0 {
            return Err(GroupwiseError::InvalidInput(format!(
                "aggregation weight must be finite and non-negative, got {}",
                entry.weight
            )));
        }
    }

    Ok(dim)
}

/// Configuration-level strategy selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyKind {
    /// Federated averaging
    #[default]
    WeightedMean,
    /// Coordinate-wise median
    CoordinateMedian,
    /// Coordinate-wise trimmed mean
    TrimmedMean { trim_ratio: f64 },
    /// Multi-Krum selection followed by a weighted mean
    MultiKrum { byzantine_count: usize },
}

impl StrategyKind {
    pub fn validate(&self) -> Result<()> {
        match self {
            StrategyKind::TrimmedMean { trim_ratio } if !(0.0..0.5).contains(trim_ratio) => {
                Err(GroupwiseError::ConfigError(format!(
                    "trim_ratio must be in [0, 0.5), got {}",
                    trim_ratio
                )))
            }
            _ => Ok(()),
        }
    }

    /// Construct a fresh strategy instance
    pub fn build(&self) -> Box<dyn AggregationStrategy> {
        match self {
            StrategyKind::WeightedMean => Box::new(WeightedMean),
            StrategyKind::CoordinateMedian => Box::new(CoordinateMedian),
            StrategyKind::TrimmedMean { trim_ratio } => Box::new(TrimmedMean::new(*trim_ratio)),
            StrategyKind::MultiKrum { byzantine_count } => Box::new(MultiKrum::new(*byzantine_count)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_kinds() -> Vec<StrategyKind> {
        vec![
            StrategyKind::WeightedMean,
            StrategyKind::CoordinateMedian,
            StrategyKind::TrimmedMean { trim_ratio: 0.2 },
            StrategyKind::MultiKrum { byzantine_count: 1 },
        ]
    }

    #[test]
    fn test_singleton_identity_for_every_strategy() {
        let v = vec![0.25, -3.0, 1e-9, 42.0];
        for kind in all_kinds() {
            let mut strategy = kind.build();
            let out = strategy.aggregate(&[WeightedVector::new(1.0, &v)]).unwrap();
            assert_eq!(out, v, "{} broke the singleton identity", strategy.name());
        }
    }

    #[test]
    fn test_empty_input_rejected_by_every_strategy() {
        for kind in all_kinds() {
            let mut strategy = kind.build();
            assert!(matches!(
                strategy.aggregate(&[]),
                Err(GroupwiseError::EmptyAggregationInput(_))
            ));
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = [1.0, 2.0];
        let b = [1.0];
        let err = check_inputs(&[WeightedVector::new(0.5, &a), WeightedVector::new(0.5, &b)]).unwrap_err();
        assert_eq!(err, GroupwiseError::DimensionMismatch { expected: 2, actual: 1 });
    }

    #[test]
    fn test_negative_weight_rejected() {
        let a = [1.0];
        assert!(check_inputs(&[WeightedVector::new(-0.1, &a)]).is_err());
    }

    #[test]
    fn test_kind_serde_tagged() {
        let kind: StrategyKind = serde_json::from_str(r#"{"kind":"trimmed_mean","trim_ratio":0.1}"#).unwrap();
        assert_eq!(kind, StrategyKind::TrimmedMean { trim_ratio: 0.1 });
        assert!(StrategyKind::TrimmedMean { trim_ratio: 0.6 }.validate().is_err());
    }

    #[test]
    fn test_default_kind_is_weighted_mean() {
        assert_eq!(StrategyKind::default(), StrategyKind::WeightedMean);
        assert_eq!(StrategyKind::default().build().name(), "weighted_mean");
    }
}
