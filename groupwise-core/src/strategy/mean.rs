//! Weighted mean (FedAvg)

use super::{AggregationStrategy, WeightedVector, check_inputs};
use crate::error::Result;

/// Σ wᵢ·vᵢ / Σ wᵢ, falling back to a uniform mean when every weight is zero
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedMean;

impl AggregationStrategy for WeightedMean {
    fn aggregate(&mut self, inputs: &[WeightedVector<'_>]) -> Result<Vec<f64>> {
        let dim = check_inputs(inputs)?;
        Ok(weighted_mean(inputs, dim))
    }

    fn name(&self) -> &'static str {
        "weighted_mean"
    }
}

/// Normalised weighted mean of pre-validated inputs
pub(crate) fn weighted_mean(inputs: &[WeightedVector<'_>], dim: usize) -> Vec<f64> {
    if let [only] = inputs {
        return only.vector.to_vec();
    }

    let total: f64 = inputs.iter().map(|e| e.weight).sum();
    let uniform = 1.0 / inputs.len() as f64;

    let mut result = vec![0.0; dim];
    for entry in inputs {
        let w = if total > 0.0 { entry.weight / total } else { uniform };
        for (acc, &x) in result.iter_mut().zip(entry.vector) {
            *acc += w * x;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_mean() {
        let a = [1.0, 0.0];
        let b = [0.0, 1.0];
        let out = WeightedMean
            .aggregate(&[WeightedVector::new(0.75, &a), WeightedVector::new(0.25, &b)])
            .unwrap();
        assert!((out[0] - 0.75).abs() < 1e-12);
        assert!((out[1] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_unnormalised_weights() {
        // Stakes inside a cluster rarely sum to one
        let a = [2.0];
        let b = [4.0];
        let out = WeightedMean
            .aggregate(&[WeightedVector::new(0.1, &a), WeightedVector::new(0.1, &b)])
            .unwrap();
        assert!((out[0] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_weights_fall_back_to_uniform() {
        let a = [2.0];
        let b = [6.0];
        let out = WeightedMean
            .aggregate(&[WeightedVector::new(0.0, &a), WeightedVector::new(0.0, &b)])
            .unwrap();
        assert_eq!(out, vec![4.0]);
    }
}
