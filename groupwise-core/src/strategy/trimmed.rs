//! Coordinate-wise trimmed mean

use super::{AggregationStrategy, WeightedVector, check_inputs};
use crate::error::Result;

/// Drops the ⌊n·ratio⌋ smallest and largest values per coordinate, then
/// averages what is left. At least one value always survives.
#[derive(Debug, Clone, Copy)]
pub struct TrimmedMean {
    trim_ratio: f64,
}

impl TrimmedMean {
    pub fn new(trim_ratio: f64) -> Self {
        Self {
            trim_ratio: trim_ratio.clamp(0.0, 0.5),
        }
    }

    /// Values removed from each end for `n` entries
    pub fn trim_count(&self, n: usize) -> usize {
        let k = (n as f64 * self.trim_ratio).floor() as usize;
        k.min(n.saturating_sub(1) / 2)
    }
}

impl AggregationStrategy for TrimmedMean {
    fn aggregate(&mut self, inputs: &[WeightedVector<'_>]) -> Result<Vec<f64>> {
        let dim = check_inputs(inputs)?;
        let n = inputs.len();
        let k = self.trim_count(n);

        let mut column = Vec::with_capacity(n);
        let mut result = Vec::with_capacity(dim);
        for i in 0..dim {
            column.clear();
            column.extend(inputs.iter().map(|e| e.vector[i]));
            column.sort_by(|a, b| a.total_cmp(b));

            let kept = &column[k..n - k];
            result.push(kept.iter().sum::<f64>() / kept.len() as f64);
        }
        Ok(result)
    }

    fn name(&self) -> &'static str {
        "trimmed_mean"
    }
}
