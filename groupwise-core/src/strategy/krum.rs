//! Multi-Krum selection

use super::mean::weighted_mean;
use super::{AggregationStrategy, WeightedVector, check_inputs};
use crate::error::Result;
use crate::similarity::squared_distance;

/// Scores each entry by the summed squared distance to its `n − f − 2`
/// nearest neighbours, keeps the `n − f` best-scored entries and returns
/// their weighted mean. Discarded positions are reported via `flagged`.
#[derive(Debug, Clone, Default)]
pub struct MultiKrum {
    byzantine_count: usize,
    flagged: Vec<usize>,
}

impl MultiKrum {
    pub fn new(byzantine_count: usize) -> Self {
        Self {
            byzantine_count,
            flagged: Vec::new(),
        }
    }

    /// Krum score per entry (lower is more central)
    fn scores(&self, inputs: &[WeightedVector<'_>]) -> Vec<f64> {
        let n = inputs.len();
        let neighbours = n
            .saturating_sub(self.byzantine_count + 2)
            .clamp(1, n - 1);

        let mut scores = Vec::with_capacity(n);
        let mut distances = Vec::with_capacity(n - 1);
        for (i, a) in inputs.iter().enumerate() {
            distances.clear();
            for (j, b) in inputs.iter().enumerate() {
                if i != j {
                    distances.push(squared_distance(a.vector, b.vector));
                }
            }
            distances.sort_by(|x, y| x.total_cmp(y));
            scores.push(distances[..neighbours].iter().sum());
        }
        scores
    }
}

impl AggregationStrategy for MultiKrum {
    fn aggregate(&mut self, inputs: &[WeightedVector<'_>]) -> Result<Vec<f64>> {
        let dim = check_inputs(inputs)?;
        self.flagged.clear();

        let n = inputs.len();
        if n == 1 {
            return Ok(inputs[0].vector.to_vec());
        }

        let scores = self.scores(inputs);
        let mut order: Vec<usize> = (0..n).collect();
        // Stable sort keeps ties in input order
        order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

        let keep = n.saturating_sub(self.byzantine_count).max(1);
        let (selected, rejected) = order.split_at(keep);

        let mut selected = selected.to_vec();
        selected.sort_unstable();
        self.flagged = rejected.to_vec();
        self.flagged.sort_unstable();

        let kept: Vec<WeightedVector<'_>> = selected.iter().map(|&i| inputs[i]).collect();
        Ok(weighted_mean(&kept, dim))
    }

    fn name(&self) -> &'static str {
        "multi_krum"
    }

    fn flagged(&self) -> &[usize] {
        &self.flagged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_far_outlier() {
        let rows = [[1.0, 1.0], [1.1, 0.9], [0.9, 1.1], [1.0, 1.05], [50.0, -50.0]];
        let inputs: Vec<_> = rows.iter().map(|r| WeightedVector::new(0.2, r)).collect();

        let mut krum = MultiKrum::new(1);
        let out = krum.aggregate(&inputs).unwrap();

        assert_eq!(krum.flagged(), &[4]);
        assert!((out[0] - 1.0).abs() < 0.1);
        assert!((out[1] - 1.0).abs() < 0.1);
    }

    #[test]
    fn test_flagged_reset_between_calls() {
        let rows = [[0.0], [0.1], [9.0]];
        let inputs: Vec<_> = rows.iter().map(|r| WeightedVector::new(1.0, r)).collect();
        let mut krum = MultiKrum::new(1);
        krum.aggregate(&inputs).unwrap();
        assert_eq!(krum.flagged().len(), 1);

        let single = [3.0];
        krum.aggregate(&[WeightedVector::new(1.0, &single)]).unwrap();
        assert!(krum.flagged().is_empty());
    }

    #[test]
    fn test_byzantine_count_larger_than_input() {
        let rows = [[1.0], [2.0]];
        let inputs: Vec<_> = rows.iter().map(|r| WeightedVector::new(0.5, r)).collect();
        let mut krum = MultiKrum::new(5);
        let out = krum.aggregate(&inputs).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(krum.flagged().len(), 1);
    }
}
