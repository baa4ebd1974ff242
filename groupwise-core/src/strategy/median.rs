//! Coordinate-wise median (COMED)

use super::{AggregationStrategy, WeightedVector, check_inputs};
use crate::error::Result;

/// Per-coordinate median; weights are ignored
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinateMedian;

impl AggregationStrategy for CoordinateMedian {
    fn aggregate(&mut self, inputs: &[WeightedVector<'_>]) -> Result<Vec<f64>> {
        let dim = check_inputs(inputs)?;

        let mut column = Vec::with_capacity(inputs.len());
        let mut result = Vec::with_capacity(dim);
        for i in 0..dim {
            column.clear();
            column.extend(inputs.iter().map(|e| e.vector[i]));
            result.push(median(&mut column));
        }
        Ok(result)
    }

    fn name(&self) -> &'static str {
        "coordinate_median"
    }
}

/// Median of a non-empty slice (sorts in place)
pub(crate) fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n / 2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_ignores_outlier() {
        let a = [1.0, 10.0];
        let b = [1.1, 11.0];
        let c = [1000.0, -500.0];
        let out = CoordinateMedian
            .aggregate(&[
                WeightedVector::new(0.3, &a),
                WeightedVector::new(0.3, &b),
                WeightedVector::new(0.4, &c),
            ])
            .unwrap();
        assert_eq!(out, vec![1.1, 10.0]);
    }

    #[test]
    fn test_even_count_averages_middle() {
        let mut v = vec![4.0, 1.0, 3.0, 2.0];
        assert_eq!(median(&mut v), 2.5);
    }
}
