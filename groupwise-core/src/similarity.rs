//! # Vector similarity
//!
//! Dense-vector helpers shared by the clusterer and the reference strategies.

/// Dot product: a · b = Σ ai × bi
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Euclidean norm ‖a‖
pub fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

/// Squared Euclidean distance ‖a − b‖²
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Cosine similarity in [-1, 1]
///
/// A zero-norm operand has no direction, so its similarity to anything is 0.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let denom = norm(a) * norm(b);
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    (dot(a, b) / denom).clamp(-1.0, 1.0)
}

/// Similarity between two snapshots of the same centroid
///
/// Identical snapshots are fully stable even when they have no direction
/// (e.g. an all-zero centroid).
pub fn snapshot_similarity(old: &[f64], new: &[f64]) -> f64 {
    if old == new {
        return 1.0;
    }
    cosine_similarity(old, new)
}
