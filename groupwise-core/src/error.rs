//! Error types for groupwise-core

use thiserror::Error;

/// Result type for groupwise-core operations
pub type Result<T> = std::result::Result<T, GroupwiseError>;

/// groupwise-core error types
///
/// Everything here is fatal for the round that raised it. Clustering
/// non-convergence and empty clusters are not errors: they are logged and
/// recorded in the ledger instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GroupwiseError {
    #[error("Shape mismatch: expected {expected} elements, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Parameter block mismatch: {0}")]
    BlockMismatch(String),

    #[error("Empty aggregation input: {0}")]
    EmptyAggregationInput(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid weight {weight} for client {client_id}")]
    InvalidWeight { client_id: u64, weight: f64 },

    #[error("Client {client_id} submitted a non-finite parameter at position {index}")]
    NonFiniteUpdate { client_id: u64, index: usize },

    #[error("Duplicate client id: {0}")]
    DuplicateClient(u64),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for GroupwiseError {
    fn from(err: std::io::Error) -> Self {
        GroupwiseError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for GroupwiseError {
    fn from(err: serde_json::Error) -> Self {
        GroupwiseError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GroupwiseError::ShapeMismatch { expected: 10, actual: 9 };
        assert_eq!(err.to_string(), "Shape mismatch: expected 10 elements, got 9");

        let err = GroupwiseError::EmptyAggregationInput("external".into());
        assert!(err.to_string().contains("external"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<Vec<f64>>("not json").unwrap_err();
        let err: GroupwiseError = json_err.into();
        assert!(matches!(err, GroupwiseError::SerializationError(_)));
    }
}
