//! Simulation errors

use groupwise_core::GroupwiseError;
use thiserror::Error;

pub type SimResult<T> = Result<T, SimError>;

/// Errors raised while setting up or driving a simulated federation
#[derive(Debug, Error)]
pub enum SimError {
    /// Aggregation failed for the round
    #[error("Aggregation error: {0}")]
    Aggregation(#[from] GroupwiseError),

    /// Experiment configuration rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A local-update worker panicked or went missing
    #[error("Worker failure: {0}")]
    Worker(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_convert() {
        let err: SimError = GroupwiseError::DuplicateClient(4).into();
        assert!(matches!(err, SimError::Aggregation(GroupwiseError::DuplicateClient(4))));
        assert!(err.to_string().contains("Duplicate client id: 4"));
    }

    #[test]
    fn test_toml_errors_convert() {
        let parse: Result<toml::Value, _> = toml::from_str("rounds = = 3");
        let err: SimError = parse.unwrap_err().into();
        assert!(matches!(err, SimError::TomlParse(_)));
    }
}
