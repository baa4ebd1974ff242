//! Client roles in a simulated federation

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a simulated client produces its update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientBehavior {
    /// Trains towards its local optimum
    #[default]
    Honest,
    /// Byzantine: submits large random parameters
    Faulty,
    /// Label flipping: trains towards the mirrored optimum
    Malicious,
    /// Sends back the broadcast model with negligible noise
    FreeRider,
}

impl ClientBehavior {
    pub fn is_adversarial(self) -> bool {
        !matches!(self, ClientBehavior::Honest)
    }

    pub fn label(self) -> &'static str {
        match self {
            ClientBehavior::Honest => "honest",
            ClientBehavior::Faulty => "faulty",
            ClientBehavior::Malicious => "malicious",
            ClientBehavior::FreeRider => "free_rider",
        }
    }
}

impl fmt::Display for ClientBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adversarial_roles() {
        assert!(!ClientBehavior::Honest.is_adversarial());
        assert!(ClientBehavior::Faulty.is_adversarial());
        assert!(ClientBehavior::Malicious.is_adversarial());
        assert!(ClientBehavior::FreeRider.is_adversarial());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&ClientBehavior::FreeRider).unwrap();
        assert_eq!(json, "\"free_rider\"");
        assert_eq!(ClientBehavior::FreeRider.to_string(), "free_rider");
    }
}
