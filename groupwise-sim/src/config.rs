//! Experiment configuration loaded from TOML
//!
//! ```toml
//! name = "byzantine-30"
//! rounds = 20
//! clients = 30
//! faulty = [0, 1, 2]
//! malicious = [3]
//! free_riding = [4]
//!
//! [aggregator]
//! cluster_count = 3
//! internal = { kind = "coordinate_median" }
//! external = { kind = "weighted_mean" }
//! ```

use std::collections::HashSet;
use std::path::Path;

use groupwise_core::{AggregatorConfig, ClientId, ShapeTemplate};
use serde::{Deserialize, Serialize};

use crate::behavior::ClientBehavior;
use crate::error::{SimError, SimResult};

/// Small two-layer perceptron used when no template is configured
pub fn default_template() -> ShapeTemplate {
    ShapeTemplate::default()
        .with_block("fc1.weight", vec![8, 4])
        .with_block("fc1.bias", vec![8])
        .with_block("out.weight", vec![2, 8])
        .with_block("out.bias", vec![2])
}

/// One simulated experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub name: String,
    /// Sequential rounds to run
    pub rounds: usize,
    /// Number of simulated clients
    pub clients: usize,
    /// Worker threads for the local-update stage
    pub workers: usize,
    /// Seed for the honest optimum, client data and behaviours
    pub seed: u64,
    /// Local steps per round
    pub local_steps: usize,
    /// Fraction of the gap to the local optimum closed per step
    pub learning_rate: f64,
    /// Per-coordinate noise added to every honest step
    pub noise: f64,
    /// Spread of the local optima around the honest optimum
    pub heterogeneity: f64,
    /// Amplitude of faulty clients' random parameters
    pub faulty_scale: f64,
    /// Local sample counts are drawn from `min_samples..=max_samples`
    pub min_samples: usize,
    pub max_samples: usize,
    pub faulty: Vec<ClientId>,
    pub malicious: Vec<ClientId>,
    pub free_riding: Vec<ClientId>,
    pub aggregator: AggregatorConfig,
    pub template: ShapeTemplate,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            name: "default".into(),
            rounds: 10,
            clients: 30,
            workers: 4,
            seed: 0,
            local_steps: 5,
            learning_rate: 0.3,
            noise: 0.01,
            heterogeneity: 0.05,
            faulty_scale: 100.0,
            min_samples: 50,
            max_samples: 500,
            faulty: Vec::new(),
            malicious: Vec::new(),
            free_riding: Vec::new(),
            aggregator: AggregatorConfig::default(),
            template: default_template(),
        }
    }
}

impl ExperimentConfig {
    /// Parse a configuration from a TOML string
    pub fn from_toml_str(content: &str) -> SimResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file
    pub fn from_file(path: &Path) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml(&self) -> SimResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Role of a client id under this configuration
    pub fn behavior_of(&self, id: ClientId) -> ClientBehavior {
        if self.faulty.contains(&id) {
            ClientBehavior::Faulty
        } else if self.malicious.contains(&id) {
            ClientBehavior::Malicious
        } else if self.free_riding.contains(&id) {
            ClientBehavior::FreeRider
        } else {
            ClientBehavior::Honest
        }
    }

    pub fn adversary_count(&self) -> usize {
        self.faulty.len() + self.malicious.len() + self.free_riding.len()
    }

    pub fn validate(&self) -> SimResult<()> {
        let invalid = |msg: String| Err(SimError::InvalidConfiguration(msg));

        if self.rounds == 0 {
            return invalid("rounds must be positive".into());
        }
        if self.clients == 0 {
            return invalid("clients must be positive".into());
        }
        if self.workers == 0 {
            return invalid("workers must be positive".into());
        }
        if self.local_steps == 0 {
            return invalid("local_steps must be positive".into());
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return invalid(format!("learning_rate must be in (0, 1], got {}", self.learning_rate));
        }
        for (field, value) in [
            ("noise", self.noise),
            ("heterogeneity", self.heterogeneity),
            ("faulty_scale", self.faulty_scale),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return invalid(format!("{field} must be finite and non-negative, got {value}"));
            }
        }
        if self.min_samples == 0 || self.min_samples > self.max_samples {
            return invalid(format!(
                "sample range {}..={} is empty or starts at zero",
                self.min_samples, self.max_samples
            ));
        }
        if self.template.is_empty() || self.template.total_len() == 0 {
            return invalid("template has no parameters".into());
        }

        let mut seen = HashSet::new();
        for &id in self.faulty.iter().chain(&self.malicious).chain(&self.free_riding) {
            if id >= self.clients as ClientId {
                return invalid(format!("adversarial client {id} is out of range"));
            }
            if !seen.insert(id) {
                return invalid(format!("client {id} has more than one adversarial role"));
            }
        }

        self.aggregator.validate()?;
        Ok(())
    }
}
