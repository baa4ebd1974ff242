//! # groupwise-sim - Simulated Adversarial Federation
//!
//! Drives [`groupwise_core::HierarchicalAggregator`] with synthetic clients:
//! honest participants contract towards private optima scattered around a
//! shared honest optimum, while faulty, malicious and free-riding clients
//! submit their own kind of bad update.
//!
//! ## Round
//!
//! ```text
//! broadcast Arc<model> → parallel local stage → ordered submissions
//!     → hierarchical aggregation → new broadcast model → RoundSummary
//! ```

pub mod behavior;
pub mod client;
pub mod config;
pub mod error;
pub mod federation;
pub mod stage;

pub use behavior::ClientBehavior;
pub use client::{sample_weights, LocalTraining, SimulatedClient};
pub use config::{default_template, ExperimentConfig};
pub use error::{SimError, SimResult};
pub use federation::{
    flagged_clients, relative_error, BlockedCounts, ExperimentReport, Federation, RoundSummary,
};
pub use stage::run_local_stage;
