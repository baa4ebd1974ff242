//! # groupwise-core - Hierarchical Robust Aggregation
//!
//! Two-level aggregation for federated learning under adversarial clients.
//! Client updates are grouped by cosine similarity, reduced inside each group
//! by an internal strategy, and the group representatives are combined by an
//! external strategy weighted by group size.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 HierarchicalAggregator                      │
//! │  ┌───────────────────────────────────────────────────────┐  │
//! │  │  VectorCodec        structured model ⇄ flat vector    │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! │  ┌───────────────────────────────────────────────────────┐  │
//! │  │  SimilarityClusterer   cosine k-means, K fixed        │  │
//! │  │  centroid update = internal AggregationStrategy       │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! │  ┌───────────────────────────────────────────────────────┐  │
//! │  │  internal strategy per cluster → representatives      │  │
//! │  │  external strategy across representatives → global   │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! │  RoundLedger: assignments + cluster weights per round       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use groupwise_core::prelude::*;
//!
//! let template = ShapeTemplate::default().with_block("w", vec![2]);
//! let mut aggregator =
//!     HierarchicalAggregator::new(AggregatorConfig::default(), StructuredModel::zeros(&template))?;
//!
//! let outcome = aggregator.run_round(&submissions)?;
//! println!("round {} → {:?}", outcome.round, outcome.record.cluster_weights);
//! ```

pub mod error;
pub use error::{GroupwiseError, Result};

pub mod aggregator;
pub mod clusterer;
pub mod codec;
pub mod config;
pub mod ledger;
pub mod similarity;
pub mod strategy;
pub mod types;

pub use aggregator::{cluster_weights, HierarchicalAggregator, RoundOutcome};
pub use clusterer::{converge, initial_centroids, Centroids, ClusteringOutcome, SimilarityClusterer};
pub use codec::{BlockShape, ParameterBlock, ShapeTemplate, StructuredModel, VectorCodec};
pub use config::{AggregatorConfig, ClusteringParams};
pub use ledger::{ClusteringReport, RoundLedger, RoundRecord, StrategyAudit};
pub use strategy::{
    AggregationStrategy, CoordinateMedian, MultiKrum, StrategyKind, TrimmedMean, WeightedMean,
    WeightedVector,
};
pub use types::{ClientId, ClientSubmission, ClientUpdate, ClusterAssignment, ClusterRepresentative};

/// Prelude module with common re-exports
pub mod prelude {
    pub use crate::aggregator::{HierarchicalAggregator, RoundOutcome};
    pub use crate::codec::{ParameterBlock, ShapeTemplate, StructuredModel, VectorCodec};
    pub use crate::config::AggregatorConfig;
    pub use crate::error::{GroupwiseError, Result};
    pub use crate::ledger::{RoundLedger, RoundRecord};
    pub use crate::strategy::{AggregationStrategy, StrategyKind, WeightedVector};
    pub use crate::types::{ClientId, ClientSubmission, ClientUpdate};
}
