//! # Similarity Clusterer
//!
//! k-means-style partitioning of client updates with cosine similarity as the
//! affinity and a robust [`AggregationStrategy`] in place of the plain mean
//! when recomputing centroids.
//!
//! ```text
//!   ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//!   │  Centroids   │────▶│  Assignment  │────▶│    Update    │
//!   │  (snapshot)  │     │ max cos sim  │     │  internal    │
//!   └──────────────┘     └──────────────┘     │  strategy    │
//!          ▲                                  └──────┬───────┘
//!          │        min cos(old, new) < threshold    │
//!          └─────────────────────────────────────────┘
//! ```
//!
//! Each iteration produces a new [`Centroids`] snapshot; the previous one is
//! never mutated, so the convergence test always compares two whole sets.
//!
//! ## Complexity
//!
//! O(N × K × D) per iteration for the assignment sweep, plus whatever the
//! internal strategy costs for the update step. Iterations are capped by
//! `max_iterations`.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, warn};

use crate::config::ClusteringParams;
use crate::error::{GroupwiseError, Result};
use crate::similarity::{cosine_similarity, snapshot_similarity};
use crate::strategy::{AggregationStrategy, WeightedVector};
use crate::types::{ClientUpdate, ClusterAssignment};

/// One immutable set of K centroid vectors
#[derive(Debug, Clone, PartialEq)]
pub struct Centroids {
    vectors: Vec<Vec<f64>>,
}

impl Centroids {
    pub fn new(vectors: Vec<Vec<f64>>) -> Self {
        Self { vectors }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&[f64]> {
        self.vectors.get(index).map(Vec::as_slice)
    }

    pub fn vectors(&self) -> &[Vec<f64>] {
        &self.vectors
    }

    /// Common vector length, if every centroid agrees
    pub fn dimension(&self) -> Option<usize> {
        let dim = self.vectors.first()?.len();
        self.vectors.iter().all(|v| v.len() == dim).then_some(dim)
    }

    /// Index of the most similar centroid
    ///
    /// Every centroid is scored before choosing; ties go to the lowest index.
    pub fn nearest(&self, vector: &[f64]) -> usize {
        let sims: Vec<f64> = self
            .vectors
            .iter()
            .map(|c| cosine_similarity(vector, c))
            .collect();

        let mut choice = 0;
        let mut best = f64::NEG_INFINITY;
        for (index, &sim) in sims.iter().enumerate() {
            if sim > best {
                best = sim;
                choice = index;
            }
        }
        choice
    }

    /// Minimum per-index similarity between this snapshot and `next`
    pub fn stability(&self, next: &Centroids) -> f64 {
        self.vectors
            .iter()
            .zip(&next.vectors)
            .map(|(old, new)| snapshot_similarity(old, new))
            .fold(f64::INFINITY, f64::min)
    }
}

/// Result of one clustering run
#[derive(Debug, Clone)]
pub struct ClusteringOutcome {
    pub assignment: ClusterAssignment,
    /// Centroids after the last update step
    pub centroids: Centroids,
    pub iterations: usize,
    /// `false` when the iteration cap was hit first
    pub converged: bool,
    /// Minimum old/new centroid similarity at the last iteration
    pub stability: f64,
}

/// Pick K initial centroids uniformly at random without replacement
///
/// With fewer than K updates every update is picked and the remaining slots
/// duplicate earlier picks. Duplicates lose every tie against the centroid they copy,
/// so their clusters stay empty.
pub fn initial_centroids<R: Rng + ?Sized>(
    updates: &[ClientUpdate],
    cluster_count: usize,
    rng: &mut R,
) -> Result<Centroids> {
    if updates.is_empty() {
        return Err(GroupwiseError::EmptyAggregationInput(
            "cannot initialise centroids without client updates".into(),
        ));
    }

    let picks = rand::seq::index::sample(rng, updates.len(), cluster_count.min(updates.len())).into_vec();
    let mut vectors: Vec<Vec<f64>> = picks.iter().map(|&i| updates[i].vector.clone()).collect();

    let distinct = vectors.len();
    for slot in distinct..cluster_count {
        vectors.push(vectors[slot % distinct].clone());
    }

    Ok(Centroids::new(vectors))
}

/// Run assignment/update iterations from a fixed starting snapshot
pub fn converge(
    params: &ClusteringParams,
    updates: &[ClientUpdate],
    initial: Centroids,
    strategy: &mut dyn AggregationStrategy,
) -> Result<ClusteringOutcome> {
    let dim = check_dimensions(updates)?;
    if initial.len() != params.cluster_count || initial.dimension() != Some(dim) {
        return Err(GroupwiseError::InvalidInput(format!(
            "initial centroids must be {} vectors of length {}",
            params.cluster_count, dim
        )));
    }

    let client_ids: Vec<_> = updates.iter().map(|u| u.client_id).collect();
    let mut centroids = initial;
    let mut iterations = 0;

    loop {
        let choices: Vec<usize> = updates.iter().map(|u| centroids.nearest(&u.vector)).collect();
        let next = update_centroids(&centroids, updates, &choices, strategy)?;
        iterations += 1;

        let stability = centroids.stability(&next);
        debug!(iteration = iterations, stability, "clustering iteration");

        let converged = stability >= params.convergence_threshold;
        if converged || iterations >= params.max_iterations {
            if !converged {
                warn!(
                    iterations,
                    stability,
                    threshold = params.convergence_threshold,
                    "clustering did not converge, using last assignment"
                );
            }
            return Ok(ClusteringOutcome {
                assignment: ClusterAssignment::new(params.cluster_count, client_ids, choices),
                centroids: next,
                iterations,
                converged,
                stability,
            });
        }

        centroids = next;
    }
}

/// Recompute every non-empty cluster's centroid with the strategy
fn update_centroids(
    current: &Centroids,
    updates: &[ClientUpdate],
    choices: &[usize],
    strategy: &mut dyn AggregationStrategy,
) -> Result<Centroids> {
    let mut next = Vec::with_capacity(current.len());

    for (cluster, old) in current.vectors().iter().enumerate() {
        let members: Vec<WeightedVector<'_>> = updates
            .iter()
            .zip(choices)
            .filter(|&(_, &c)| c == cluster)
            .map(|(u, _)| WeightedVector::new(u.weight, &u.vector))
            .collect();

        if members.is_empty() {
            debug!(cluster, "empty cluster keeps its previous centroid");
            next.push(old.clone());
        } else {
            next.push(strategy.aggregate(&members)?);
        }
    }

    Ok(Centroids::new(next))
}

fn check_dimensions(updates: &[ClientUpdate]) -> Result<usize> {
    let first = updates.first().ok_or_else(|| {
        GroupwiseError::EmptyAggregationInput("no client updates to cluster".into())
    })?;
    let dim = first.vector.len();
    for update in updates {
        if update.vector.len() != dim {
            return Err(GroupwiseError::DimensionMismatch {
                expected: dim,
                actual: update.vector.len(),
            });
        }
    }
    Ok(dim)
}

/// Stateful clusterer carrying centroids from one round to the next
#[derive(Debug, Clone)]
pub struct SimilarityClusterer {
    params: ClusteringParams,
    rng: StdRng,
    previous: Option<Centroids>,
}

impl SimilarityClusterer {
    /// Clusterer with a seeded random source
    pub fn new(params: ClusteringParams, seed: u64) -> Result<Self> {
        Self::with_rng(params, StdRng::seed_from_u64(seed))
    }

    /// Clusterer with an injected random source
    pub fn with_rng(params: ClusteringParams, rng: StdRng) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            rng,
            previous: None,
        })
    }

    pub fn params(&self) -> &ClusteringParams {
        &self.params
    }

    /// Final centroids of the last successful run
    pub fn previous_centroids(&self) -> Option<&Centroids> {
        self.previous.as_ref()
    }

    /// Seed the next run with known centroids instead of a random pick
    ///
    /// Centroids that do not fit the next round are discarded with a warning,
    /// like any carried-over snapshot.
    pub fn warm_start(&mut self, centroids: Centroids) -> Result<()> {
        if centroids.len() != self.params.cluster_count {
            return Err(GroupwiseError::InvalidInput(format!(
                "expected {} centroids, got {}",
                self.params.cluster_count,
                centroids.len()
            )));
        }
        self.previous = Some(centroids);
        Ok(())
    }

    /// Forget carried-over centroids; the next run re-initialises randomly
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Cluster one round of updates
    pub fn cluster(
        &mut self,
        updates: &[ClientUpdate],
        strategy: &mut dyn AggregationStrategy,
    ) -> Result<ClusteringOutcome> {
        let dim = check_dimensions(updates)?;

        let initial = match &self.previous {
            Some(prev) if prev.dimension() == Some(dim) && prev.len() == self.params.cluster_count => {
                prev.clone()
            }
            Some(_) => {
                warn!(dimension = dim, "carried-over centroids do not fit this round, re-initialising");
                initial_centroids(updates, self.params.cluster_count, &mut self.rng)?
            }
            None => initial_centroids(updates, self.params.cluster_count, &mut self.rng)?,
        };

        let outcome = converge(&self.params, updates, initial, strategy)?;
        self.previous = Some(outcome.centroids.clone());
        Ok(outcome)
    }
}
