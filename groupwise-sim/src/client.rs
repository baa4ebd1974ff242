//! Simulated clients
//!
//! Local training is a synthetic contraction towards a private optimum: each
//! step closes `learning_rate` of the gap and adds uniform noise. Adversarial
//! roles replace that step with their own update rule.

use groupwise_core::ClientId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::behavior::ClientBehavior;

/// Noise amplitude for free riders, small enough to look like a real update
pub const FREE_RIDER_NOISE: f64 = 1e-6;

/// Knobs shared by all clients of a federation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTraining {
    pub steps: usize,
    pub learning_rate: f64,
    pub noise: f64,
    pub faulty_scale: f64,
}

/// One participant with private data
#[derive(Debug, Clone)]
pub struct SimulatedClient {
    id: ClientId,
    behavior: ClientBehavior,
    samples: usize,
    /// Optimum of the client's private data
    local_optimum: Vec<f64>,
    rng: StdRng,
}

impl SimulatedClient {
    pub fn new(
        id: ClientId,
        behavior: ClientBehavior,
        samples: usize,
        local_optimum: Vec<f64>,
        seed: u64,
    ) -> Self {
        Self {
            id,
            behavior,
            samples,
            local_optimum,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn behavior(&self) -> ClientBehavior {
        self.behavior
    }

    /// Local sample count n_i
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn local_optimum(&self) -> &[f64] {
        &self.local_optimum
    }

    /// Produce this round's update from the broadcast parameters
    pub fn local_update(&mut self, global: &[f64], training: &LocalTraining) -> Vec<f64> {
        match self.behavior {
            ClientBehavior::Honest => {
                let target = self.local_optimum.clone();
                self.train_towards(global, &target, training)
            }
            ClientBehavior::Malicious => {
                let flipped: Vec<f64> = self.local_optimum.iter().map(|x| -x).collect();
                self.train_towards(global, &flipped, training)
            }
            ClientBehavior::Faulty => {
                let scale = training.faulty_scale;
                global
                    .iter()
                    .map(|_| self.rng.gen_range(-scale..=scale))
                    .collect()
            }
            ClientBehavior::FreeRider => global
                .iter()
                .map(|&x| x + self.rng.gen_range(-FREE_RIDER_NOISE..=FREE_RIDER_NOISE))
                .collect(),
        }
    }

    fn train_towards(&mut self, start: &[f64], target: &[f64], training: &LocalTraining) -> Vec<f64> {
        let mut params = start.to_vec();
        let noise = training.noise;
        for _ in 0..training.steps {
            for (p, &t) in params.iter_mut().zip(target) {
                *p += training.learning_rate * (t - *p) + self.rng.gen_range(-noise..=noise);
            }
        }
        params
    }
}

/// Stake of each client: n_i / Σ n
pub fn sample_weights(clients: &[SimulatedClient]) -> Vec<f64> {
    let total: usize = clients.iter().map(|c| c.samples).sum();
    if total == 0 {
        return vec![1.0 / clients.len().max(1) as f64; clients.len()];
    }
    clients
        .iter()
        .map(|c| c.samples as f64 / total as f64)
        .collect()
}
