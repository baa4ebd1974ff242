//! # Local-update stage
//!
//! Clients train in parallel on scoped worker threads. Every worker holds a
//! clone of the broadcast `Arc` and a disjoint slice of clients; results come
//! back over a crossbeam channel and are re-ordered by client index before the
//! clustering barrier.
//!
//! ```text
//! Arc<global> ──┬── worker 0: clients[0..c]   ──┐
//!               ├── worker 1: clients[c..2c]  ──┼──▶ channel ──▶ sort by index
//!               └── worker k: clients[..]     ──┘
//! ```

use std::sync::Arc;

use crossbeam_channel::unbounded;
use groupwise_core::{ClientSubmission, StructuredModel, VectorCodec};
use tracing::debug;

use crate::client::{LocalTraining, SimulatedClient};
use crate::error::{SimError, SimResult};

// ═══════════════════════════════════════════════════════════════════════════════
// PARALLEL LOCAL TRAINING
// ═══════════════════════════════════════════════════════════════════════════════

/// Run every client's local update against the broadcast model
///
/// `weights[i]` is the stake of `clients[i]`. The returned submissions are in
/// client order regardless of which worker finished first.
pub fn run_local_stage(
    clients: &mut [SimulatedClient],
    weights: &[f64],
    global: &Arc<StructuredModel>,
    codec: &VectorCodec,
    training: &LocalTraining,
    workers: usize,
) -> SimResult<Vec<ClientSubmission>> {
    if weights.len() != clients.len() {
        return Err(SimError::InvalidConfiguration(format!(
            "{} stakes for {} clients",
            weights.len(),
            clients.len()
        )));
    }
    if clients.is_empty() {
        return Ok(Vec::new());
    }

    let expected = clients.len();
    let chunk = expected.div_ceil(workers.max(1));
    let (tx, rx) = unbounded::<(usize, SimResult<ClientSubmission>)>();

    crossbeam_utils::thread::scope(|scope| {
        for (worker, batch) in clients.chunks_mut(chunk).enumerate() {
            let tx = tx.clone();
            let model = Arc::clone(global);
            scope.spawn(move |_| {
                let params = model.flatten();
                for (offset, client) in batch.iter_mut().enumerate() {
                    let index = worker * chunk + offset;
                    let vector = client.local_update(&params, training);
                    let submission = codec
                        .restore(&vector)
                        .map(|m| ClientSubmission::new(client.id(), m, weights[index]))
                        .map_err(SimError::from);
                    if tx.send((index, submission)).is_err() {
                        return;
                    }
                }
                debug!(worker, clients = batch.len(), "local updates done");
            });
        }
    })
    .map_err(|_| SimError::Worker("local-update worker panicked".into()))?;
    drop(tx);

    let mut results: Vec<_> = rx.iter().collect();
    if results.len() != expected {
        return Err(SimError::Worker(format!(
            "expected {} local updates, received {}",
            expected,
            results.len()
        )));
    }
    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, submission)| submission).collect()
}
