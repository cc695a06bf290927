use std::thread;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

use crate::topology::NodeId;

/// Knobs for a single simulated transfer. `hop_steps`/`step_delay` only feed
/// the cosmetic progress callbacks; the pass/fail logic ignores them.
#[derive(Debug, Clone, Copy)]
pub struct TransferSettings {
    pub loss_probability: f64,
    pub hop_steps: u32,
    pub step_delay: Duration,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            loss_probability: 0.1,
            hop_steps: 20,
            step_delay: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Delivered,
    /// The chunk was dropped on the hop from `from` to `to`. Nothing reaches
    /// the destination.
    Lost { from: NodeId, to: NodeId },
}

/// Observer for everything a transfer does that the core does not need:
/// packet movement for the rendering layer and delivery bookkeeping events.
/// All methods default to no-ops so tests can run transfers silently.
pub trait TransferObserver: Send + Sync {
    /// Fired `hop_steps` times per hop while the packet is "moving".
    fn hop_progress(&self, _chunk: &str, _from: &str, _to: &str, _step: u32, _steps: u32) {}

    /// Fired once per launched transfer with its final outcome.
    fn transfer_finished(&self, _file: &str, _chunk: &str, _holder: &str, _outcome: &TransferOutcome) {
    }

    /// Fired for chunks that never launch because no route exists.
    fn chunk_unroutable(&self, _file: &str, _chunk: &str, _holder: &str) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl TransferObserver for NoopObserver {}

/// Walks `route` hop by hop, drawing one uniform value per hop against the
/// configured loss probability. A failed draw aborts the whole transfer: no
/// retry, no partial delivery. The draw happens after the simulated hop
/// latency. A single-node route has no hops and always delivers.
pub fn transfer(
    route: &[NodeId],
    chunk: &str,
    settings: &TransferSettings,
    rng: &mut impl Rng,
    observer: &dyn TransferObserver,
) -> TransferOutcome {
    for pair in route.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        for step in 1..=settings.hop_steps {
            observer.hop_progress(chunk, current, next, step, settings.hop_steps);
            if !settings.step_delay.is_zero() {
                thread::sleep(settings.step_delay);
            }
        }
        if rng.r#gen::<f64>() < settings.loss_probability {
            debug!(chunk, from = %current, to = %next, "chunk lost in transit");
            return TransferOutcome::Lost {
                from: current.clone(),
                to: next.clone(),
            };
        }
    }
    TransferOutcome::Delivered
}
