use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::unbounded;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use crate::placement::FileCatalog;
use crate::routing;
use crate::topology::{NodeId, Topology};
use crate::transfer::{TransferObserver, TransferOutcome, TransferSettings, transfer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// No active path from the holder to the requester at request time.
    NoRoute,
    /// The transfer launched but the chunk was dropped on a hop.
    Lost { from: NodeId, to: NodeId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFailure {
    pub chunk: String,
    pub holder: NodeId,
    pub reason: FailureReason,
}

/// Aggregated outcome of one `(requester, file)` retrieval attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalReport {
    pub requester: NodeId,
    pub file: String,
    pub expected: BTreeSet<String>,
    pub delivered: BTreeSet<String>,
    pub failures: Vec<ChunkFailure>,
}

impl RetrievalReport {
    /// True when every expected chunk arrived, whatever its origin.
    pub fn complete(&self) -> bool {
        self.expected.iter().all(|chunk| self.delivered.contains(chunk))
    }

    pub fn missing(&self) -> BTreeSet<String> {
        self.expected.difference(&self.delivered).cloned().collect()
    }
}

struct TaskReport {
    chunk: String,
    holder: NodeId,
    outcome: TransferOutcome,
}

/// Pulls `file` to `requester` from whichever nodes hold its chunks.
///
/// Routes are resolved up front: chunks with no active path are recorded as
/// failed without launching anything. Every routed (holder, chunk) pair then
/// runs as its own thread, reporting through a result channel — the only
/// shared sink. The call returns after every launched transfer has finished
/// (barrier join). Holders are not deduplicated at send time; completeness is
/// judged on the delivered-set union against the catalog.
pub fn request_file(
    topology: &Topology,
    catalog: &FileCatalog,
    requester: &str,
    file: &str,
    settings: TransferSettings,
    base_seed: u64,
    observer: &Arc<dyn TransferObserver>,
) -> RetrievalReport {
    let expected: BTreeSet<String> = catalog
        .expected_chunks(file)
        .map(|chunks| chunks.iter().cloned().collect())
        .unwrap_or_default();
    if expected.is_empty() {
        warn!(file, "request for a file the catalog does not know");
    }

    let mut report = RetrievalReport {
        requester: requester.to_string(),
        file: file.to_string(),
        expected,
        delivered: BTreeSet::new(),
        failures: Vec::new(),
    };

    // Resolve every route before anything launches; no-route failures are
    // settled synchronously.
    let mut tasks: Vec<(NodeId, String, Vec<NodeId>)> = Vec::new();
    for holder in topology.holders_of(file) {
        for chunk in holder.chunks_of(file) {
            match routing::route(topology, &holder.name, requester) {
                Ok(hops) => tasks.push((holder.name.clone(), chunk.clone(), hops)),
                Err(_) => {
                    warn!(chunk, holder = %holder.name, requester, "no route for chunk");
                    observer.chunk_unroutable(file, chunk, &holder.name);
                    report.failures.push(ChunkFailure {
                        chunk: chunk.clone(),
                        holder: holder.name.clone(),
                        reason: FailureReason::NoRoute,
                    });
                }
            }
        }
    }

    info!(
        file,
        requester,
        transfers = tasks.len(),
        unroutable = report.failures.len(),
        "retrieval started"
    );

    let (result_send, result_recv) = unbounded::<TaskReport>();
    let mut handles = Vec::with_capacity(tasks.len());
    for (i, (holder, chunk, hops)) in tasks.into_iter().enumerate() {
        let sender = result_send.clone();
        let observer = Arc::clone(observer);
        let file = file.to_string();
        handles.push(thread::spawn(move || {
            let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(i as u64));
            let outcome = transfer(&hops, &chunk, &settings, &mut rng, observer.as_ref());
            observer.transfer_finished(&file, &chunk, &holder, &outcome);
            let _ = sender.send(TaskReport {
                chunk,
                holder,
                outcome,
            });
        }));
    }
    drop(result_send);

    // Fan-in: the receiver drains until every task has reported, then the
    // joins make the barrier explicit.
    for task in result_recv.iter() {
        match task.outcome {
            TransferOutcome::Delivered => {
                report.delivered.insert(task.chunk);
            }
            TransferOutcome::Lost { from, to } => {
                report.failures.push(ChunkFailure {
                    chunk: task.chunk,
                    holder: task.holder,
                    reason: FailureReason::Lost { from, to },
                });
            }
        }
    }
    for handle in handles {
        let _ = handle.join();
    }

    if report.complete() {
        info!(file, requester, delivered = report.delivered.len(), "file assembled completely");
    } else {
        info!(
            file,
            requester,
            delivered = report.delivered.len(),
            missing = report.missing().len(),
            "file assembled partially"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::placement::{FileCatalog, distribute};
    use crate::routing::recompute_all;
    use crate::transfer::NoopObserver;

    use super::*;

    fn settings(loss_probability: f64) -> TransferSettings {
        TransferSettings {
            loss_probability,
            hop_steps: 2,
            step_delay: Duration::ZERO,
        }
    }

    fn observer() -> Arc<dyn TransferObserver> {
        Arc::new(NoopObserver)
    }

    // A --- B --- C line with file1 spread round-robin over all three.
    fn line_network() -> (Topology, FileCatalog) {
        let mut topology = Topology::new();
        for name in ["A", "B", "C"] {
            topology.add_node(name, (0.0, 0.0)).unwrap();
        }
        topology.add_link("A", "B", 1).unwrap();
        topology.add_link("B", "C", 1).unwrap();
        let mut catalog = FileCatalog::new();
        distribute(
            &mut topology,
            &mut catalog,
            &[(
                "file1".to_string(),
                vec!["c1".to_string(), "c2".to_string(), "c3".to_string()],
            )],
        )
        .unwrap();
        recompute_all(&mut topology);
        (topology, catalog)
    }

    #[test]
    fn test_lossless_retrieval_is_complete() {
        let (topology, catalog) = line_network();
        let report = request_file(&topology, &catalog, "A", "file1", settings(0.0), 7, &observer());
        assert!(report.complete());
        assert_eq!(report.delivered, report.expected);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_certain_loss_delivers_only_local_chunks() {
        let (topology, catalog) = line_network();
        let report = request_file(&topology, &catalog, "A", "file1", settings(1.0), 7, &observer());
        assert!(!report.complete());
        // A holds c1 itself: the single-node route has no hops to lose it on.
        let local: BTreeSet<String> = ["c1".to_string()].into();
        assert_eq!(report.delivered, local);
        assert_eq!(
            report.missing(),
            BTreeSet::from(["c2".to_string(), "c3".to_string()])
        );
        assert_eq!(report.failures.len(), 2);
        assert!(
            report
                .failures
                .iter()
                .all(|f| matches!(f.reason, FailureReason::Lost { .. }))
        );
    }

    #[test]
    fn test_unreachable_holders_fail_without_launching() {
        let (mut topology, catalog) = line_network();
        // Cut B-C: C's chunk has no path to A.
        topology.toggle_link("B", "C").unwrap();
        recompute_all(&mut topology);

        let report = request_file(&topology, &catalog, "A", "file1", settings(0.0), 7, &observer());
        assert!(!report.complete());
        assert_eq!(report.missing(), BTreeSet::from(["c3".to_string()]));
        assert_eq!(
            report.failures,
            vec![ChunkFailure {
                chunk: "c3".to_string(),
                holder: "C".to_string(),
                reason: FailureReason::NoRoute,
            }]
        );
    }

    #[test]
    fn test_duplicate_holders_union_in_delivered_set() {
        let (mut topology, catalog) = line_network();
        // C also holds a copy of c2: both holders send, the union dedups.
        topology
            .node_mut("C")
            .unwrap()
            .storage
            .get_mut("file1")
            .unwrap()
            .push("c2".to_string());

        let report = request_file(&topology, &catalog, "A", "file1", settings(0.0), 7, &observer());
        assert!(report.complete());
        assert_eq!(report.delivered.len(), 3);
    }

    #[test]
    fn test_unknown_file_yields_empty_report() {
        let (topology, catalog) = line_network();
        let report = request_file(&topology, &catalog, "A", "nofile", settings(0.0), 7, &observer());
        assert!(report.expected.is_empty());
        assert!(report.delivered.is_empty());
        assert!(report.failures.is_empty());
    }
}
