use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::error::RoutingError;
use crate::topology::{INFINITE, NodeId, Topology};

/// Single-source Dijkstra over the current active adjacency.
///
/// Returns the distance to every node (unreachable ones map to [`INFINITE`])
/// and the predecessor map used for path reconstruction. Never mutates the
/// topology.
pub fn shortest_paths(
    topology: &Topology,
    source: &str,
) -> (HashMap<NodeId, u64>, HashMap<NodeId, NodeId>) {
    let mut distances: HashMap<NodeId, u64> = topology
        .node_names()
        .iter()
        .map(|name| (name.clone(), INFINITE))
        .collect();
    let mut previous: HashMap<NodeId, NodeId> = HashMap::new();

    if !distances.contains_key(source) {
        return (distances, previous);
    }
    distances.insert(source.to_string(), 0);

    let mut queue = BinaryHeap::new();
    queue.push(Reverse((0u64, source.to_string())));

    while let Some(Reverse((distance, current))) = queue.pop() {
        if distance > distances[&current] {
            continue; // stale queue entry
        }
        let Some(neighbors) = topology.neighbors(&current) else {
            continue;
        };
        for (neighbor, cost) in neighbors {
            let candidate = distance + cost;
            if candidate < distances[neighbor] {
                distances.insert(neighbor.clone(), candidate);
                previous.insert(neighbor.clone(), current.clone());
                queue.push(Reverse((candidate, neighbor.clone())));
            }
        }
    }

    (distances, previous)
}

/// Runs [`shortest_paths`] for every node and stores the distance map as
/// that node's routing table. Called after any topology mutation.
pub fn recompute_all(topology: &mut Topology) {
    let tables: Vec<(NodeId, HashMap<NodeId, u64>)> = topology
        .node_names()
        .to_vec()
        .into_iter()
        .map(|name| {
            let (distances, _) = shortest_paths(topology, &name);
            (name, distances)
        })
        .collect();
    for (name, table) in tables {
        if let Some(node) = topology.node_mut(&name) {
            node.routing_table = table;
        }
    }
}

/// Reconstructs the shortest route from `src` to `dst` under the current
/// active links, source and destination inclusive. A single-node route when
/// `src == dst`.
pub fn route(topology: &Topology, src: &str, dst: &str) -> Result<Vec<NodeId>, RoutingError> {
    let (distances, previous) = shortest_paths(topology, src);
    match distances.get(dst) {
        Some(&distance) if distance != INFINITE => {}
        _ => {
            return Err(RoutingError::Unreachable {
                src: src.to_string(),
                dst: dst.to_string(),
            });
        }
    }

    let mut hops = vec![dst.to_string()];
    let mut current = dst;
    while current != src {
        let prev = &previous[current];
        hops.push(prev.clone());
        current = prev;
    }
    hops.reverse();
    Ok(hops)
}
