use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::PlacementError;
use crate::topology::Topology;

/// Authoritative record of what every distributed file is supposed to
/// contain. Retrieval judges completeness against this, not against any
/// single node's holdings.
#[derive(Debug, Clone, Default)]
pub struct FileCatalog {
    files: HashMap<String, Vec<String>>, // file name -> full ordered chunk list
}

impl FileCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expected_chunks(&self, file: &str) -> Option<&[String]> {
        self.files.get(file).map(Vec::as_slice)
    }

    pub fn contains(&self, file: &str) -> bool {
        self.files.contains_key(file)
    }

    fn record(&mut self, file: &str, chunks: &[String]) -> Result<(), PlacementError> {
        if self.files.contains_key(file) {
            return Err(PlacementError::DuplicateFile(file.to_string()));
        }
        self.files.insert(file.to_string(), chunks.to_vec());
        Ok(())
    }
}

/// Assigns chunk `i` of each file to node `i % n` in topology insertion
/// order, appending to that node's local storage, and records the full chunk
/// list in the catalog. Deterministic for a fixed node order. Distributing a
/// file twice is rejected, so a fresh run never duplicates storage entries.
pub fn distribute(
    topology: &mut Topology,
    catalog: &mut FileCatalog,
    files: &[(String, Vec<String>)],
) -> Result<(), PlacementError> {
    let order = topology.node_names().to_vec();
    if order.is_empty() && !files.is_empty() {
        return Err(PlacementError::NoNodes);
    }

    for (file, chunks) in files {
        catalog.record(file, chunks)?;
        for (i, chunk) in chunks.iter().enumerate() {
            let name = &order[i % order.len()];
            if let Some(node) = topology.node_mut(name) {
                node.storage
                    .entry(file.clone())
                    .or_default()
                    .push(chunk.clone());
            }
        }
        info!(file, chunks = chunks.len(), "distributed file over {} nodes", order.len());
    }

    for node in topology.nodes() {
        debug!(node = %node.name, storage = ?node.storage, "chunk placement");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, chunks: &[&str]) -> (String, Vec<String>) {
        (
            name.to_string(),
            chunks.iter().map(|c| c.to_string()).collect(),
        )
    }

    fn three_nodes() -> Topology {
        let mut topology = Topology::new();
        for name in ["A", "B", "C"] {
            topology.add_node(name, (0.0, 0.0)).unwrap();
        }
        topology
    }

    #[test]
    fn test_round_robin_assignment() {
        let mut topology = three_nodes();
        let mut catalog = FileCatalog::new();
        distribute(
            &mut topology,
            &mut catalog,
            &[file("file1", &["c1", "c2", "c3", "c4"])],
        )
        .unwrap();

        assert_eq!(topology.node("A").unwrap().chunks_of("file1"), ["c1", "c4"]);
        assert_eq!(topology.node("B").unwrap().chunks_of("file1"), ["c2"]);
        assert_eq!(topology.node("C").unwrap().chunks_of("file1"), ["c3"]);
        assert_eq!(
            catalog.expected_chunks("file1").unwrap(),
            ["c1", "c2", "c3", "c4"]
        );
    }

    #[test]
    fn test_files_distribute_independently() {
        let mut topology = three_nodes();
        let mut catalog = FileCatalog::new();
        distribute(
            &mut topology,
            &mut catalog,
            &[file("file1", &["c1", "c2"]), file("file2", &["c1"])],
        )
        .unwrap();

        // Each file restarts its round-robin at the first node.
        assert_eq!(topology.node("A").unwrap().chunks_of("file1"), ["c1"]);
        assert_eq!(topology.node("A").unwrap().chunks_of("file2"), ["c1"]);
        assert_eq!(topology.node("B").unwrap().chunks_of("file1"), ["c2"]);
        assert!(topology.node("C").unwrap().storage.is_empty());
    }

    #[test]
    fn test_double_distribution_is_rejected() {
        let mut topology = three_nodes();
        let mut catalog = FileCatalog::new();
        let files = [file("file1", &["c1"])];
        distribute(&mut topology, &mut catalog, &files).unwrap();
        assert_eq!(
            distribute(&mut topology, &mut catalog, &files),
            Err(PlacementError::DuplicateFile("file1".to_string()))
        );
        // The guard fired before any storage was touched again.
        assert_eq!(topology.node("A").unwrap().chunks_of("file1"), ["c1"]);
    }

    #[test]
    fn test_empty_topology_is_rejected() {
        let mut topology = Topology::new();
        let mut catalog = FileCatalog::new();
        assert_eq!(
            distribute(&mut topology, &mut catalog, &[file("file1", &["c1"])]),
            Err(PlacementError::NoNodes)
        );
    }
}
