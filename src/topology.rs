use std::collections::HashMap;

use crate::error::TopologyError;

pub type NodeId = String;

/// Sentinel routing-table distance for destinations with no active path.
pub const INFINITE: u64 = u64::MAX;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: NodeId,
    pub position: (f32, f32), // cosmetic, consumed by the rendering layer only
    pub storage: HashMap<String, Vec<String>>, // file name -> chunk ids held locally
    pub routing_table: HashMap<NodeId, u64>, // destination -> cumulative cost
}

impl Node {
    fn new(name: &str, position: (f32, f32)) -> Self {
        Self {
            name: name.to_string(),
            position,
            storage: HashMap::new(),
            routing_table: HashMap::new(),
        }
    }

    /// Chunks of `file` held locally, in storage order.
    pub fn chunks_of(&self, file: &str) -> &[String] {
        self.storage.get(file).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub a: NodeId,
    pub b: NodeId,
    pub cost: u64,
    pub active: bool,
}

/// The graph of nodes and weighted links. Adjacency holds active links only
/// and is kept as the symmetric closure of them: no direction ever has an
/// entry the other lacks. Inactive links keep their record (and original
/// cost) so a later toggle can restore them.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: HashMap<NodeId, Node>,
    node_order: Vec<NodeId>, // insertion order, drives deterministic placement
    links: HashMap<(NodeId, NodeId), Link>,
    adjacency: HashMap<NodeId, HashMap<NodeId, u64>>,
}

fn link_key(a: &str, b: &str) -> (NodeId, NodeId) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, name: &str, position: (f32, f32)) -> Result<(), TopologyError> {
        if self.nodes.contains_key(name) {
            return Err(TopologyError::DuplicateNode(name.to_string()));
        }
        self.nodes.insert(name.to_string(), Node::new(name, position));
        self.node_order.push(name.to_string());
        self.adjacency.insert(name.to_string(), HashMap::new());
        Ok(())
    }

    /// Creates the link active in both adjacency directions. Re-adding an
    /// existing pair replaces the old record.
    pub fn add_link(&mut self, a: &str, b: &str, cost: u64) -> Result<(), TopologyError> {
        if !self.nodes.contains_key(a) {
            return Err(TopologyError::UnknownNode(a.to_string()));
        }
        if !self.nodes.contains_key(b) {
            return Err(TopologyError::UnknownNode(b.to_string()));
        }
        if cost == 0 {
            return Err(TopologyError::InvalidCost {
                a: a.to_string(),
                b: b.to_string(),
                cost,
            });
        }

        let (first, second) = link_key(a, b);
        self.links.insert(
            (first.clone(), second.clone()),
            Link {
                a: first.clone(),
                b: second.clone(),
                cost,
                active: true,
            },
        );
        self.adjacency
            .entry(first.clone())
            .or_default()
            .insert(second.clone(), cost);
        self.adjacency.entry(second).or_default().insert(first, cost);
        Ok(())
    }

    /// Flips the active flag of the link between `a` and `b`, symmetrically.
    /// Deactivation removes both adjacency entries; reactivation restores
    /// both at the link's stored original cost. Routing tables are NOT
    /// recomputed here: the caller triggers that as an explicit step.
    ///
    /// Returns the new active state.
    pub fn toggle_link(&mut self, a: &str, b: &str) -> Result<bool, TopologyError> {
        let key = link_key(a, b);
        let link = self.links.get_mut(&key).ok_or_else(|| TopologyError::NoSuchLink {
            a: a.to_string(),
            b: b.to_string(),
        })?;
        link.active = !link.active;
        let (active, cost) = (link.active, link.cost);
        let (first, second) = key;

        if active {
            self.adjacency
                .entry(first.clone())
                .or_default()
                .insert(second.clone(), cost);
            self.adjacency.entry(second).or_default().insert(first, cost);
        } else {
            if let Some(entries) = self.adjacency.get_mut(&first) {
                entries.remove(&second);
            }
            if let Some(entries) = self.adjacency.get_mut(&second) {
                entries.remove(&first);
            }
        }
        Ok(active)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub(crate) fn node_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.nodes.get_mut(name)
    }

    /// Node names in insertion order.
    pub fn node_names(&self) -> &[NodeId] {
        &self.node_order
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.node_order.iter().filter_map(|name| self.nodes.get(name))
    }

    /// Nodes holding at least one chunk of `file`, in insertion order.
    pub fn holders_of<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a Node> {
        self.nodes().filter(move |node| node.storage.contains_key(file))
    }

    /// Active neighbors of `name` with link costs.
    pub fn neighbors(&self, name: &str) -> Option<&HashMap<NodeId, u64>> {
        self.adjacency.get(name)
    }

    pub fn link(&self, a: &str, b: &str) -> Option<&Link> {
        self.links.get(&link_key(a, b))
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }
}
