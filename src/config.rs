use std::collections::HashSet;
use std::fs;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::error::{ConfigError, Result};
use crate::placement::{self, FileCatalog};
use crate::routing;
use crate::topology::Topology;
use crate::transfer::TransferSettings;

fn default_loss_probability() -> f64 {
    0.1
}

fn default_hop_steps() -> u32 {
    20
}

fn default_step_delay_ms() -> u64 {
    50
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Settings {
    #[serde(default = "default_loss_probability")]
    pub loss_probability: f64,
    #[serde(default = "default_hop_steps")]
    pub hop_steps: u32,
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    /// Fixed seed for reproducible loss patterns; drawn from entropy when
    /// absent.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            loss_probability: default_loss_probability(),
            hop_steps: default_hop_steps(),
            step_delay_ms: default_step_delay_ms(),
            rng_seed: None,
        }
    }
}

impl Settings {
    pub fn transfer_settings(&self) -> TransferSettings {
        TransferSettings {
            loss_probability: self.loss_probability,
            hop_steps: self.hop_steps,
            step_delay: Duration::from_millis(self.step_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeDef {
    pub name: String,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkDef {
    pub a: String,
    pub b: String,
    pub cost: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileDef {
    pub name: String,
    pub chunks: Vec<String>,
}

/// Static network definition loaded at startup: nodes with cosmetic
/// positions, weighted links, and the initial file placement input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub node: Vec<NodeDef>,
    #[serde(default)]
    pub link: Vec<LinkDef>,
    #[serde(default)]
    pub file: Vec<FileDef>,
}

fn check_loss_probability(p: f64) -> bool {
    (0.0..=1.0).contains(&p)
}

impl NetworkConfig {
    pub fn load(path: &str) -> std::result::Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        let config: NetworkConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source: Box::new(source),
        })?;
        config.validate()?;
        info!(
            path,
            nodes = config.node.len(),
            links = config.link.len(),
            files = config.file.len(),
            "network config loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        let mut names = HashSet::new();
        for node in &self.node {
            if node.name.is_empty() {
                return invalid("node with empty name".to_string());
            }
            if !names.insert(node.name.as_str()) {
                return invalid(format!("duplicate node {}", node.name));
            }
        }

        let mut pairs = HashSet::new();
        for link in &self.link {
            if link.a == link.b {
                return invalid(format!("link {}-{} connects a node to itself", link.a, link.b));
            }
            for end in [&link.a, &link.b] {
                if !names.contains(end.as_str()) {
                    return invalid(format!("link {}-{} references unknown node {end}", link.a, link.b));
                }
            }
            if link.cost == 0 {
                return invalid(format!("link {}-{} has cost 0", link.a, link.b));
            }
            let key = if link.a <= link.b {
                (link.a.as_str(), link.b.as_str())
            } else {
                (link.b.as_str(), link.a.as_str())
            };
            if !pairs.insert(key) {
                return invalid(format!("duplicate link {}-{}", link.a, link.b));
            }
        }

        let mut file_names = HashSet::new();
        for file in &self.file {
            if !file_names.insert(file.name.as_str()) {
                return invalid(format!("duplicate file {}", file.name));
            }
            if file.chunks.is_empty() {
                return invalid(format!("file {} has no chunks", file.name));
            }
            let mut chunk_ids = HashSet::new();
            for chunk in &file.chunks {
                if !chunk_ids.insert(chunk.as_str()) {
                    return invalid(format!("file {} repeats chunk {chunk}", file.name));
                }
            }
        }
        if !self.file.is_empty() && self.node.is_empty() {
            return invalid("files defined but no nodes to place them on".to_string());
        }

        if !check_loss_probability(self.settings.loss_probability) {
            return invalid(format!(
                "loss_probability {} outside [0, 1]",
                self.settings.loss_probability
            ));
        }
        Ok(())
    }
}

/// Builds the runtime network from a validated config: topology, seeded
/// chunk placement, and eagerly computed routing tables.
pub fn initialize(config: &NetworkConfig) -> Result<(Topology, FileCatalog)> {
    config.validate()?;

    let mut topology = Topology::new();
    for node in &config.node {
        topology.add_node(&node.name, (node.x, node.y))?;
    }
    for link in &config.link {
        topology.add_link(&link.a, &link.b, link.cost)?;
    }

    let mut catalog = FileCatalog::new();
    let files: Vec<(String, Vec<String>)> = config
        .file
        .iter()
        .map(|file| (file.name.clone(), file.chunks.clone()))
        .collect();
    placement::distribute(&mut topology, &mut catalog, &files)?;

    routing::recompute_all(&mut topology);
    Ok((topology, catalog))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [settings]
        loss_probability = 0.25
        hop_steps = 5
        step_delay_ms = 0
        rng_seed = 9

        [[node]]
        name = "A"
        x = 0.0
        y = 0.0

        [[node]]
        name = "B"
        x = 10.0
        y = 0.0

        [[link]]
        a = "A"
        b = "B"
        cost = 2

        [[file]]
        name = "file1"
        chunks = ["chunk1", "chunk2"]
    "#;

    fn parse(raw: &str) -> NetworkConfig {
        toml::from_str(raw).unwrap()
    }

    #[test]
    fn test_parse_sample() {
        let config = parse(SAMPLE);
        assert_eq!(config.settings.loss_probability, 0.25);
        assert_eq!(config.settings.rng_seed, Some(9));
        assert_eq!(config.node.len(), 2);
        assert_eq!(config.link[0].cost, 2);
        assert_eq!(config.file[0].chunks, ["chunk1", "chunk2"]);
        config.validate().unwrap();
    }

    #[test]
    fn test_settings_default_when_absent() {
        let config = parse("[[node]]\nname = \"A\"\nx = 0.0\ny = 0.0\n");
        assert_eq!(config.settings.loss_probability, 0.1);
        assert_eq!(config.settings.hop_steps, 20);
        assert_eq!(config.settings.step_delay_ms, 50);
        assert_eq!(config.settings.rng_seed, None);
        config.validate().unwrap();
    }

    #[test]
    fn test_check_loss_probability() {
        assert!(check_loss_probability(0.0));
        assert!(check_loss_probability(1.0));
        assert!(!check_loss_probability(1.01));
        assert!(!check_loss_probability(-0.1));
    }

    fn expect_invalid(raw: &str, needle: &str) {
        let err = parse(raw).validate().unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains(needle), "unexpected message: {msg}"),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_bad_configs() {
        expect_invalid(
            "[[node]]\nname = \"A\"\nx = 0.0\ny = 0.0\n[[node]]\nname = \"A\"\nx = 1.0\ny = 0.0\n",
            "duplicate node",
        );
        expect_invalid(
            "[[node]]\nname = \"A\"\nx = 0.0\ny = 0.0\n[[link]]\na = \"A\"\nb = \"Z\"\ncost = 1\n",
            "unknown node",
        );
        expect_invalid(
            "[[node]]\nname = \"A\"\nx = 0.0\ny = 0.0\n[[link]]\na = \"A\"\nb = \"A\"\ncost = 1\n",
            "itself",
        );
        expect_invalid("[settings]\nloss_probability = 1.5\n", "loss_probability");
        expect_invalid(
            "[[node]]\nname = \"A\"\nx = 0.0\ny = 0.0\n[[file]]\nname = \"f\"\nchunks = []\n",
            "no chunks",
        );
    }

    #[test]
    fn test_duplicate_link_rejected_in_either_direction() {
        expect_invalid(
            concat!(
                "[[node]]\nname = \"A\"\nx = 0.0\ny = 0.0\n",
                "[[node]]\nname = \"B\"\nx = 1.0\ny = 0.0\n",
                "[[link]]\na = \"A\"\nb = \"B\"\ncost = 1\n",
                "[[link]]\na = \"B\"\nb = \"A\"\ncost = 3\n",
            ),
            "duplicate link",
        );
    }

    #[test]
    fn test_initialize_builds_ready_network() {
        let (topology, catalog) = initialize(&parse(SAMPLE)).unwrap();
        assert_eq!(topology.node_names(), ["A", "B"]);
        assert_eq!(topology.node("A").unwrap().chunks_of("file1"), ["chunk1"]);
        assert_eq!(topology.node("B").unwrap().chunks_of("file1"), ["chunk2"]);
        assert_eq!(catalog.expected_chunks("file1").unwrap().len(), 2);
        // Routing tables are eagerly consistent after startup.
        assert_eq!(topology.node("A").unwrap().routing_table["B"], 2);
    }
}
