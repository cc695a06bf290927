use thiserror::Error;

/// Errors raised while mutating the network topology. Each one is fatal to
/// the offending operation only; the topology stays valid.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("node {0} already exists")]
    DuplicateNode(String),

    #[error("unknown node {0}")]
    UnknownNode(String),

    #[error("invalid cost {cost} for link {a}-{b}: cost must be positive")]
    InvalidCost { a: String, b: String, cost: u64 },

    #[error("no link between {a} and {b}")]
    NoSuchLink { a: String, b: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoutingError {
    /// No active path exists between the two nodes. The retrieval
    /// coordinator treats this as a per-chunk soft failure.
    #[error("no active path from {src} to {dst}")]
    Unreachable { src: String, dst: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlacementError {
    #[error("file {0} has already been distributed")]
    DuplicateFile(String),

    #[error("cannot distribute chunks over an empty topology")]
    NoNodes,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level error for setup and simulation entry points.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, SimError>;
