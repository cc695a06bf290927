//! In-memory packet-switched network simulator: named nodes joined by
//! weighted, toggleable links, Dijkstra routing tables, and concurrent
//! retrieval of file chunks with probabilistic per-hop loss.
//!
//! The [`controller`] module is the entry point for driving a simulation;
//! everything below it (topology, routing, placement, transfer, retrieval)
//! is usable on its own.

pub mod config;
pub mod controller;
pub mod error;
pub mod placement;
pub mod retrieval;
pub mod routing;
pub mod topology;
pub mod transfer;
