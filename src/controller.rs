use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, select, unbounded};
use rand::Rng;
use tracing::{info, warn};

use crate::config::{self, NetworkConfig};
use crate::error::Result;
use crate::placement::FileCatalog;
use crate::retrieval::{RetrievalReport, request_file};
use crate::routing;
use crate::topology::{NodeId, Topology};
use crate::transfer::{TransferObserver, TransferOutcome, TransferSettings};

/// Commands the UI layer feeds into the simulation.
#[derive(Debug, Clone)]
pub enum SimulationCommand {
    RequestFile { requester: NodeId, file: String },
    ToggleLink { a: NodeId, b: NodeId },
    Shutdown,
}

/// Events the simulation emits for the UI layer.
#[derive(Debug, Clone)]
pub enum SimulationEvent {
    LinkToggled {
        a: NodeId,
        b: NodeId,
        active: bool,
    },
    RoutingRecomputed,
    /// Packet movement for animation: interpolation step `step` of `steps`
    /// along the hop from `from` to `to`.
    HopProgress {
        chunk: String,
        from: NodeId,
        to: NodeId,
        step: u32,
        steps: u32,
    },
    ChunkDelivered {
        file: String,
        chunk: String,
        holder: NodeId,
    },
    ChunkLost {
        file: String,
        chunk: String,
        holder: NodeId,
    },
    ChunkUnroutable {
        file: String,
        chunk: String,
        holder: NodeId,
    },
    RetrievalFinished(RetrievalReport),
}

/// The UI side of the channel pair.
pub struct UiChannels {
    pub commands: Sender<SimulationCommand>,
    pub events: Receiver<SimulationEvent>,
}

impl UiChannels {
    pub fn new(commands: Sender<SimulationCommand>, events: Receiver<SimulationEvent>) -> Self {
        Self { commands, events }
    }
}

/// Forwards transfer callbacks onto the event channel. Transfer tasks call
/// this concurrently; the channel serializes.
struct ChannelObserver {
    events: Sender<SimulationEvent>,
}

impl TransferObserver for ChannelObserver {
    fn hop_progress(&self, chunk: &str, from: &str, to: &str, step: u32, steps: u32) {
        self.events
            .send(SimulationEvent::HopProgress {
                chunk: chunk.to_string(),
                from: from.to_string(),
                to: to.to_string(),
                step,
                steps,
            })
            .ok();
    }

    fn transfer_finished(&self, file: &str, chunk: &str, holder: &str, outcome: &TransferOutcome) {
        let event = match outcome {
            TransferOutcome::Delivered => SimulationEvent::ChunkDelivered {
                file: file.to_string(),
                chunk: chunk.to_string(),
                holder: holder.to_string(),
            },
            TransferOutcome::Lost { .. } => SimulationEvent::ChunkLost {
                file: file.to_string(),
                chunk: chunk.to_string(),
                holder: holder.to_string(),
            },
        };
        self.events.send(event).ok();
    }

    fn chunk_unroutable(&self, file: &str, chunk: &str, holder: &str) {
        self.events
            .send(SimulationEvent::ChunkUnroutable {
                file: file.to_string(),
                chunk: chunk.to_string(),
                holder: holder.to_string(),
            })
            .ok();
    }
}

/// Owns the network state and serializes all commands: a request runs to
/// completion before the next command (such as a link toggle) is taken, so
/// the topology is never mutated under an in-flight transfer.
pub struct SimulationController {
    topology: Topology,
    catalog: FileCatalog,
    settings: TransferSettings,
    base_seed: u64,
    requests: u64, // served so far, varies the per-request seed
    commands: Receiver<SimulationCommand>,
    events: Sender<SimulationEvent>,
    observer: Arc<dyn TransferObserver>,
}

impl SimulationController {
    pub fn new(config: &NetworkConfig) -> Result<(Self, UiChannels)> {
        let (topology, catalog) = config::initialize(config)?;
        let (command_send, command_recv) = unbounded();
        let (event_send, event_recv) = unbounded();
        let base_seed = config
            .settings
            .rng_seed
            .unwrap_or_else(|| rand::thread_rng().r#gen());

        let controller = Self {
            topology,
            catalog,
            settings: config.settings.transfer_settings(),
            base_seed,
            requests: 0,
            commands: command_recv,
            events: event_send.clone(),
            observer: Arc::new(ChannelObserver { events: event_send }),
        };
        Ok((controller, UiChannels::new(command_send, event_recv)))
    }

    /// Blocks handling commands until `Shutdown` arrives or every command
    /// sender is gone.
    pub fn run(mut self) {
        loop {
            let command = select! {
                recv(self.commands) -> command => command,
            };
            match command {
                Ok(SimulationCommand::ToggleLink { a, b }) => self.handle_toggle(&a, &b),
                Ok(SimulationCommand::RequestFile { requester, file }) => {
                    self.handle_request(&requester, &file);
                }
                Ok(SimulationCommand::Shutdown) | Err(_) => break,
            }
        }
        info!("simulation controller stopped");
    }

    fn handle_toggle(&mut self, a: &str, b: &str) {
        match self.topology.toggle_link(a, b) {
            Ok(active) => {
                // Toggling leaves routing stale on purpose; recompute here so
                // tables are consistent before the next command.
                routing::recompute_all(&mut self.topology);
                info!(a, b, active, "link toggled");
                self.events
                    .send(SimulationEvent::LinkToggled {
                        a: a.to_string(),
                        b: b.to_string(),
                        active,
                    })
                    .ok();
                self.events.send(SimulationEvent::RoutingRecomputed).ok();
            }
            Err(error) => warn!(%error, "toggle rejected"),
        }
    }

    fn handle_request(&mut self, requester: &str, file: &str) {
        if !self.topology.contains(requester) {
            warn!(requester, "request from unknown node ignored");
            return;
        }
        let seed = self.base_seed.wrapping_add(self.requests.wrapping_mul(0x9E37_79B9));
        self.requests += 1;
        let report = request_file(
            &self.topology,
            &self.catalog,
            requester,
            file,
            self.settings,
            seed,
            &self.observer,
        );
        self.events
            .send(SimulationEvent::RetrievalFinished(report))
            .ok();
    }
}
