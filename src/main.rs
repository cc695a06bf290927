use std::thread;

use shardnet::config::NetworkConfig;
use shardnet::controller::{SimulationCommand, SimulationController, SimulationEvent};
use tracing::{info, warn};

include!(concat!(env!("OUT_DIR"), "/build_constants.rs"));

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| format!("{CONFIG_DIR}/default.toml"));
    let config = NetworkConfig::load(&path)?;

    let (controller, ui) = SimulationController::new(&config)?;
    let engine = thread::spawn(move || controller.run());

    let events = ui.events;
    let logger = thread::spawn(move || {
        for event in events.iter() {
            match event {
                SimulationEvent::HopProgress { .. } => {} // animation feed
                SimulationEvent::RoutingRecomputed => {}
                SimulationEvent::LinkToggled { a, b, active } => {
                    info!(a, b, active, "link state changed");
                }
                SimulationEvent::ChunkDelivered { file, chunk, holder } => {
                    info!(file, chunk, holder, "chunk delivered");
                }
                SimulationEvent::ChunkLost { file, chunk, holder } => {
                    warn!(file, chunk, holder, "chunk lost in transit");
                }
                SimulationEvent::ChunkUnroutable { file, chunk, holder } => {
                    warn!(file, chunk, holder, "no route for chunk");
                }
                SimulationEvent::RetrievalFinished(report) => {
                    info!(
                        file = %report.file,
                        requester = %report.requester,
                        complete = report.complete(),
                        delivered = ?report.delivered,
                        missing = ?report.missing(),
                        "retrieval finished"
                    );
                }
            }
        }
    });

    // Demo scenario: pull file1 to A, cut B-C and A-D, then pull again over
    // whatever is left.
    let scenario = [
        SimulationCommand::RequestFile {
            requester: "A".to_string(),
            file: "file1".to_string(),
        },
        SimulationCommand::ToggleLink {
            a: "B".to_string(),
            b: "C".to_string(),
        },
        SimulationCommand::ToggleLink {
            a: "A".to_string(),
            b: "D".to_string(),
        },
        SimulationCommand::RequestFile {
            requester: "A".to_string(),
            file: "file1".to_string(),
        },
        SimulationCommand::Shutdown,
    ];
    for command in scenario {
        ui.commands.send(command)?;
    }
    drop(ui.commands);

    engine.join().expect("controller thread panicked");
    logger.join().expect("logger thread panicked");
    Ok(())
}
