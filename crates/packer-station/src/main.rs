//! Main entry point for the packing station service.
//!
//! This binary wires the workflow engine to the configured session storage
//! and devices, hydrates an order, and runs the packing loop. With simulated
//! devices enabled the configured scale readings drive the whole workflow:
//! box confirmation, product weighings, completion, and the automatic label
//! print.

use clap::Parser;
use packer_config::Config;
use packer_core::{EngineError, PackerBuilder, PackingEngine};
use packer_devices::ScaleService;
use packer_types::{OrderData, WorkflowCommand, WorkflowEvent};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

mod weighing;

use weighing::WeightMatcher;

/// Acceptable deviation between a stable reading and its target, in
/// kilograms.
const WEIGHT_TOLERANCE_KG: f64 = 0.005;

/// Command-line arguments for the packing station service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Path to an order JSON file to hydrate on startup
	#[arg(short, long)]
	order: Option<PathBuf>,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the packing station service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the packing engine with all implementations
/// 5. Hydrates the order and runs the workflow until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started packing station");

	// Load configuration
	let config = Config::from_file_async(args.config.to_str().unwrap()).await?;
	tracing::info!("Loaded configuration [{}]", config.station.id);

	// Build the engine with implementations
	let (mut engine, scale) = build_station(config.clone())?;
	engine.initialize().await?;

	let commands = engine.command_sender();
	let snapshots = engine.subscribe_snapshot();
	let events = engine.event_bus().subscribe();

	// Log workflow events for the operator console
	tokio::spawn(log_events(events));

	// Hydrate the order, if one was given
	let order = match &args.order {
		Some(path) => {
			let contents = tokio::fs::read_to_string(path).await?;
			let order: OrderData = serde_json::from_str(&contents)?;
			tracing::info!(order_id = %order.id, items = order.items.len(), "Read order file");
			commands.send(WorkflowCommand::LoadOrder {
				order_id: order.id.clone(),
				items: order.items.clone(),
			})?;
			Some(order)
		}
		None => None,
	};

	// With simulated devices the scale replay drives the workflow
	if config.equipment.simulate_devices {
		if let Some(order) = &order {
			let (readings_tx, readings_rx) = mpsc::unbounded_channel();
			scale
				.start(readings_tx)
				.await
				.map_err(|e| EngineError::Service(e.to_string()))?;

			let matcher = WeightMatcher::new(
				commands.clone(),
				snapshots.clone(),
				&order.items,
				WEIGHT_TOLERANCE_KG,
			);
			tokio::spawn(matcher.run(readings_rx));
		}
	}

	// Run the workflow until Ctrl+C or a Shutdown command
	engine.run().await?;

	scale.stop().await.ok();
	tracing::info!("Stopped packing station");
	Ok(())
}

/// Builds the packing engine with all registered implementations.
///
/// This function wires up the concrete implementations for:
/// - Storage backends (in-memory, file)
/// - Scales (simulated)
/// - Printers (log)
fn build_station(config: Config) -> Result<(PackingEngine, Arc<ScaleService>), EngineError> {
	let mut builder = PackerBuilder::new(config);

	for (name, factory) in packer_store::get_all_implementations() {
		builder = builder.with_storage_factory(name, factory);
	}
	for (name, factory) in packer_devices::get_all_scale_implementations() {
		builder = builder.with_scale_factory(name, factory);
	}
	for (name, factory) in packer_devices::get_all_printer_implementations() {
		builder = builder.with_printer_factory(name, factory);
	}

	builder.build()
}

/// Logs workflow events at levels appropriate for the operator console.
async fn log_events(mut events: tokio::sync::broadcast::Receiver<WorkflowEvent>) {
	use packer_types::{BoxEvent, ItemEvent, PrintEvent, SessionEvent};

	loop {
		match events.recv().await {
			Ok(event) => match event {
				WorkflowEvent::Session(SessionEvent::OrderCompleted { order_id }) => {
					tracing::info!(%order_id, "Order complete");
				}
				WorkflowEvent::Box(BoxEvent::Completed { box_index }) => {
					tracing::info!(box_index, "Box complete");
				}
				WorkflowEvent::Print(PrintEvent::CountdownTick { seconds_left }) => {
					tracing::info!(seconds_left, "Auto-print countdown");
				}
				WorkflowEvent::Print(PrintEvent::Fired { order_id }) => {
					tracing::info!(%order_id, "Label printed");
				}
				WorkflowEvent::Item(ItemEvent::ActiveItemChanged { item_id }) => {
					tracing::debug!(?item_id, "Active item changed");
				}
				WorkflowEvent::Sound(cue) => {
					tracing::debug!(?cue, "Sound cue");
				}
				_ => {}
			},
			Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
				tracing::warn!(missed, "Event logger lagged behind");
			}
			Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
		}
	}
}
