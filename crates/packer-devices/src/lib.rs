//! Device module for the order-packer system.
//!
//! This module defines the trait seams between the packing workflow and the
//! physical station equipment: the scale that produces normalized weight
//! readings and the label printer the auto-print trigger fires into. The
//! workflow core never talks to hardware directly; real drivers and the
//! simulated implementations both plug in behind these traits.

use async_trait::async_trait;
use packer_types::ConfigSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Re-export implementations
pub mod implementations {
	pub mod printer {
		pub mod log;
	}
	pub mod scale {
		pub mod simulated;
	}
}

/// Errors that can occur during device operations.
#[derive(Debug, Error)]
pub enum DeviceError {
	/// Error that occurs while talking to the device.
	#[error("Device error: {0}")]
	Device(String),
	/// Error that occurs when a device is used before being started.
	#[error("Device not started")]
	NotStarted,
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// A normalized weight reading produced by a scale implementation.
///
/// How raw device frames are decoded into this shape is the driver's
/// concern; the workflow only ever sees kilograms plus a stability flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightReading {
	/// Weight currently on the scale, in kilograms.
	pub kilograms: f64,
	/// True once the reading has settled and may be matched against an
	/// expected weight.
	pub stable: bool,
}

/// Trait defining the interface for scale implementations.
///
/// A scale pushes readings into the channel handed to [`ScaleInterface::start`]
/// until stopped. Implementations must be stoppable at any time; a stopped
/// scale must not emit further readings.
#[async_trait]
pub trait ScaleInterface: Send + Sync {
	/// Returns the configuration schema for this scale implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Starts pushing readings into the given channel.
	async fn start(
		&self,
		sender: mpsc::UnboundedSender<WeightReading>,
	) -> Result<(), DeviceError>;

	/// Stops the reading stream.
	async fn stop(&self) -> Result<(), DeviceError>;
}

/// Trait defining the interface for label printer implementations.
#[async_trait]
pub trait PrinterInterface: Send + Sync {
	/// Returns the configuration schema for this printer implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Prints the transport label (TTN) for the given order.
	async fn print_ttn(&self, order_id: &str) -> Result<(), DeviceError>;
}

/// Type alias for scale factory functions.
pub type ScaleFactory = fn(&toml::Value) -> Result<Box<dyn ScaleInterface>, DeviceError>;

/// Type alias for printer factory functions.
pub type PrinterFactory = fn(&toml::Value) -> Result<Box<dyn PrinterInterface>, DeviceError>;

/// Get all registered scale implementations.
pub fn get_all_scale_implementations() -> Vec<(&'static str, ScaleFactory)> {
	use implementations::scale::simulated;

	vec![("simulated", simulated::create_scale as ScaleFactory)]
}

/// Get all registered printer implementations.
pub fn get_all_printer_implementations() -> Vec<(&'static str, PrinterFactory)> {
	use implementations::printer::log;

	vec![("log", log::create_printer as PrinterFactory)]
}

/// High-level service wrapping the configured scale implementation.
pub struct ScaleService {
	implementation: Box<dyn ScaleInterface>,
}

impl std::fmt::Debug for ScaleService {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ScaleService").finish_non_exhaustive()
	}
}

impl ScaleService {
	/// Creates a new ScaleService with the specified implementation.
	pub fn new(implementation: Box<dyn ScaleInterface>) -> Self {
		Self { implementation }
	}

	/// Starts the reading stream into the given channel.
	pub async fn start(
		&self,
		sender: mpsc::UnboundedSender<WeightReading>,
	) -> Result<(), DeviceError> {
		self.implementation.start(sender).await
	}

	/// Stops the reading stream.
	pub async fn stop(&self) -> Result<(), DeviceError> {
		self.implementation.stop().await
	}
}

/// High-level service wrapping the configured printer implementation.
pub struct PrinterService {
	implementation: Box<dyn PrinterInterface>,
}

impl PrinterService {
	/// Creates a new PrinterService with the specified implementation.
	pub fn new(implementation: Box<dyn PrinterInterface>) -> Self {
		Self { implementation }
	}

	/// Prints the transport label (TTN) for the given order.
	pub async fn print_ttn(&self, order_id: &str) -> Result<(), DeviceError> {
		self.implementation.print_ttn(order_id).await
	}
}
