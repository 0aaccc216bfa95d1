//! Logging printer implementation.
//!
//! Writes print requests to the log instead of driving a physical label
//! printer. Used in simulation mode and as the default while no printer is
//! attached to the station.

use crate::{DeviceError, PrinterInterface};
use async_trait::async_trait;
use packer_types::{truncate_id, ConfigSchema, Schema, ValidationError};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Printer implementation that logs instead of printing.
pub struct LogPrinter {
	/// Number of labels "printed" so far.
	printed: AtomicUsize,
}

impl LogPrinter {
	/// Creates a new LogPrinter.
	pub fn new() -> Self {
		Self {
			printed: AtomicUsize::new(0),
		}
	}

	/// Returns how many print requests this printer has handled.
	pub fn printed_count(&self) -> usize {
		self.printed.load(Ordering::Relaxed)
	}
}

impl Default for LogPrinter {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl PrinterInterface for LogPrinter {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LogPrinterSchema)
	}

	async fn print_ttn(&self, order_id: &str) -> Result<(), DeviceError> {
		self.printed.fetch_add(1, Ordering::Relaxed);
		tracing::info!(order_id = %truncate_id(order_id), "Printing TTN label");
		Ok(())
	}
}

/// Configuration schema for LogPrinter.
pub struct LogPrinterSchema;

impl ConfigSchema for LogPrinterSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// Log printer has no required configuration
		let schema = Schema::new(vec![], vec![]);
		schema.validate(config)
	}
}

/// Factory function to create a logging printer from configuration.
///
/// Configuration parameters:
/// - None required for the logging printer
pub fn create_printer(_config: &toml::Value) -> Result<Box<dyn PrinterInterface>, DeviceError> {
	Ok(Box::new(LogPrinter::new()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_print_counts_requests() {
		let printer = LogPrinter::new();
		printer.print_ttn("order-17").await.unwrap();
		printer.print_ttn("order-17").await.unwrap();
		assert_eq!(printer.printed_count(), 2);
	}
}
