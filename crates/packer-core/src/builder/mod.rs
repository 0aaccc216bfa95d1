//! Builder for constructing a PackingEngine with pluggable implementations.
//!
//! The PackerBuilder uses the factory pattern to allow different storage
//! backends and device implementations to be plugged in based on
//! configuration. Each created implementation validates its own slice of the
//! configuration through its schema before the engine is assembled.

use crate::engine::{event_bus::EventBus, EngineError, PackingEngine};
use packer_config::Config;
use packer_devices::{PrinterFactory, PrinterService, ScaleFactory, ScaleService};
use packer_store::{StorageFactory, StorageService};
use std::collections::HashMap;
use std::sync::Arc;

/// Builder wiring configured storage and device implementations into a
/// ready-to-run engine.
pub struct PackerBuilder {
	config: Config,
	storage_factories: HashMap<String, StorageFactory>,
	scale_factories: HashMap<String, ScaleFactory>,
	printer_factories: HashMap<String, PrinterFactory>,
}

impl PackerBuilder {
	/// Creates a new PackerBuilder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self {
			config,
			storage_factories: HashMap::new(),
			scale_factories: HashMap::new(),
			printer_factories: HashMap::new(),
		}
	}

	/// Adds a factory function for creating storage backends.
	///
	/// The name parameter should match the backend name in the configuration.
	pub fn with_storage_factory(mut self, name: &str, factory: StorageFactory) -> Self {
		self.storage_factories.insert(name.to_string(), factory);
		self
	}

	/// Adds a factory function for creating scale implementations.
	pub fn with_scale_factory(mut self, name: &str, factory: ScaleFactory) -> Self {
		self.scale_factories.insert(name.to_string(), factory);
		self
	}

	/// Adds a factory function for creating printer implementations.
	pub fn with_printer_factory(mut self, name: &str, factory: PrinterFactory) -> Self {
		self.printer_factories.insert(name.to_string(), factory);
		self
	}

	/// Builds the PackingEngine using the configured factories.
	///
	/// This method:
	/// 1. Creates the storage backend and both devices using the factories
	/// 2. Validates each implementation's configuration against its schema
	/// 3. Returns the engine together with the scale service the caller
	///    drives readings from
	pub fn build(self) -> Result<(PackingEngine, Arc<ScaleService>), EngineError> {
		// Create the storage backend
		let storage_name = &self.config.storage.backend;
		let storage_factory = self.storage_factories.get(storage_name).ok_or_else(|| {
			EngineError::Config(format!("Unknown storage backend '{}'", storage_name))
		})?;
		let storage_backend = storage_factory(&self.config.storage.config).map_err(|e| {
			tracing::error!(
				component = "storage",
				implementation = %storage_name,
				error = %e,
				"Failed to create storage backend"
			);
			EngineError::Config(format!(
				"Failed to create storage backend '{}': {}",
				storage_name, e
			))
		})?;
		storage_backend
			.config_schema()
			.validate(&self.config.storage.config)
			.map_err(|e| {
				EngineError::Config(format!(
					"Invalid configuration for storage backend '{}': {}",
					storage_name, e
				))
			})?;
		let storage = Arc::new(StorageService::new(storage_backend));
		tracing::info!(component = "storage", implementation = %storage_name, "Loaded");

		// Create the scale
		let scale_name = &self.config.scale.implementation;
		let scale_factory = self
			.scale_factories
			.get(scale_name)
			.ok_or_else(|| EngineError::Config(format!("Unknown scale '{}'", scale_name)))?;
		let scale_impl = scale_factory(&self.config.scale.config).map_err(|e| {
			tracing::error!(
				component = "scale",
				implementation = %scale_name,
				error = %e,
				"Failed to create scale"
			);
			EngineError::Config(format!("Failed to create scale '{}': {}", scale_name, e))
		})?;
		scale_impl
			.config_schema()
			.validate(&self.config.scale.config)
			.map_err(|e| {
				EngineError::Config(format!(
					"Invalid configuration for scale '{}': {}",
					scale_name, e
				))
			})?;
		let scale = Arc::new(ScaleService::new(scale_impl));
		tracing::info!(component = "scale", implementation = %scale_name, "Loaded");

		// Create the printer
		let printer_name = &self.config.printer.implementation;
		let printer_factory = self
			.printer_factories
			.get(printer_name)
			.ok_or_else(|| EngineError::Config(format!("Unknown printer '{}'", printer_name)))?;
		let printer_impl = printer_factory(&self.config.printer.config).map_err(|e| {
			tracing::error!(
				component = "printer",
				implementation = %printer_name,
				error = %e,
				"Failed to create printer"
			);
			EngineError::Config(format!(
				"Failed to create printer '{}': {}",
				printer_name, e
			))
		})?;
		printer_impl
			.config_schema()
			.validate(&self.config.printer.config)
			.map_err(|e| {
				EngineError::Config(format!(
					"Invalid configuration for printer '{}': {}",
					printer_name, e
				))
			})?;
		let printer = Arc::new(PrinterService::new(printer_impl));
		tracing::info!(component = "printer", implementation = %printer_name, "Loaded");

		let engine = PackingEngine::new(self.config, storage, printer, EventBus::new(1000));
		Ok((engine, scale))
	}
}
