//! Configuration module for the order-packer system.
//!
//! This module provides structures and utilities for managing station
//! configuration. It supports loading configuration from TOML files and
//! provides validation to ensure all required configuration values are
//! properly set before the engine starts.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the packing station.
///
/// Contains all configuration sections required for the station to operate:
/// station identity, equipment behavior, session storage, and the scale and
/// printer device selections.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to the station instance.
	pub station: StationConfig,
	/// Equipment behavior flags consumed by the workflow engine.
	#[serde(default)]
	pub equipment: EquipmentConfig,
	/// Configuration for the session snapshot storage backend.
	pub storage: StorageConfig,
	/// Configuration for the scale device.
	pub scale: DeviceConfig,
	/// Configuration for the label printer device.
	pub printer: DeviceConfig,
}

/// Configuration specific to the station instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StationConfig {
	/// Unique identifier for this packing station.
	pub id: String,
	/// Interval in seconds between periodic session snapshot writes.
	/// Defaults to 30 seconds if not specified.
	#[serde(default = "default_snapshot_interval_secs")]
	pub snapshot_interval_secs: u64,
}

/// Returns the default snapshot interval in seconds.
fn default_snapshot_interval_secs() -> u64 {
	30
}

/// Equipment behavior flags.
///
/// This section is the injected read-only context for the weight aggregator
/// and the auto-print trigger; the engine never reads ambient global state.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EquipmentConfig {
	/// Whether the auto-print trigger counts down and fires on completion.
	#[serde(default)]
	pub auto_print_on_complete: bool,
	/// Delay between order completion and the automatic print, in
	/// milliseconds. Defaults to 3000.
	#[serde(default = "default_auto_print_delay_ms")]
	pub auto_print_delay_ms: u64,
	/// Whether simulated device implementations should be used.
	#[serde(default = "default_simulate_devices")]
	pub simulate_devices: bool,
	/// Debug override for the auto-print arming condition.
	#[serde(default)]
	pub debug_override: bool,
}

impl Default for EquipmentConfig {
	fn default() -> Self {
		Self {
			auto_print_on_complete: false,
			auto_print_delay_ms: default_auto_print_delay_ms(),
			simulate_devices: default_simulate_devices(),
			debug_override: false,
		}
	}
}

/// Returns the default auto-print delay in milliseconds.
fn default_auto_print_delay_ms() -> u64 {
	3000
}

fn default_simulate_devices() -> bool {
	true
}

/// Configuration for the session snapshot storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which storage implementation to use.
	pub backend: String,
	/// Backend-specific configuration stored as a raw TOML value and
	/// validated by the chosen implementation's schema.
	#[serde(default = "default_table")]
	pub config: toml::Value,
}

/// Configuration for a single device (scale or printer).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
	/// Which device implementation to use.
	pub implementation: String,
	/// Implementation-specific configuration stored as a raw TOML value and
	/// validated by the chosen implementation's schema.
	#[serde(default = "default_table")]
	pub config: toml::Value,
}

fn default_table() -> toml::Value {
	toml::Value::Table(toml::Table::new())
}

impl Config {
	/// Loads and validates configuration from a TOML file.
	pub async fn from_file_async(path: &str) -> Result<Self, ConfigError> {
		let contents = tokio::fs::read_to_string(path).await?;
		contents.parse()
	}

	/// Validates the configuration beyond what deserialization checks.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.station.id.is_empty() {
			return Err(ConfigError::Validation(
				"station.id must not be empty".to_string(),
			));
		}
		if self.storage.backend.is_empty() {
			return Err(ConfigError::Validation(
				"storage.backend must not be empty".to_string(),
			));
		}
		if self.scale.implementation.is_empty() {
			return Err(ConfigError::Validation(
				"scale.implementation must not be empty".to_string(),
			));
		}
		if self.printer.implementation.is_empty() {
			return Err(ConfigError::Validation(
				"printer.implementation must not be empty".to_string(),
			));
		}
		if self.station.snapshot_interval_secs == 0 {
			return Err(ConfigError::Validation(
				"station.snapshot_interval_secs must be greater than zero".to_string(),
			));
		}
		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let config: Config = toml::from_str(s)?;
		config.validate()?;
		Ok(config)
	}
}
