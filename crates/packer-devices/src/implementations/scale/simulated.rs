//! Simulated scale implementation.
//!
//! Replays a configured sequence of weight readings on a fixed interval,
//! standing in for a serial scale during development and tests. Each
//! configured value is emitted once as a stable reading, preceded by one
//! unstable reading of the same value to mimic a settling scale.

use crate::{DeviceError, ScaleInterface, WeightReading};
use async_trait::async_trait;
use packer_types::{ConfigSchema, Field, FieldType, Schema, ValidationError};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Simulated scale replaying configured readings.
pub struct SimulatedScale {
	/// Values to replay, in kilograms.
	readings: Vec<f64>,
	/// Interval between emitted readings.
	interval: tokio::time::Duration,
	/// Handle of the replay task while running.
	task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SimulatedScale {
	/// Creates a simulated scale replaying `readings` every `interval_ms`.
	pub fn new(readings: Vec<f64>, interval_ms: u64) -> Self {
		Self {
			readings,
			interval: tokio::time::Duration::from_millis(interval_ms),
			task: Arc::new(Mutex::new(None)),
		}
	}
}

#[async_trait]
impl ScaleInterface for SimulatedScale {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(SimulatedScaleSchema)
	}

	async fn start(
		&self,
		sender: mpsc::UnboundedSender<WeightReading>,
	) -> Result<(), DeviceError> {
		let mut task = self.task.lock().await;
		if task.is_some() {
			return Err(DeviceError::Device("Scale already started".to_string()));
		}

		let readings = self.readings.clone();
		let interval = self.interval;
		let handle = tokio::spawn(async move {
			for kilograms in readings {
				tokio::time::sleep(interval).await;
				if sender
					.send(WeightReading {
						kilograms,
						stable: false,
					})
					.is_err()
				{
					return;
				}

				tokio::time::sleep(interval).await;
				if sender
					.send(WeightReading {
						kilograms,
						stable: true,
					})
					.is_err()
				{
					return;
				}
			}
			tracing::debug!("Simulated scale replay finished");
		});
		*task = Some(handle);

		Ok(())
	}

	async fn stop(&self) -> Result<(), DeviceError> {
		let mut task = self.task.lock().await;
		match task.take() {
			Some(handle) => {
				handle.abort();
				Ok(())
			}
			None => Err(DeviceError::NotStarted),
		}
	}
}

/// Configuration schema for SimulatedScale.
pub struct SimulatedScaleSchema;

impl ConfigSchema for SimulatedScaleSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new(
				"readings",
				FieldType::Array(Box::new(FieldType::Float { min: Some(0.0) })),
			)],
			vec![Field::new(
				"interval_ms",
				FieldType::Integer {
					min: Some(10),
					max: Some(60_000),
				},
			)],
		);
		schema.validate(config)
	}
}

/// Factory function to create a simulated scale from configuration.
///
/// Configuration parameters:
/// - `readings`: array of kilogram values to replay (required)
/// - `interval_ms`: delay between readings, defaults to 250
pub fn create_scale(config: &toml::Value) -> Result<Box<dyn ScaleInterface>, DeviceError> {
	SimulatedScaleSchema
		.validate(config)
		.map_err(|e| DeviceError::Configuration(e.to_string()))?;

	let readings = config
		.get("readings")
		.and_then(|v| v.as_array())
		.map(|values| {
			values
				.iter()
				.filter_map(|v| v.as_float().or_else(|| v.as_integer().map(|i| i as f64)))
				.collect::<Vec<_>>()
		})
		.unwrap_or_default();

	let interval_ms = config
		.get("interval_ms")
		.and_then(|v| v.as_integer())
		.unwrap_or(250) as u64;

	Ok(Box::new(SimulatedScale::new(readings, interval_ms)))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn test_replays_readings_with_settling() {
		let scale = SimulatedScale::new(vec![0.3, 0.7], 100);
		let (tx, mut rx) = mpsc::unbounded_channel();
		scale.start(tx).await.unwrap();

		let mut seen = Vec::new();
		for _ in 0..4 {
			seen.push(rx.recv().await.unwrap());
		}
		assert_eq!(
			seen,
			vec![
				WeightReading {
					kilograms: 0.3,
					stable: false
				},
				WeightReading {
					kilograms: 0.3,
					stable: true
				},
				WeightReading {
					kilograms: 0.7,
					stable: false
				},
				WeightReading {
					kilograms: 0.7,
					stable: true
				},
			]
		);

		scale.stop().await.unwrap();
	}

	#[tokio::test]
	async fn test_double_start_rejected() {
		let scale = SimulatedScale::new(vec![], 100);
		let (tx, _rx) = mpsc::unbounded_channel();
		scale.start(tx.clone()).await.unwrap();
		assert!(matches!(
			scale.start(tx).await,
			Err(DeviceError::Device(_))
		));
		scale.stop().await.unwrap();
	}

	#[tokio::test]
	async fn test_stop_without_start() {
		let scale = SimulatedScale::new(vec![], 100);
		assert!(matches!(scale.stop().await, Err(DeviceError::NotStarted)));
	}

	#[test]
	fn test_factory_rejects_missing_readings() {
		let config: toml::Value = "interval_ms = 100".parse().unwrap();
		assert!(matches!(
			create_scale(&config),
			Err(DeviceError::Configuration(_))
		));
	}

	#[test]
	fn test_factory_accepts_integer_readings() {
		let config: toml::Value = "readings = [1, 0.5]".parse().unwrap();
		assert!(create_scale(&config).is_ok());
	}
}
