//! Weight-match adapter.
//!
//! Translates stable scale readings into workflow commands. The adapter is
//! deliberately outside the core: the engine only ever sees `(item id,
//! requested status)` commands, never raw weights. Device errors and
//! mismatched readings become either "no change" or a terminal error status
//! for the pending product.

use packer_core::EngineError;
use packer_devices::WeightReading;
use packer_types::{
	truncate_id, ItemKind, ItemStatus, PackingSnapshot, ProductStatus, RawOrderItem,
	WorkflowCommand,
};
use std::collections::HashMap;
use tokio::sync::{mpsc, watch};

/// Static per-item facts the adapter needs: kind and expected weight.
#[derive(Debug, Clone, Copy)]
struct ItemFacts {
	kind: ItemKind,
	expected_weight: f64,
}

/// Matches stable scale readings against the expected scale weight and
/// issues status commands for the active item.
pub struct WeightMatcher {
	commands: mpsc::UnboundedSender<WorkflowCommand>,
	snapshots: watch::Receiver<PackingSnapshot>,
	items: HashMap<String, ItemFacts>,
	/// Acceptable deviation between a reading and its target, in kilograms.
	tolerance: f64,
}

impl WeightMatcher {
	/// Creates a matcher for the given order items.
	pub fn new(
		commands: mpsc::UnboundedSender<WorkflowCommand>,
		snapshots: watch::Receiver<PackingSnapshot>,
		raw_items: &[RawOrderItem],
		tolerance: f64,
	) -> Self {
		let items = raw_items
			.iter()
			.filter_map(|raw| {
				let id = raw.id.clone()?;
				let kind = raw.kind?;
				let expected_weight = raw.expected_weight?;
				Some((
					id,
					ItemFacts {
						kind,
						expected_weight,
					},
				))
			})
			.collect();

		Self {
			commands,
			snapshots,
			items,
			tolerance,
		}
	}

	/// Consumes readings until the scale channel closes.
	pub async fn run(
		mut self,
		mut readings: mpsc::UnboundedReceiver<WeightReading>,
	) -> Result<(), EngineError> {
		while let Some(reading) = readings.recv().await {
			if !reading.stable {
				continue;
			}
			self.match_reading(reading.kilograms);
		}
		tracing::debug!("Scale reading stream closed");
		Ok(())
	}

	/// Matches one stable reading against the active item.
	fn match_reading(&mut self, kilograms: f64) {
		let snapshot = self.snapshots.borrow_and_update().clone();
		let Some(active_id) = snapshot.active_item_id else {
			return;
		};
		let Some(facts) = self.items.get(&active_id).copied() else {
			tracing::warn!(item_id = %truncate_id(&active_id), "No weight facts for active item");
			return;
		};

		match facts.kind {
			ItemKind::Box => {
				// The empty box on the scale should read its own tare, which
				// is exactly the current expected scale weight
				if (kilograms - snapshot.current_scale_weight).abs() <= self.tolerance {
					tracing::info!(
						item_id = %truncate_id(&active_id),
						reading = kilograms,
						"Box weight matched; confirming"
					);
					self.send(WorkflowCommand::ItemClicked {
						item_id: active_id,
					});
				}
			}
			ItemKind::Product => {
				let base = snapshot.current_scale_weight;
				let target = base + facts.expected_weight;

				if (kilograms - target).abs() <= self.tolerance {
					tracing::info!(
						item_id = %truncate_id(&active_id),
						reading = kilograms,
						target,
						"Product weight matched"
					);
					// The click makes the product pending when it is not yet;
					// a repeated click is rejected as a no-op
					self.send(WorkflowCommand::ItemClicked {
						item_id: active_id.clone(),
					});
					self.send(WorkflowCommand::SetStatus {
						item_id: active_id.clone(),
						status: ItemStatus::Product(ProductStatus::Success),
					});
					self.send(WorkflowCommand::SetStatus {
						item_id: active_id,
						status: ItemStatus::Product(ProductStatus::Done),
					});
				} else if (kilograms - base).abs() > self.tolerance {
					// Something landed on the scale but not the right weight
					tracing::warn!(
						item_id = %truncate_id(&active_id),
						reading = kilograms,
						target,
						"Product weight mismatched"
					);
					self.send(WorkflowCommand::ItemClicked {
						item_id: active_id.clone(),
					});
					self.send(WorkflowCommand::SetStatus {
						item_id: active_id,
						status: ItemStatus::Product(ProductStatus::Error),
					});
				}
				// A reading at the base weight means nothing was added yet
			}
		}
	}

	fn send(&self, command: WorkflowCommand) {
		if self.commands.send(command).is_err() {
			tracing::warn!("Engine command channel closed");
		}
	}
}
