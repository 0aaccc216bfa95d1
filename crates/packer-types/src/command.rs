//! Workflow command types.
//!
//! Commands are the only mutation channel into the packing engine. Click
//! handlers, scan-result handlers, and weight-match handlers all reduce to a
//! command sent over the engine's channel; every derived value is recomputed
//! from the item list that results from applying them.

use crate::item::{ItemStatus, RawOrderItem};
use serde::{Deserialize, Serialize};

/// A command consumed by the packing engine's event loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WorkflowCommand {
	/// Hydrate a new order, discarding the previous session and resetting
	/// the auto-print trigger.
	LoadOrder {
		order_id: String,
		items: Vec<RawOrderItem>,
	},
	/// The operator pressed an item row.
	ItemClicked { item_id: String },
	/// A scan-result or weight-match handler requests a specific status.
	///
	/// Applied to the item by id regardless of the currently active box;
	/// item identity is the authority, only selection is box-scoped.
	SetStatus {
		item_id: String,
		status: ItemStatus,
	},
	/// The operator advances to the next box.
	AdvanceBox,
	/// Explicit operator print action.
	PrintRequested,
	/// External print-ready signal, OR'd into the auto-print arming condition.
	SetPrintReady(bool),
	/// Debug override, OR'd into the auto-print arming condition.
	SetDebugOverride(bool),
	/// Stop the engine loop.
	Shutdown,
}
