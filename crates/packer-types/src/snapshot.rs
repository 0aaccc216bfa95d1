//! Derived read-only snapshot of the packing workflow.
//!
//! The snapshot is recomputed from the item list after every mutation and is
//! the only surface display consumers read. It never feeds back into the
//! state machine.

use serde::{Deserialize, Serialize};

/// Read-only view of the workflow for display consumers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackingSnapshot {
	/// Identifier of the order this snapshot was derived from.
	pub order_id: String,
	/// The single item the operator is expected to act on, if any.
	pub active_item_id: Option<String>,
	/// Index of the box the operator is currently working through.
	pub active_box_index: u32,
	/// Sum of expected weights over all items in the active box.
	pub current_box_weight: f64,
	/// Weight the scale should currently read: the active box tare plus
	/// every completed product in it.
	pub current_scale_weight: f64,
	/// Sum of expected weights over every item in the order.
	pub total_order_weight: f64,
	/// Portions packed in the active box so far.
	pub packed_portions: u32,
	/// Portions packed across all boxes.
	pub total_packed_portions: u32,
	/// Total portions in the order.
	pub total_portions: u32,
	/// True iff every product item is done.
	pub order_complete: bool,
	/// Whether a box with a higher index than the active one exists.
	pub has_next_box: bool,
	/// Seconds remaining on the auto-print countdown, if counting.
	pub countdown_seconds: Option<u32>,
}
