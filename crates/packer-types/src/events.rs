//! Event types for inter-component communication.
//!
//! This module defines the event system used by the packing workflow for
//! communication between the engine and its consumers. Events flow through an
//! event bus, letting display surfaces, sound players, and device adapters
//! react to state changes without reaching into the item store.

use crate::item::ItemStatus;
use serde::{Deserialize, Serialize};

/// Main event type encompassing all workflow events.
///
/// Events are categorized by the part of the workflow that produces them,
/// allowing consumers to filter and handle specific event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WorkflowEvent {
	/// Events about the order session as a whole.
	Session(SessionEvent),
	/// Events about a single item.
	Item(ItemEvent),
	/// Events about box progression.
	Box(BoxEvent),
	/// Events from the auto-print trigger.
	Print(PrintEvent),
	/// Transition-triggered sound cues.
	Sound(SoundCue),
}

/// Events about the order session as a whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
	/// A new order has been hydrated into the item store.
	OrderLoaded { order_id: String },
	/// An upstream item failed validation and was excluded from the session.
	ItemRejected { item_id: String, reason: String },
	/// Every product item in the order is done.
	OrderCompleted { order_id: String },
}

/// Events about a single item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ItemEvent {
	/// An item's status changed through the command interface.
	StatusChanged {
		item_id: String,
		status: ItemStatus,
	},
	/// A click on a locked or inert item was rejected.
	ClickRejected { item_id: String, reason: String },
	/// The active item derived by the selector changed.
	ActiveItemChanged { item_id: Option<String> },
}

/// Events about box progression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BoxEvent {
	/// A box passed its confirmation weighing.
	Confirmed { box_index: u32 },
	/// Every product in the box is done.
	Completed { box_index: u32 },
	/// The operator advanced to another box.
	ActiveBoxChanged { box_index: u32 },
}

/// Events from the auto-print trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PrintEvent {
	/// The arming condition became true for the current order.
	Armed { order_id: String },
	/// One second of the auto-print countdown elapsed.
	CountdownTick { seconds_left: u32 },
	/// The print callback fired. At most once per armed session.
	Fired { order_id: String },
	/// The arming condition became false again; the trigger is idle.
	Reset { order_id: String },
}

/// Sound cues fired on state transitions.
///
/// The workflow only selects the cue; mapping cues to actual audio is left
/// to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCue {
	/// A box passed confirmation.
	Confirm,
	/// A product weighing matched.
	Success,
	/// A product weighing failed.
	Error,
	/// The whole order is complete.
	Complete,
}
