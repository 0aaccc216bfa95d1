//! The item store and its command reducer.
//!
//! Owns the ordered collection of packable entities for one order. Status
//! mutations are the only writes during a session and all of them flow
//! through the methods here, which validate transitions, restore the
//! one-pending-per-box invariant, and report the resulting events. Every
//! application is synchronous and atomic with respect to the in-memory list.

use crate::{ordering, progression, weights};
use packer_types::{
	truncate_id, BoxEvent, BoxStatus, ItemEvent, ItemStatus, OrderItem, ProductStatus,
	RawOrderItem, SessionEvent, SoundCue, WorkflowEvent,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur while applying commands to the item store.
#[derive(Debug, Error)]
pub enum StoreError {
	#[error("Unknown item: {0}")]
	UnknownItem(String),
	#[error("Invalid status transition for item '{item_id}': {from} -> {to}")]
	InvalidTransition {
		item_id: String,
		from: ItemStatus,
		to: ItemStatus,
	},
}

/// Result of applying one command to the store.
#[derive(Debug, Default)]
pub struct ApplyOutcome {
	/// Whether the item list or active box changed.
	pub changed: bool,
	/// Events to publish, in the order they occurred.
	pub events: Vec<WorkflowEvent>,
}

impl ApplyOutcome {
	fn unchanged() -> Self {
		Self::default()
	}

	fn rejected(item_id: &str, reason: &str) -> Self {
		Self {
			changed: false,
			events: vec![WorkflowEvent::Item(ItemEvent::ClickRejected {
				item_id: item_id.to_string(),
				reason: reason.to_string(),
			})],
		}
	}
}

/// Serialized form of an in-flight session, used for crash recovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
	pub order_id: String,
	pub active_box_index: u32,
	pub expected_total_portions: u32,
	pub items: Vec<OrderItem>,
}

/// The ordered collection of packable entities for one order.
///
/// Created once per order view and discarded when the operator leaves the
/// order; items are never deleted or reparented during its lifetime.
#[derive(Debug, Default)]
pub struct ItemStore {
	order_id: String,
	items: Vec<OrderItem>,
	active_box_index: u32,
	expected_total_portions: u32,
}

impl ItemStore {
	/// Creates an empty store; the engine starts with one until the first
	/// order is loaded.
	pub fn empty() -> Self {
		Self::default()
	}

	/// Hydrates a store from upstream order data.
	///
	/// Items failing validation are excluded from the store and from every
	/// aggregate, each reported as an `ItemRejected` event. The box for the
	/// initial active index is promoted to awaiting confirmation so the
	/// selector points at it immediately.
	pub fn hydrate(order_id: &str, raw_items: Vec<RawOrderItem>) -> (Self, Vec<WorkflowEvent>) {
		let mut events = vec![WorkflowEvent::Session(SessionEvent::OrderLoaded {
			order_id: order_id.to_string(),
		})];

		let mut items: Vec<OrderItem> = Vec::with_capacity(raw_items.len());
		for raw in raw_items {
			let raw_id = raw.id.clone().unwrap_or_else(|| "<unknown>".to_string());
			match OrderItem::try_from(raw) {
				Ok(item) => items.push(item),
				Err(e) => {
					tracing::warn!(item_id = %truncate_id(&raw_id), error = %e, "Excluding invalid item");
					events.push(WorkflowEvent::Session(SessionEvent::ItemRejected {
						item_id: raw_id,
						reason: e.to_string(),
					}));
				}
			}
		}

		// Exactly one box per box index; products need an owning box
		let mut seen_boxes: HashSet<u32> = HashSet::new();
		let mut duplicates: Vec<String> = Vec::new();
		for item in items.iter().filter(|i| i.is_box()) {
			if !seen_boxes.insert(item.box_index) {
				tracing::warn!(
					item_id = %truncate_id(&item.id),
					box_index = item.box_index,
					"Excluding duplicate box"
				);
				duplicates.push(item.id.clone());
			}
		}
		items.retain(|item| {
			if duplicates.contains(&item.id) {
				events.push(WorkflowEvent::Session(SessionEvent::ItemRejected {
					item_id: item.id.clone(),
					reason: format!("duplicate box for index {}", item.box_index),
				}));
				return false;
			}
			if item.is_product() && !seen_boxes.contains(&item.box_index) {
				tracing::warn!(
					item_id = %truncate_id(&item.id),
					box_index = item.box_index,
					"Excluding product without an owning box"
				);
				events.push(WorkflowEvent::Session(SessionEvent::ItemRejected {
					item_id: item.id.clone(),
					reason: format!("no box exists for index {}", item.box_index),
				}));
				return false;
			}
			true
		});

		ordering::sort_items(&mut items);

		let expected_total_portions = weights::total_portions(&items);

		// Resume at the first box that still has work; fall back to the
		// first box of the order.
		let active_box_index = items
			.iter()
			.filter(|i| i.is_box())
			.map(|i| i.box_index)
			.find(|&b| !progression::is_box_complete(&items, b))
			.or_else(|| progression::first_box_index(&items))
			.unwrap_or(0);

		let mut store = Self {
			order_id: order_id.to_string(),
			items,
			active_box_index,
			expected_total_portions,
		};
		store.promote_active_box(&mut events);

		(store, events)
	}

	/// Restores a store from a persisted session record.
	pub fn from_record(record: SessionRecord) -> Self {
		Self {
			order_id: record.order_id,
			items: record.items,
			active_box_index: record.active_box_index,
			expected_total_portions: record.expected_total_portions,
		}
	}

	/// Serializes the store for persistence.
	pub fn to_record(&self) -> SessionRecord {
		SessionRecord {
			order_id: self.order_id.clone(),
			active_box_index: self.active_box_index,
			expected_total_portions: self.expected_total_portions,
			items: self.items.clone(),
		}
	}

	/// The items of the order, in display order.
	pub fn items(&self) -> &[OrderItem] {
		&self.items
	}

	/// Index of the box the operator currently works through.
	pub fn active_box_index(&self) -> u32 {
		self.active_box_index
	}

	/// Identifier of the hydrated order.
	pub fn order_id(&self) -> &str {
		&self.order_id
	}

	/// Portion total captured at hydration time.
	pub fn expected_total_portions(&self) -> u32 {
		self.expected_total_portions
	}

	/// True while no order is hydrated.
	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// Handles a click on the given item.
	///
	/// Locked and inert items reject the click as a no-op; an actionable box
	/// confirms, an actionable product becomes the pending one.
	pub fn click(&mut self, item_id: &str) -> Result<ApplyOutcome, StoreError> {
		let index = self.index_of(item_id)?;

		if let Err(rejection) = progression::evaluate_click(&self.items, &self.items[index]) {
			tracing::debug!(
				item_id = %truncate_id(item_id),
				reason = rejection.reason(),
				"Click rejected"
			);
			return Ok(ApplyOutcome::rejected(item_id, rejection.reason()));
		}

		let mut events = Vec::new();
		let complete_before = weights::is_order_complete(&self.items);

		match self.items[index].status {
			ItemStatus::Box(_) => {
				self.transition(index, ItemStatus::Box(BoxStatus::Confirmed), &mut events);
			}
			ItemStatus::Product(_) => {
				self.transition(
					index,
					ItemStatus::Product(ProductStatus::Pending),
					&mut events,
				);
			}
		}

		self.emit_completion_edge(complete_before, &mut events);
		Ok(ApplyOutcome {
			changed: true,
			events,
		})
	}

	/// Applies a requested status to the item with the given id.
	///
	/// The item is resolved by id regardless of the active box; item identity
	/// is the authority, only selection is box-scoped. Requesting the status
	/// the item already has is a quiet no-op.
	pub fn set_status(
		&mut self,
		item_id: &str,
		status: ItemStatus,
	) -> Result<ApplyOutcome, StoreError> {
		let index = self.index_of(item_id)?;

		if self.items[index].status == status {
			tracing::debug!(item_id = %truncate_id(item_id), %status, "Status unchanged");
			return Ok(ApplyOutcome::unchanged());
		}

		if !self.items[index].status.can_transition_to(status) {
			return Err(StoreError::InvalidTransition {
				item_id: item_id.to_string(),
				from: self.items[index].status,
				to: status,
			});
		}

		let mut events = Vec::new();
		let complete_before = weights::is_order_complete(&self.items);
		self.transition(index, status, &mut events);
		self.emit_completion_edge(complete_before, &mut events);

		Ok(ApplyOutcome {
			changed: true,
			events,
		})
	}

	/// Advances the active box to the next higher index, if one exists.
	pub fn advance_box(&mut self) -> Result<ApplyOutcome, StoreError> {
		let Some(next) = progression::next_box_index(&self.items, self.active_box_index) else {
			tracing::debug!(
				active_box_index = self.active_box_index,
				"No next box to advance to"
			);
			return Ok(ApplyOutcome::unchanged());
		};

		self.active_box_index = next;
		let mut events = vec![WorkflowEvent::Box(BoxEvent::ActiveBoxChanged {
			box_index: next,
		})];
		self.promote_active_box(&mut events);

		Ok(ApplyOutcome {
			changed: true,
			events,
		})
	}

	fn index_of(&self, item_id: &str) -> Result<usize, StoreError> {
		self.items
			.iter()
			.position(|i| i.id == item_id)
			.ok_or_else(|| StoreError::UnknownItem(item_id.to_string()))
	}

	/// Moves the active box to awaiting confirmation when it is still
	/// untouched.
	fn promote_active_box(&mut self, events: &mut Vec<WorkflowEvent>) {
		if let Some(index) = self
			.items
			.iter()
			.position(|i| i.is_box() && i.box_index == self.active_box_index)
		{
			if self.items[index].box_status() == Some(BoxStatus::Default) {
				// Direct promotion; hydration and box advancement are the
				// only callers and both hold a legal Default state.
				self.items[index].status = ItemStatus::Box(BoxStatus::AwaitingConfirmation);
				events.push(WorkflowEvent::Item(ItemEvent::StatusChanged {
					item_id: self.items[index].id.clone(),
					status: self.items[index].status,
				}));
			}
		}
	}

	/// Applies a validated transition and emits the events that follow from
	/// it: the status change itself, pending resets, sound cues, box
	/// confirmation, and box completion.
	fn transition(&mut self, index: usize, to: ItemStatus, events: &mut Vec<WorkflowEvent>) {
		let item_id = self.items[index].id.clone();
		let box_index = self.items[index].box_index;

		self.items[index].status = to;
		events.push(WorkflowEvent::Item(ItemEvent::StatusChanged {
			item_id: item_id.clone(),
			status: to,
		}));
		tracing::info!(item_id = %truncate_id(&item_id), status = %to, "Status changed");

		match to {
			ItemStatus::Product(ProductStatus::Pending) => {
				self.reset_other_pending(index, box_index, events);
			}
			ItemStatus::Product(ProductStatus::Success) => {
				events.push(WorkflowEvent::Sound(SoundCue::Success));
			}
			ItemStatus::Product(ProductStatus::Error) => {
				events.push(WorkflowEvent::Sound(SoundCue::Error));
			}
			ItemStatus::Product(ProductStatus::Done) => {
				self.finish_box_if_complete(box_index, events);
			}
			ItemStatus::Box(BoxStatus::Confirmed) => {
				events.push(WorkflowEvent::Box(BoxEvent::Confirmed { box_index }));
				events.push(WorkflowEvent::Sound(SoundCue::Confirm));
			}
			_ => {}
		}
	}

	/// Resets every other pending product in the box back to default.
	///
	/// At most one product is pending per box at a time; this side effect
	/// restores the invariant whenever a new product becomes pending.
	fn reset_other_pending(
		&mut self,
		pending_index: usize,
		box_index: u32,
		events: &mut Vec<WorkflowEvent>,
	) {
		for i in 0..self.items.len() {
			if i == pending_index || self.items[i].box_index != box_index {
				continue;
			}
			if self.items[i].product_status() == Some(ProductStatus::Pending) {
				self.items[i].status = ItemStatus::Product(ProductStatus::Default);
				events.push(WorkflowEvent::Item(ItemEvent::StatusChanged {
					item_id: self.items[i].id.clone(),
					status: self.items[i].status,
				}));
			}
		}
	}

	/// Marks the box done once all its products are, emitting the completion
	/// event.
	fn finish_box_if_complete(&mut self, box_index: u32, events: &mut Vec<WorkflowEvent>) {
		if !progression::is_box_complete(&self.items, box_index) {
			return;
		}

		if let Some(index) = self
			.items
			.iter()
			.position(|i| i.is_box() && i.box_index == box_index)
		{
			if self.items[index].box_status() == Some(BoxStatus::Confirmed) {
				self.items[index].status = ItemStatus::Box(BoxStatus::Done);
				events.push(WorkflowEvent::Item(ItemEvent::StatusChanged {
					item_id: self.items[index].id.clone(),
					status: self.items[index].status,
				}));
			}
		}
		events.push(WorkflowEvent::Box(BoxEvent::Completed { box_index }));
	}

	/// Emits the order-completed events on the rising edge.
	fn emit_completion_edge(&self, complete_before: bool, events: &mut Vec<WorkflowEvent>) {
		if !complete_before && weights::is_order_complete(&self.items) {
			events.push(WorkflowEvent::Session(SessionEvent::OrderCompleted {
				order_id: self.order_id.clone(),
			}));
			events.push(WorkflowEvent::Sound(SoundCue::Complete));
		}
	}
}

#[cfg(test)]
mod tests;
