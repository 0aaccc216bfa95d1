//! Reducer tests for the item store.

use super::*;
use crate::{selection, weights};
use packer_types::{BoxStatus, ItemStatus, ProductStatus, RawOrderItem};
use proptest::prelude::*;

fn raw_box(id: &str, box_index: u32, weight: f64) -> RawOrderItem {
	serde_json::from_value(serde_json::json!({
		"id": id,
		"name": format!("Box {}", box_index),
		"quantity": 0,
		"expectedWeight": weight,
		"type": "box",
		"boxIndex": box_index,
		"status": "default",
	}))
	.unwrap()
}

fn raw_product(id: &str, name: &str, box_index: u32, quantity: u32, weight: f64) -> RawOrderItem {
	serde_json::from_value(serde_json::json!({
		"id": id,
		"name": name,
		"quantity": quantity,
		"expectedWeight": weight,
		"type": "product",
		"boxIndex": box_index,
		"status": "default",
	}))
	.unwrap()
}

/// The illustrative order: one box (0.3 kg) and two products
/// (A: qty 2, 0.4 kg; B: qty 1, 0.2 kg).
fn example_order() -> ItemStore {
	let (store, _) = ItemStore::hydrate(
		"order-17",
		vec![
			raw_box("b0", 0, 0.3),
			raw_product("a", "Product A", 0, 2, 0.4),
			raw_product("b", "Product B", 0, 1, 0.2),
		],
	);
	store
}

fn two_box_order() -> ItemStore {
	let (store, _) = ItemStore::hydrate(
		"order-18",
		vec![
			raw_box("b0", 0, 0.3),
			raw_product("p0", "Alpha", 0, 1, 0.4),
			raw_box("b1", 1, 0.25),
			raw_product("p1", "Beta", 1, 1, 0.5),
			raw_product("p2", "Gamma", 1, 1, 0.6),
		],
	);
	store
}

fn status_of(store: &ItemStore, id: &str) -> ItemStatus {
	store.items().iter().find(|i| i.id == id).unwrap().status
}

#[test]
fn test_hydration_promotes_first_box() {
	let store = example_order();
	assert_eq!(store.active_box_index(), 0);
	assert_eq!(
		status_of(&store, "b0"),
		ItemStatus::Box(BoxStatus::AwaitingConfirmation)
	);
	assert_eq!(store.expected_total_portions(), 3);

	// The selector starts on the box
	let active = selection::select_active_item(store.items(), 0).unwrap();
	assert_eq!(active.id, "b0");
}

#[test]
fn test_hydration_excludes_invalid_items() {
	let mut bad = raw_product("x", "Broken", 0, 1, 0.4);
	bad.name = None;

	let (store, events) = ItemStore::hydrate("order-19", vec![raw_box("b0", 0, 0.3), bad]);
	assert_eq!(store.items().len(), 1);
	assert!(events.iter().any(|e| matches!(
		e,
		WorkflowEvent::Session(SessionEvent::ItemRejected { item_id, .. }) if item_id == "x"
	)));

	// Excluded items do not contribute to aggregates
	assert!((weights::total_order_weight(store.items()) - 0.3).abs() < 1e-9);
}

#[test]
fn test_hydration_excludes_orphan_products_and_duplicate_boxes() {
	let (store, events) = ItemStore::hydrate(
		"order-20",
		vec![
			raw_box("b0", 0, 0.3),
			raw_box("b0-dup", 0, 0.3),
			raw_product("p0", "Alpha", 0, 1, 0.4),
			raw_product("orphan", "Orphan", 7, 1, 0.4),
		],
	);

	let ids: Vec<_> = store.items().iter().map(|i| i.id.as_str()).collect();
	assert!(ids.contains(&"b0"));
	assert!(ids.contains(&"p0"));
	assert!(!ids.contains(&"b0-dup"));
	assert!(!ids.contains(&"orphan"));

	let rejected: Vec<_> = events
		.iter()
		.filter(|e| matches!(e, WorkflowEvent::Session(SessionEvent::ItemRejected { .. })))
		.collect();
	assert_eq!(rejected.len(), 2);
}

#[test]
fn test_scenario_full_packing_run() {
	let mut store = example_order();

	// Clicking the box confirms it; the active item becomes product A
	let outcome = store.click("b0").unwrap();
	assert!(outcome.changed);
	assert_eq!(status_of(&store, "b0"), ItemStatus::Box(BoxStatus::Confirmed));
	assert!(outcome
		.events
		.iter()
		.any(|e| matches!(e, WorkflowEvent::Box(BoxEvent::Confirmed { box_index: 0 }))));
	assert_eq!(
		selection::select_active_item(store.items(), 0).unwrap().id,
		"a"
	);

	// Work product A to done
	store.click("a").unwrap();
	store
		.set_status("a", ItemStatus::Product(ProductStatus::Success))
		.unwrap();
	store
		.set_status("a", ItemStatus::Product(ProductStatus::Done))
		.unwrap();

	assert_eq!(
		selection::select_active_item(store.items(), 0).unwrap().id,
		"b"
	);
	assert!((weights::current_scale_weight(store.items(), 0) - 0.7).abs() < 1e-9);

	// Work product B to done; the order completes
	store.click("b").unwrap();
	store
		.set_status("b", ItemStatus::Product(ProductStatus::Success))
		.unwrap();
	let outcome = store
		.set_status("b", ItemStatus::Product(ProductStatus::Done))
		.unwrap();

	assert!(weights::is_order_complete(store.items()));
	assert_eq!(weights::total_packed_portions(store.items()), 3);
	assert!(outcome
		.events
		.iter()
		.any(|e| matches!(e, WorkflowEvent::Box(BoxEvent::Completed { box_index: 0 }))));
	assert!(outcome.events.iter().any(|e| matches!(
		e,
		WorkflowEvent::Session(SessionEvent::OrderCompleted { order_id }) if order_id == "order-17"
	)));
	assert!(outcome
		.events
		.iter()
		.any(|e| matches!(e, WorkflowEvent::Sound(SoundCue::Complete))));

	// The box goes done with its products and is now inert
	assert_eq!(status_of(&store, "b0"), ItemStatus::Box(BoxStatus::Done));
	let rejected = store.click("b0").unwrap();
	assert!(!rejected.changed);
}

#[test]
fn test_click_on_product_of_unconfirmed_box_is_noop() {
	let mut store = example_order();

	let outcome = store.click("a").unwrap();
	assert!(!outcome.changed);
	assert!(matches!(
		outcome.events.as_slice(),
		[WorkflowEvent::Item(ItemEvent::ClickRejected { .. })]
	));
	assert_eq!(
		status_of(&store, "a"),
		ItemStatus::Product(ProductStatus::Default)
	);
	assert_eq!(
		selection::select_active_item(store.items(), 0).unwrap().id,
		"b0"
	);
}

#[test]
fn test_single_pending_per_box() {
	let mut store = example_order();
	store.click("b0").unwrap();

	store.click("a").unwrap();
	assert_eq!(
		status_of(&store, "a"),
		ItemStatus::Product(ProductStatus::Pending)
	);

	// Clicking B resets A back to default
	let outcome = store.click("b").unwrap();
	assert_eq!(
		status_of(&store, "b"),
		ItemStatus::Product(ProductStatus::Pending)
	);
	assert_eq!(
		status_of(&store, "a"),
		ItemStatus::Product(ProductStatus::Default)
	);
	assert!(outcome.events.iter().any(|e| matches!(
		e,
		WorkflowEvent::Item(ItemEvent::StatusChanged { item_id, status: ItemStatus::Product(ProductStatus::Default) }) if item_id == "a"
	)));
}

#[test]
fn test_pending_reset_is_scoped_per_box() {
	let mut store = two_box_order();

	// Finish box 0 so we can advance
	store.click("b0").unwrap();
	store.click("p0").unwrap();
	store
		.set_status("p0", ItemStatus::Product(ProductStatus::Success))
		.unwrap();
	store
		.set_status("p0", ItemStatus::Product(ProductStatus::Done))
		.unwrap();

	store.advance_box().unwrap();
	store.click("b1").unwrap();
	store.click("p1").unwrap();

	// A pending product in box 1 does not touch box 0 history, and a second
	// pending in box 1 resets only its sibling
	store.click("p2").unwrap();
	assert_eq!(
		status_of(&store, "p1"),
		ItemStatus::Product(ProductStatus::Default)
	);
	assert_eq!(
		status_of(&store, "p2"),
		ItemStatus::Product(ProductStatus::Pending)
	);
	assert_eq!(
		status_of(&store, "p0"),
		ItemStatus::Product(ProductStatus::Done)
	);
}

#[test]
fn test_advance_box_promotes_next_box() {
	let mut store = two_box_order();
	assert_eq!(store.active_box_index(), 0);
	assert_eq!(status_of(&store, "b1"), ItemStatus::Box(BoxStatus::Default));

	let outcome = store.advance_box().unwrap();
	assert_eq!(store.active_box_index(), 1);
	assert_eq!(
		status_of(&store, "b1"),
		ItemStatus::Box(BoxStatus::AwaitingConfirmation)
	);
	assert!(outcome
		.events
		.iter()
		.any(|e| matches!(e, WorkflowEvent::Box(BoxEvent::ActiveBoxChanged { box_index: 1 }))));

	// Selection now resolves against box 1 only
	assert_eq!(
		selection::select_active_item(store.items(), store.active_box_index())
			.unwrap()
			.id,
		"b1"
	);

	// No third box
	let outcome = store.advance_box().unwrap();
	assert!(!outcome.changed);
}

#[test]
fn test_stale_command_applies_by_item_id() {
	let mut store = two_box_order();
	store.click("b0").unwrap();
	store.click("p0").unwrap();
	store.advance_box().unwrap();

	// The weighing of p0 resolves after the operator already moved to box 1
	store
		.set_status("p0", ItemStatus::Product(ProductStatus::Success))
		.unwrap();
	store
		.set_status("p0", ItemStatus::Product(ProductStatus::Done))
		.unwrap();
	assert_eq!(
		status_of(&store, "p0"),
		ItemStatus::Product(ProductStatus::Done)
	);
}

#[test]
fn test_invalid_transition_rejected() {
	let mut store = example_order();

	let err = store
		.set_status("a", ItemStatus::Product(ProductStatus::Done))
		.unwrap_err();
	assert!(matches!(err, StoreError::InvalidTransition { .. }));
	assert_eq!(
		status_of(&store, "a"),
		ItemStatus::Product(ProductStatus::Default)
	);

	let err = store
		.set_status("a", ItemStatus::Box(BoxStatus::Confirmed))
		.unwrap_err();
	assert!(matches!(err, StoreError::InvalidTransition { .. }));
}

#[test]
fn test_unknown_item() {
	let mut store = example_order();
	assert!(matches!(
		store.click("nope"),
		Err(StoreError::UnknownItem(_))
	));
	assert!(matches!(
		store.set_status("nope", ItemStatus::Product(ProductStatus::Pending)),
		Err(StoreError::UnknownItem(_))
	));
}

#[test]
fn test_same_status_is_quiet_noop() {
	let mut store = example_order();
	let outcome = store
		.set_status("a", ItemStatus::Product(ProductStatus::Default))
		.unwrap();
	assert!(!outcome.changed);
	assert!(outcome.events.is_empty());
}

#[test]
fn test_error_product_can_be_retried() {
	let mut store = example_order();
	store.click("b0").unwrap();
	store.click("a").unwrap();
	store
		.set_status("a", ItemStatus::Product(ProductStatus::Error))
		.unwrap();

	// The errored product is clickable again and becomes pending
	let outcome = store.click("a").unwrap();
	assert!(outcome.changed);
	assert_eq!(
		status_of(&store, "a"),
		ItemStatus::Product(ProductStatus::Pending)
	);
}

#[test]
fn test_session_record_round_trip() {
	let mut store = example_order();
	store.click("b0").unwrap();
	store.click("a").unwrap();

	let record = store.to_record();
	let restored = ItemStore::from_record(record);

	assert_eq!(restored.order_id(), "order-17");
	assert_eq!(restored.active_box_index(), 0);
	assert_eq!(restored.expected_total_portions(), 3);
	assert_eq!(
		status_of(&restored, "a"),
		ItemStatus::Product(ProductStatus::Pending)
	);
}

proptest! {
	/// At most one product per box is pending, for all click sequences.
	#[test]
	fn prop_single_pending_per_box_for_all_click_sequences(
		clicks in prop::collection::vec(0usize..7, 0..60)
	) {
		// Index 6 is the advance-box action, everything else a click
		let ids = ["b0", "p0", "b1", "p1", "p2", "nope"];
		let mut store = two_box_order();

		for click in clicks {
			if click == 6 {
				let _ = store.advance_box();
			} else {
				// Unknown items error, everything else is applied or rejected
				let _ = store.click(ids[click]);
			}

			for box_index in [0u32, 1u32] {
				let pending = store
					.items()
					.iter()
					.filter(|i| i.box_index == box_index)
					.filter(|i| i.product_status() == Some(ProductStatus::Pending))
					.count();
				prop_assert!(pending <= 1, "box {} has {} pending items", box_index, pending);
			}
		}
	}

	/// The selector never points at a product whose box is unconfirmed.
	#[test]
	fn prop_selector_respects_box_confirmation(
		clicks in prop::collection::vec(0usize..5, 0..30)
	) {
		let ids = ["b0", "p0", "b1", "p1", "p2"];
		let mut store = two_box_order();

		for click in clicks {
			let _ = store.click(ids[click]);

			if let Some(active) =
				selection::select_active_item(store.items(), store.active_box_index())
			{
				if active.is_product() {
					prop_assert!(crate::progression::is_box_confirmed(
						store.items(),
						active.box_index
					));
				}
			}
		}
	}
}
