//! Weight and portion aggregates.
//!
//! Pure aggregate reads recomputed from the full item list on every mutation.
//! No rounding is applied here; display formatting is the consumer's concern.

use packer_types::{OrderItem, ProductStatus};
use thiserror::Error;

/// Raised when the completion definitions stop agreeing with each other.
///
/// Per the data model, order completeness derived from per-item statuses and
/// from portion accounting must always agree; a divergence means item data
/// was mutated outside the command interface and is treated as a defect, not
/// as a recoverable state.
#[derive(Debug, Error, PartialEq)]
pub enum IntegrityError {
	#[error(
		"Completion accounting diverged: every product is done but {packed} of {expected} portions are packed"
	)]
	PortionsBehindItems { packed: u32, expected: u32 },
	#[error(
		"Completion accounting diverged: {packed} of {expected} portions are packed but not every product is done"
	)]
	ItemsBehindPortions { packed: u32, expected: u32 },
}

/// Sum of expected weights over all items in the given box.
pub fn current_box_weight(items: &[OrderItem], box_index: u32) -> f64 {
	items
		.iter()
		.filter(|i| i.box_index == box_index)
		.map(|i| i.expected_weight)
		.sum()
}

/// Weight the scale should currently read for the given box: the box tare
/// plus every completed product, added cumulatively as the operator works
/// through the box.
pub fn current_scale_weight(items: &[OrderItem], box_index: u32) -> f64 {
	items
		.iter()
		.filter(|i| i.box_index == box_index)
		.filter(|i| i.is_box() || i.product_status() == Some(ProductStatus::Done))
		.map(|i| i.expected_weight)
		.sum()
}

/// Sum of expected weights over every item in the order, regardless of
/// status.
pub fn total_order_weight(items: &[OrderItem]) -> f64 {
	items.iter().map(|i| i.expected_weight).sum()
}

/// Sum of portions over done products in the given box.
pub fn packed_portions(items: &[OrderItem], box_index: u32) -> u32 {
	items
		.iter()
		.filter(|i| i.box_index == box_index)
		.filter(|i| i.product_status() == Some(ProductStatus::Done))
		.map(|i| i.quantity)
		.sum()
}

/// Sum of portions over done products across all boxes.
pub fn total_packed_portions(items: &[OrderItem]) -> u32 {
	items
		.iter()
		.filter(|i| i.product_status() == Some(ProductStatus::Done))
		.map(|i| i.quantity)
		.sum()
}

/// Sum of portions over all products in the order.
pub fn total_portions(items: &[OrderItem]) -> u32 {
	items
		.iter()
		.filter(|i| i.is_product())
		.map(|i| i.quantity)
		.sum()
}

/// True iff the order has products and every product is done.
///
/// The empty item list reads as incomplete so an unhydrated session can
/// never arm the auto-print trigger.
pub fn is_order_complete(items: &[OrderItem]) -> bool {
	let mut has_product = false;
	for item in items.iter().filter(|i| i.is_product()) {
		has_product = true;
		if item.product_status() != Some(ProductStatus::Done) {
			return false;
		}
	}
	has_product
}

/// Returns whether the order is complete, cross-checking the per-item
/// definition against portion accounting.
///
/// `expected_total_portions` is the portion total captured at hydration
/// time. The two completion definitions must agree; when they do not (an
/// item was removed or mutated outside the command interface) the order is
/// treated as a data-integrity defect rather than complete.
pub fn check_completion_integrity(
	items: &[OrderItem],
	expected_total_portions: u32,
) -> Result<bool, IntegrityError> {
	let complete = is_order_complete(items);
	let packed = total_packed_portions(items);

	if complete && packed != expected_total_portions {
		return Err(IntegrityError::PortionsBehindItems {
			packed,
			expected: expected_total_portions,
		});
	}
	if !complete && expected_total_portions > 0 && packed >= expected_total_portions {
		return Err(IntegrityError::ItemsBehindPortions {
			packed,
			expected: expected_total_portions,
		});
	}

	Ok(complete)
}

#[cfg(test)]
mod tests {
	use super::*;
	use packer_types::{BoxStatus, ItemKind, ItemStatus};
	use proptest::prelude::*;

	fn box_item(box_index: u32, weight: f64, status: BoxStatus) -> OrderItem {
		OrderItem {
			id: format!("b{}", box_index),
			name: format!("Box {}", box_index),
			quantity: 0,
			expected_weight: weight,
			kind: ItemKind::Box,
			box_index,
			manual_order: None,
			status: ItemStatus::Box(status),
			box_settings: None,
			portions_range: None,
			portions_per_box: None,
		}
	}

	fn product(
		id: &str,
		box_index: u32,
		quantity: u32,
		weight: f64,
		status: ProductStatus,
	) -> OrderItem {
		OrderItem {
			id: id.to_string(),
			name: id.to_string(),
			quantity,
			expected_weight: weight,
			kind: ItemKind::Product,
			box_index,
			manual_order: None,
			status: ItemStatus::Product(status),
			box_settings: None,
			portions_range: None,
			portions_per_box: None,
		}
	}

	/// The illustrative order: one box (0.3 kg) with products A (qty 2,
	/// 0.4 kg) and B (qty 1, 0.2 kg).
	fn example_order(a: ProductStatus, b: ProductStatus) -> Vec<OrderItem> {
		vec![
			box_item(0, 0.3, BoxStatus::Confirmed),
			product("a", 0, 2, 0.4, a),
			product("b", 0, 1, 0.2, b),
		]
	}

	#[test]
	fn test_scale_weight_accumulates_done_products() {
		let items = example_order(ProductStatus::Default, ProductStatus::Default);
		assert!((current_scale_weight(&items, 0) - 0.3).abs() < 1e-9);

		let items = example_order(ProductStatus::Done, ProductStatus::Default);
		assert!((current_scale_weight(&items, 0) - 0.7).abs() < 1e-9);

		let items = example_order(ProductStatus::Done, ProductStatus::Done);
		assert!((current_scale_weight(&items, 0) - 0.9).abs() < 1e-9);
	}

	#[test]
	fn test_box_weight_ignores_status() {
		let items = example_order(ProductStatus::Default, ProductStatus::Pending);
		assert!((current_box_weight(&items, 0) - 0.9).abs() < 1e-9);
	}

	#[test]
	fn test_portion_accounting() {
		let items = example_order(ProductStatus::Done, ProductStatus::Default);
		assert_eq!(packed_portions(&items, 0), 2);
		assert_eq!(total_packed_portions(&items), 2);
		assert_eq!(total_portions(&items), 3);

		let items = example_order(ProductStatus::Done, ProductStatus::Done);
		assert_eq!(total_packed_portions(&items), 3);
		assert!(is_order_complete(&items));
	}

	#[test]
	fn test_empty_order_is_not_complete() {
		assert!(!is_order_complete(&[]));
		let only_box = vec![box_item(0, 0.3, BoxStatus::Confirmed)];
		assert!(!is_order_complete(&only_box));
	}

	#[test]
	fn test_completion_integrity_agreement() {
		let items = example_order(ProductStatus::Done, ProductStatus::Done);
		assert_eq!(check_completion_integrity(&items, 3), Ok(true));

		let items = example_order(ProductStatus::Done, ProductStatus::Default);
		assert_eq!(check_completion_integrity(&items, 3), Ok(false));
	}

	#[test]
	fn test_silently_removed_product_is_a_defect() {
		// Hydration counted 3 portions, then product B vanished from the
		// list outside the command interface.
		let mut items = example_order(ProductStatus::Done, ProductStatus::Done);
		items.retain(|i| i.id != "b");

		let err = check_completion_integrity(&items, 3).unwrap_err();
		assert_eq!(
			err,
			IntegrityError::PortionsBehindItems {
				packed: 2,
				expected: 3
			}
		);
	}

	#[test]
	fn test_foreign_done_portions_is_a_defect() {
		// A product was injected as done without ever being part of the
		// hydrated order.
		let mut items = example_order(ProductStatus::Done, ProductStatus::Default);
		items.push(product("x", 0, 5, 0.1, ProductStatus::Done));

		let err = check_completion_integrity(&items, 3).unwrap_err();
		assert_eq!(
			err,
			IntegrityError::ItemsBehindPortions {
				packed: 7,
				expected: 3
			}
		);
	}

	prop_compose! {
		fn arbitrary_status()
			(choice in 0u8..5)
			-> ProductStatus
		{
			match choice {
				0 => ProductStatus::Default,
				1 => ProductStatus::Pending,
				2 => ProductStatus::Success,
				3 => ProductStatus::Error,
				_ => ProductStatus::Done,
			}
		}
	}

	proptest! {
		#[test]
		fn prop_total_weight_ignores_status(
			statuses in prop::collection::vec(arbitrary_status(), 1..10),
			weights in prop::collection::vec(0.0f64..5.0, 1..10)
		) {
			let items: Vec<OrderItem> = statuses
				.iter()
				.zip(weights.iter())
				.enumerate()
				.map(|(i, (status, weight))| product(&format!("p{}", i), 0, 1, *weight, *status))
				.collect();

			let expected: f64 = items.iter().map(|i| i.expected_weight).sum();
			prop_assert!((total_order_weight(&items) - expected).abs() < 1e-9);
		}

		#[test]
		fn prop_completion_definitions_agree_under_command_interface(
			statuses in prop::collection::vec(arbitrary_status(), 1..10)
		) {
			// As long as items are only mutated in place, the per-item and
			// portion definitions of completeness agree.
			let items: Vec<OrderItem> = statuses
				.iter()
				.enumerate()
				.map(|(i, status)| product(&format!("p{}", i), 0, (i as u32 % 3) + 1, 0.2, *status))
				.collect();

			let expected_total = total_portions(&items);
			let complete = check_completion_integrity(&items, expected_total).unwrap();
			prop_assert_eq!(complete, is_order_complete(&items));
			prop_assert_eq!(
				complete,
				total_packed_portions(&items) == expected_total
			);
		}
	}
}
