//! Active-item selection.
//!
//! Picks the single item the operator is currently expected to act on, given
//! the full item list and the active box index. Recomputed on every item-list
//! or active-box change; the result is a pure function of its inputs.

use crate::ordering;
use packer_types::{BoxStatus, OrderItem, ProductStatus};

/// Selects the active item for the given box, if any.
///
/// Priority order, scoped to items whose box index equals `active_box_index`:
/// 1. the pending product (several pending products should not occur; if they
///    do, the first in display order wins and a warning is logged),
/// 2. the box item awaiting confirmation,
/// 3. the first default product in display order,
/// 4. none.
///
/// Box confirmation is thereby interposed before any product in that box
/// becomes selectable.
pub fn select_active_item<'a>(
	items: &'a [OrderItem],
	active_box_index: u32,
) -> Option<&'a OrderItem> {
	let in_box: Vec<&OrderItem> = items
		.iter()
		.filter(|i| i.box_index == active_box_index)
		.collect();

	let pending: Vec<&OrderItem> = ordering::sorted(in_box.iter().copied())
		.into_iter()
		.filter(|i| i.product_status() == Some(ProductStatus::Pending))
		.collect();
	if let Some(first) = pending.first() {
		if pending.len() > 1 {
			tracing::warn!(
				box_index = active_box_index,
				count = pending.len(),
				"Multiple pending products in one box; selecting the first in display order"
			);
		}
		return Some(*first);
	}

	if let Some(awaiting) = in_box
		.iter()
		.copied()
		.find(|i| i.box_status() == Some(BoxStatus::AwaitingConfirmation))
	{
		return Some(awaiting);
	}

	ordering::sorted(in_box)
		.into_iter()
		.find(|i| i.product_status() == Some(ProductStatus::Default))
}

#[cfg(test)]
mod tests {
	use super::*;
	use packer_types::{ItemKind, ItemStatus};

	fn box_item(box_index: u32, status: BoxStatus) -> OrderItem {
		OrderItem {
			id: format!("b{}", box_index),
			name: format!("Box {}", box_index),
			quantity: 0,
			expected_weight: 0.3,
			kind: ItemKind::Box,
			box_index,
			manual_order: None,
			status: ItemStatus::Box(status),
			box_settings: None,
			portions_range: None,
			portions_per_box: None,
		}
	}

	fn product(id: &str, name: &str, box_index: u32, status: ProductStatus) -> OrderItem {
		OrderItem {
			id: id.to_string(),
			name: name.to_string(),
			quantity: 1,
			expected_weight: 0.4,
			kind: ItemKind::Product,
			box_index,
			manual_order: None,
			status: ItemStatus::Product(status),
			box_settings: None,
			portions_range: None,
			portions_per_box: None,
		}
	}

	#[test]
	fn test_pending_product_wins() {
		let items = vec![
			box_item(0, BoxStatus::AwaitingConfirmation),
			product("p1", "alpha", 0, ProductStatus::Default),
			product("p2", "beta", 0, ProductStatus::Pending),
		];
		assert_eq!(select_active_item(&items, 0).unwrap().id, "p2");
	}

	#[test]
	fn test_awaiting_box_before_default_products() {
		let items = vec![
			box_item(0, BoxStatus::AwaitingConfirmation),
			product("p1", "alpha", 0, ProductStatus::Default),
		];
		assert_eq!(select_active_item(&items, 0).unwrap().id, "b0");
	}

	#[test]
	fn test_first_default_product_by_display_order() {
		let items = vec![
			box_item(0, BoxStatus::Confirmed),
			product("p1", "beta", 0, ProductStatus::Default),
			product("p2", "alpha", 0, ProductStatus::Default),
			product("p3", "aaa", 0, ProductStatus::Done),
		];
		assert_eq!(select_active_item(&items, 0).unwrap().id, "p2");
	}

	#[test]
	fn test_none_when_box_finished() {
		let items = vec![
			box_item(0, BoxStatus::Done),
			product("p1", "alpha", 0, ProductStatus::Done),
		];
		assert!(select_active_item(&items, 0).is_none());
	}

	#[test]
	fn test_selection_scoped_to_active_box() {
		let items = vec![
			box_item(0, BoxStatus::Confirmed),
			product("p1", "alpha", 0, ProductStatus::Default),
			box_item(1, BoxStatus::AwaitingConfirmation),
			product("p2", "beta", 1, ProductStatus::Default),
		];
		assert_eq!(select_active_item(&items, 0).unwrap().id, "p1");
		assert_eq!(select_active_item(&items, 1).unwrap().id, "b1");
	}

	#[test]
	fn test_never_selects_product_of_unconfirmed_box() {
		// An unconfirmed box always sits in front of its products
		let items = vec![
			box_item(0, BoxStatus::AwaitingConfirmation),
			product("p1", "alpha", 0, ProductStatus::Default),
			product("p2", "beta", 0, ProductStatus::Default),
		];
		let active = select_active_item(&items, 0).unwrap();
		assert!(active.is_box());
	}

	#[test]
	fn test_multiple_pending_resolved_by_display_order() {
		let items = vec![
			box_item(0, BoxStatus::Confirmed),
			product("p1", "beta", 0, ProductStatus::Pending),
			product("p2", "alpha", 0, ProductStatus::Pending),
		];
		assert_eq!(select_active_item(&items, 0).unwrap().id, "p2");
	}
}
