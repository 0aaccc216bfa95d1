//! Deterministic ordering of items within an order.
//!
//! Produces the total order used both for display and as the tie-break when
//! several candidate "next" products exist: manual order ascending (absent
//! sorts last), boxes before products, then name ascending. Pure and
//! deterministic; sorting is idempotent.

use packer_types::{ItemKind, OrderItem};
use std::cmp::Ordering;

/// Rank of an item kind in the display order; boxes come first.
fn kind_rank(kind: ItemKind) -> u8 {
	match kind {
		ItemKind::Box => 0,
		ItemKind::Product => 1,
	}
}

/// Compares two items by `(manual_order, kind, name)`.
pub fn compare_items(a: &OrderItem, b: &OrderItem) -> Ordering {
	a.manual_order_key()
		.cmp(&b.manual_order_key())
		.then_with(|| kind_rank(a.kind).cmp(&kind_rank(b.kind)))
		.then_with(|| a.name.cmp(&b.name))
}

/// Sorts items in place into display order.
pub fn sort_items(items: &mut [OrderItem]) {
	items.sort_by(compare_items);
}

/// Returns references to the given items in display order.
pub fn sorted<'a, I>(items: I) -> Vec<&'a OrderItem>
where
	I: IntoIterator<Item = &'a OrderItem>,
{
	let mut refs: Vec<&OrderItem> = items.into_iter().collect();
	refs.sort_by(|a, b| compare_items(a, b));
	refs
}

#[cfg(test)]
mod tests {
	use super::*;
	use packer_types::{BoxStatus, ItemStatus, ProductStatus};
	use proptest::prelude::*;

	fn item(id: &str, name: &str, kind: ItemKind, manual_order: Option<i64>) -> OrderItem {
		let status = match kind {
			ItemKind::Box => ItemStatus::Box(BoxStatus::Default),
			ItemKind::Product => ItemStatus::Product(ProductStatus::Default),
		};
		OrderItem {
			id: id.to_string(),
			name: name.to_string(),
			quantity: 1,
			expected_weight: 0.5,
			kind,
			box_index: 0,
			manual_order,
			status,
			box_settings: None,
			portions_range: None,
			portions_per_box: None,
		}
	}

	#[test]
	fn test_manual_order_dominates() {
		let mut items = vec![
			item("p1", "aaa", ItemKind::Product, Some(5)),
			item("p2", "zzz", ItemKind::Product, Some(1)),
		];
		sort_items(&mut items);
		assert_eq!(items[0].id, "p2");
	}

	#[test]
	fn test_absent_manual_order_sorts_last() {
		let mut items = vec![
			item("p1", "aaa", ItemKind::Product, None),
			item("p2", "zzz", ItemKind::Product, Some(10)),
		];
		sort_items(&mut items);
		assert_eq!(items[0].id, "p2");
	}

	#[test]
	fn test_box_before_product_on_equal_manual_order() {
		let mut items = vec![
			item("p1", "aaa", ItemKind::Product, None),
			item("b1", "zzz", ItemKind::Box, None),
		];
		sort_items(&mut items);
		assert_eq!(items[0].id, "b1");
	}

	#[test]
	fn test_name_breaks_remaining_ties() {
		let mut items = vec![
			item("p2", "beta", ItemKind::Product, None),
			item("p1", "alpha", ItemKind::Product, None),
		];
		sort_items(&mut items);
		assert_eq!(items[0].id, "p1");
	}

	#[test]
	fn test_sorted_does_not_mutate_input() {
		let items = vec![
			item("p2", "beta", ItemKind::Product, None),
			item("p1", "alpha", ItemKind::Product, None),
		];
		let ordered = sorted(&items);
		assert_eq!(ordered[0].id, "p1");
		assert_eq!(items[0].id, "p2");
	}

	// Strategy for generating arbitrary items
	prop_compose! {
		fn arbitrary_item()
			(id in 0u32..50, name in "[a-d]{1,4}", is_box in any::<bool>(),
			 manual_order in prop::option::of(0i64..20))
			-> OrderItem
		{
			let kind = if is_box { ItemKind::Box } else { ItemKind::Product };
			item(&format!("i{}", id), &name, kind, manual_order)
		}
	}

	proptest! {
		#[test]
		fn prop_sort_is_idempotent(
			items in prop::collection::vec(arbitrary_item(), 0..20)
		) {
			let mut once = items.clone();
			sort_items(&mut once);
			let mut twice = once.clone();
			sort_items(&mut twice);

			let once_ids: Vec<_> = once.iter().map(|i| i.id.clone()).collect();
			let twice_ids: Vec<_> = twice.iter().map(|i| i.id.clone()).collect();
			prop_assert_eq!(once_ids, twice_ids);
		}

		#[test]
		fn prop_sort_is_consistent_with_key(
			items in prop::collection::vec(arbitrary_item(), 0..20)
		) {
			let mut sorted_items = items.clone();
			sort_items(&mut sorted_items);

			for pair in sorted_items.windows(2) {
				let key = |i: &OrderItem| {
					(i.manual_order_key(), kind_rank(i.kind), i.name.clone())
				};
				prop_assert!(key(&pair[0]) <= key(&pair[1]));
			}
		}

		#[test]
		fn prop_comparator_is_total(
			a in arbitrary_item(),
			b in arbitrary_item(),
			c in arbitrary_item()
		) {
			// Antisymmetry
			prop_assert_eq!(compare_items(&a, &b), compare_items(&b, &a).reverse());
			// Transitivity
			if compare_items(&a, &b) == Ordering::Less
				&& compare_items(&b, &c) == Ordering::Less
			{
				prop_assert_eq!(compare_items(&a, &c), Ordering::Less);
			}
		}
	}
}
