//! Box progression queries.
//!
//! Pure predicates over the item list answering the questions the workflow
//! asks about a box: is it complete, is it confirmed, and does a next box
//! exist. These also back the click-ability guard enforced before any
//! command is accepted.

use packer_types::{BoxStatus, OrderItem, ProductStatus};

/// True iff the box has at least one product and all its products are done.
pub fn is_box_complete(items: &[OrderItem], box_index: u32) -> bool {
	let mut has_product = false;
	for item in items
		.iter()
		.filter(|i| i.is_product() && i.box_index == box_index)
	{
		has_product = true;
		if item.product_status() != Some(ProductStatus::Done) {
			return false;
		}
	}
	has_product
}

/// True iff the box item for the given index is confirmed or done.
pub fn is_box_confirmed(items: &[OrderItem], box_index: u32) -> bool {
	items
		.iter()
		.find(|i| i.is_box() && i.box_index == box_index)
		.and_then(|b| b.box_status())
		.is_some_and(|status| status.is_confirmed())
}

/// True iff any box exists with an index greater than `active_index`.
pub fn has_next_box(items: &[OrderItem], active_index: u32) -> bool {
	next_box_index(items, active_index).is_some()
}

/// Returns the lowest box index greater than `active_index`, if any.
pub fn next_box_index(items: &[OrderItem], active_index: u32) -> Option<u32> {
	items
		.iter()
		.filter(|i| i.is_box() && i.box_index > active_index)
		.map(|i| i.box_index)
		.min()
}

/// Returns the lowest box index present in the order, if any.
pub fn first_box_index(items: &[OrderItem]) -> Option<u32> {
	items
		.iter()
		.filter(|i| i.is_box())
		.map(|i| i.box_index)
		.min()
}

/// Why a click on an item was rejected.
///
/// Rejections are normal guards, not faults; the reducer turns them into a
/// `ClickRejected` event and leaves the item list untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickRejection {
	/// The item has reached its terminal status and is inert.
	ItemDone,
	/// The box is not awaiting its confirmation weighing.
	BoxNotAwaitingConfirmation,
	/// The product's box has not been confirmed yet.
	BoxNotConfirmed,
	/// The product is already the pending one.
	AlreadyPending,
	/// The product has already passed its weighing.
	WeighingFinished,
}

impl ClickRejection {
	/// Human-readable reason used in events and logs.
	pub fn reason(&self) -> &'static str {
		match self {
			ClickRejection::ItemDone => "item is done and permanently inert",
			ClickRejection::BoxNotAwaitingConfirmation => "box is not awaiting confirmation",
			ClickRejection::BoxNotConfirmed => "box has not been confirmed",
			ClickRejection::AlreadyPending => "item is already pending",
			ClickRejection::WeighingFinished => "item has already been weighed",
		}
	}
}

/// Decides whether a click on `item` is actionable given the full item list.
///
/// A box item is actionable only when awaiting confirmation; a product item
/// only once its box is confirmed; any done item is permanently inert.
pub fn evaluate_click(items: &[OrderItem], item: &OrderItem) -> Result<(), ClickRejection> {
	if item.is_done() {
		return Err(ClickRejection::ItemDone);
	}

	match item.status {
		packer_types::ItemStatus::Box(status) => {
			if status == BoxStatus::AwaitingConfirmation {
				Ok(())
			} else {
				Err(ClickRejection::BoxNotAwaitingConfirmation)
			}
		}
		packer_types::ItemStatus::Product(status) => {
			if !is_box_confirmed(items, item.box_index) {
				return Err(ClickRejection::BoxNotConfirmed);
			}
			match status {
				ProductStatus::Pending => Err(ClickRejection::AlreadyPending),
				ProductStatus::Success => Err(ClickRejection::WeighingFinished),
				ProductStatus::Default | ProductStatus::Error => Ok(()),
				// Covered by the is_done guard above
				ProductStatus::Done => Err(ClickRejection::ItemDone),
			}
		}
	}
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

	fn product(id: &str, box_index: u32, status: ProductStatus) -> OrderItem {
		OrderItem {
			id: id.to_string(),
			name: id.to_string(),
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
	fn test_box_complete_requires_products() {
		let items = vec![box_item(0, BoxStatus::Confirmed)];
		assert!(!is_box_complete(&items, 0));
	}

	#[test]
	fn test_box_complete_when_all_products_done() {
		let items = vec![
			box_item(0, BoxStatus::Confirmed),
			product("p1", 0, ProductStatus::Done),
			product("p2", 0, ProductStatus::Done),
			product("p3", 1, ProductStatus::Default),
		];
		assert!(is_box_complete(&items, 0));
		assert!(!is_box_complete(&items, 1));
	}

	#[test]
	fn test_box_confirmed_statuses() {
		for (status, expected) in [
			(BoxStatus::Default, false),
			(BoxStatus::AwaitingConfirmation, false),
			(BoxStatus::Confirmed, true),
			(BoxStatus::Done, true),
		] {
			let items = vec![box_item(0, status)];
			assert_eq!(is_box_confirmed(&items, 0), expected, "{:?}", status);
		}
	}

	#[test]
	fn test_next_box() {
		let items = vec![
			box_item(0, BoxStatus::Confirmed),
			box_item(2, BoxStatus::Default),
			box_item(5, BoxStatus::Default),
		];
		assert!(has_next_box(&items, 0));
		assert_eq!(next_box_index(&items, 0), Some(2));
		assert_eq!(next_box_index(&items, 2), Some(5));
		assert_eq!(next_box_index(&items, 5), None);
		assert!(!has_next_box(&items, 5));
		assert_eq!(first_box_index(&items), Some(0));
	}

	#[test]
	fn test_click_rejected_for_unconfirmed_box_product() {
		let items = vec![
			box_item(0, BoxStatus::AwaitingConfirmation),
			product("p1", 0, ProductStatus::Default),
		];
		assert_eq!(
			evaluate_click(&items, &items[1]),
			Err(ClickRejection::BoxNotConfirmed)
		);
	}

	#[test]
	fn test_click_allowed_once_box_confirmed() {
		let items = vec![
			box_item(0, BoxStatus::Confirmed),
			product("p1", 0, ProductStatus::Default),
			product("p2", 0, ProductStatus::Error),
		];
		assert_eq!(evaluate_click(&items, &items[1]), Ok(()));
		assert_eq!(evaluate_click(&items, &items[2]), Ok(()));
	}

	#[test]
	fn test_done_items_are_inert() {
		let items = vec![
			box_item(0, BoxStatus::Done),
			product("p1", 0, ProductStatus::Done),
		];
		assert_eq!(evaluate_click(&items, &items[0]), Err(ClickRejection::ItemDone));
		assert_eq!(evaluate_click(&items, &items[1]), Err(ClickRejection::ItemDone));
	}

	#[test]
	fn test_box_click_only_when_awaiting() {
		let awaiting = vec![box_item(0, BoxStatus::AwaitingConfirmation)];
		assert_eq!(evaluate_click(&awaiting, &awaiting[0]), Ok(()));

		let idle = vec![box_item(0, BoxStatus::Default)];
		assert_eq!(
			evaluate_click(&idle, &idle[0]),
			Err(ClickRejection::BoxNotAwaitingConfirmation)
		);

		let confirmed = vec![box_item(0, BoxStatus::Confirmed)];
		assert_eq!(
			evaluate_click(&confirmed, &confirmed[0]),
			Err(ClickRejection::BoxNotAwaitingConfirmation)
		);
	}
}
