//! Packable item types for the packing workflow.
//!
//! This module defines the single entity of the workflow, the order item,
//! together with the closed status machines for boxes and products. Illegal
//! status transitions are rejected by static transition tables rather than
//! checked ad hoc at call sites.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

/// Precedence assigned to items without an explicit manual order.
///
/// Items carrying no `manual_order` sort after every explicitly ordered item.
pub const DEFAULT_MANUAL_ORDER: i64 = 999;

/// The two kinds of packable entities in an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
	/// A container item; owns zero or more products via its box index.
	Box,
	/// A line item representing one or more portions inside a box.
	Product,
}

impl fmt::Display for ItemKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ItemKind::Box => write!(f, "box"),
			ItemKind::Product => write!(f, "product"),
		}
	}
}

/// Status of a box item.
///
/// Boxes move `Default -> AwaitingConfirmation -> Confirmed -> Done`.
/// A `Done` box is permanently inert for the rest of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxStatus {
	/// Not yet reachable by the operator.
	Default,
	/// The box is up next and waits for its confirmation weighing.
	AwaitingConfirmation,
	/// The box has been verified; its products may now be packed.
	Confirmed,
	/// Every product in the box is done.
	Done,
}

impl BoxStatus {
	/// Checks whether a transition to `to` is legal for a box item.
	pub fn can_transition_to(&self, to: BoxStatus) -> bool {
		// Static transition table - each state maps to allowed next states
		static TRANSITIONS: Lazy<HashMap<BoxStatus, HashSet<BoxStatus>>> = Lazy::new(|| {
			let mut m = HashMap::new();
			m.insert(
				BoxStatus::Default,
				HashSet::from([BoxStatus::AwaitingConfirmation]),
			);
			m.insert(
				BoxStatus::AwaitingConfirmation,
				HashSet::from([BoxStatus::Confirmed]),
			);
			m.insert(BoxStatus::Confirmed, HashSet::from([BoxStatus::Done]));
			m.insert(BoxStatus::Done, HashSet::new()); // terminal
			m
		});

		TRANSITIONS.get(self).is_some_and(|set| set.contains(&to))
	}

	/// True once the box has been verified and its products are packable.
	pub fn is_confirmed(&self) -> bool {
		matches!(self, BoxStatus::Confirmed | BoxStatus::Done)
	}
}

/// Status of a product item.
///
/// Products move `Default -> Pending -> Success | Error -> Done`. An errored
/// product may be retried (`Error -> Pending`) or reset (`Error -> Default`),
/// and a pending product is reset to `Default` when another product in the
/// same box becomes pending. `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
	/// Not yet addressed by the operator.
	Default,
	/// The operator is acting on this product right now.
	Pending,
	/// The weighing matched; awaiting the final done confirmation.
	Success,
	/// The weighing failed; the product may be retried.
	Error,
	/// The product is packed. Repeat weighing is disallowed.
	Done,
}

impl ProductStatus {
	/// Checks whether a transition to `to` is legal for a product item.
	pub fn can_transition_to(&self, to: ProductStatus) -> bool {
		static TRANSITIONS: Lazy<HashMap<ProductStatus, HashSet<ProductStatus>>> =
			Lazy::new(|| {
				let mut m = HashMap::new();
				m.insert(
					ProductStatus::Default,
					HashSet::from([ProductStatus::Pending]),
				);
				m.insert(
					ProductStatus::Pending,
					HashSet::from([
						ProductStatus::Success,
						ProductStatus::Error,
						ProductStatus::Default,
					]),
				);
				m.insert(ProductStatus::Success, HashSet::from([ProductStatus::Done]));
				m.insert(
					ProductStatus::Error,
					HashSet::from([ProductStatus::Default, ProductStatus::Pending]),
				);
				m.insert(ProductStatus::Done, HashSet::new()); // terminal
				m
			});

		TRANSITIONS.get(self).is_some_and(|set| set.contains(&to))
	}
}

/// Status of an order item, split per item kind.
///
/// Keeping the two status sets in separate variants makes cross-kind
/// transitions (a box becoming `pending`, a product becoming `confirmed`)
/// unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
	/// Status of a box item.
	Box(BoxStatus),
	/// Status of a product item.
	Product(ProductStatus),
}

impl ItemStatus {
	/// Checks whether a transition to `to` is legal.
	///
	/// Transitions that would change the item kind are always illegal.
	pub fn can_transition_to(&self, to: ItemStatus) -> bool {
		match (self, to) {
			(ItemStatus::Box(from), ItemStatus::Box(to)) => from.can_transition_to(to),
			(ItemStatus::Product(from), ItemStatus::Product(to)) => from.can_transition_to(to),
			_ => false,
		}
	}

	/// True when the item can never change status again this session.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			ItemStatus::Box(BoxStatus::Done) | ItemStatus::Product(ProductStatus::Done)
		)
	}

	/// Returns the wire representation used by the upstream dashboard.
	pub fn as_str(&self) -> &'static str {
		match self {
			ItemStatus::Box(BoxStatus::Default) | ItemStatus::Product(ProductStatus::Default) => {
				"default"
			}
			ItemStatus::Box(BoxStatus::AwaitingConfirmation) => "awaiting_confirmation",
			ItemStatus::Box(BoxStatus::Confirmed) => "confirmed",
			ItemStatus::Box(BoxStatus::Done) | ItemStatus::Product(ProductStatus::Done) => "done",
			ItemStatus::Product(ProductStatus::Pending) => "pending",
			ItemStatus::Product(ProductStatus::Success) => "success",
			ItemStatus::Product(ProductStatus::Error) => "error",
		}
	}
}

impl fmt::Display for ItemStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// Portion count range metadata for a product.
///
/// Descriptive only; never consulted by transition logic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortionsRange {
	pub min: u32,
	pub max: u32,
}

/// A packable entity belonging to one order: a box or a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
	/// Unique identifier, stable for the lifetime of the order view.
	pub id: String,
	/// Display label.
	pub name: String,
	/// Integer portions represented by a product item (ignored for boxes).
	pub quantity: u32,
	/// Non-negative kilograms attributable to this single item: its own tare
	/// for boxes, its contents' share for products.
	pub expected_weight: f64,
	/// Whether this item is a box or a product.
	pub kind: ItemKind,
	/// Index of the box this item belongs to; boxes declare their own index.
	pub box_index: u32,
	/// Optional display/selection precedence; absent sorts as 999.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub manual_order: Option<i64>,
	/// Current status, mutated exclusively through workflow commands.
	pub status: ItemStatus,
	/// Box presentation metadata, not used in state-transition logic.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub box_settings: Option<serde_json::Value>,
	/// Portion range metadata, not used in state-transition logic.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub portions_range: Option<PortionsRange>,
	/// Portions-per-box metadata, not used in state-transition logic.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub portions_per_box: Option<u32>,
}

impl OrderItem {
	/// True for box items.
	pub fn is_box(&self) -> bool {
		self.kind == ItemKind::Box
	}

	/// True for product items.
	pub fn is_product(&self) -> bool {
		self.kind == ItemKind::Product
	}

	/// Returns the product status, or `None` for box items.
	pub fn product_status(&self) -> Option<ProductStatus> {
		match self.status {
			ItemStatus::Product(status) => Some(status),
			ItemStatus::Box(_) => None,
		}
	}

	/// Returns the box status, or `None` for product items.
	pub fn box_status(&self) -> Option<BoxStatus> {
		match self.status {
			ItemStatus::Box(status) => Some(status),
			ItemStatus::Product(_) => None,
		}
	}

	/// True once the item has reached its terminal `done` status.
	pub fn is_done(&self) -> bool {
		self.status.is_terminal()
	}

	/// Effective manual-order precedence, with absent treated as lowest.
	pub fn manual_order_key(&self) -> i64 {
		self.manual_order.unwrap_or(DEFAULT_MANUAL_ORDER)
	}
}

/// Errors raised while validating upstream item data.
///
/// Items failing validation are excluded from the store and from every
/// aggregate computation rather than crashing the workflow.
#[derive(Debug, Error)]
pub enum ItemDataError {
	#[error("Item '{id}' is missing required field '{field}'")]
	MissingField { id: String, field: &'static str },
	#[error("Item '{id}' has invalid value for '{field}': {message}")]
	InvalidValue {
		id: String,
		field: &'static str,
		message: String,
	},
	#[error("Item '{id}' has unknown status '{status}' for kind {kind}")]
	UnknownStatus {
		id: String,
		status: String,
		kind: ItemKind,
	},
}

/// An order item as received from the upstream order source.
///
/// Every field the dashboard may omit is optional here; conversion into
/// [`OrderItem`] performs the validation described in the error taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrderItem {
	pub id: Option<String>,
	pub name: Option<String>,
	#[serde(default)]
	pub quantity: Option<u32>,
	pub expected_weight: Option<f64>,
	#[serde(rename = "type")]
	pub kind: Option<ItemKind>,
	pub box_index: Option<u32>,
	#[serde(default)]
	pub manual_order: Option<i64>,
	pub status: Option<String>,
	#[serde(default)]
	pub box_settings: Option<serde_json::Value>,
	#[serde(default)]
	pub portions_range: Option<PortionsRange>,
	#[serde(default)]
	pub portions_per_box: Option<u32>,
}

/// Parses an upstream status string for the given item kind.
fn parse_status(id: &str, kind: ItemKind, status: &str) -> Result<ItemStatus, ItemDataError> {
	let parsed = match (kind, status) {
		(ItemKind::Box, "default") => ItemStatus::Box(BoxStatus::Default),
		(ItemKind::Box, "awaiting_confirmation") => {
			ItemStatus::Box(BoxStatus::AwaitingConfirmation)
		}
		(ItemKind::Box, "confirmed") => ItemStatus::Box(BoxStatus::Confirmed),
		(ItemKind::Box, "done") => ItemStatus::Box(BoxStatus::Done),
		(ItemKind::Product, "default") => ItemStatus::Product(ProductStatus::Default),
		(ItemKind::Product, "pending") => ItemStatus::Product(ProductStatus::Pending),
		(ItemKind::Product, "success") => ItemStatus::Product(ProductStatus::Success),
		(ItemKind::Product, "error") => ItemStatus::Product(ProductStatus::Error),
		(ItemKind::Product, "done") => ItemStatus::Product(ProductStatus::Done),
		_ => {
			return Err(ItemDataError::UnknownStatus {
				id: id.to_string(),
				status: status.to_string(),
				kind,
			})
		}
	};
	Ok(parsed)
}

impl TryFrom<RawOrderItem> for OrderItem {
	type Error = ItemDataError;

	fn try_from(raw: RawOrderItem) -> Result<Self, Self::Error> {
		let id = raw
			.id
			.filter(|id| !id.is_empty())
			.ok_or(ItemDataError::MissingField {
				id: "<unknown>".to_string(),
				field: "id",
			})?;

		let name = raw
			.name
			.filter(|name| !name.is_empty())
			.ok_or_else(|| ItemDataError::MissingField {
				id: id.clone(),
				field: "name",
			})?;

		let kind = raw.kind.ok_or_else(|| ItemDataError::MissingField {
			id: id.clone(),
			field: "type",
		})?;

		let expected_weight = raw
			.expected_weight
			.ok_or_else(|| ItemDataError::MissingField {
				id: id.clone(),
				field: "expectedWeight",
			})?;
		if !expected_weight.is_finite() || expected_weight < 0.0 {
			return Err(ItemDataError::InvalidValue {
				id,
				field: "expectedWeight",
				message: format!("must be a non-negative number, got {}", expected_weight),
			});
		}

		let box_index = raw.box_index.ok_or_else(|| ItemDataError::MissingField {
			id: id.clone(),
			field: "boxIndex",
		})?;

		let status_str = raw.status.ok_or_else(|| ItemDataError::MissingField {
			id: id.clone(),
			field: "status",
		})?;
		let status = parse_status(&id, kind, &status_str)?;

		Ok(OrderItem {
			id,
			name,
			quantity: raw.quantity.unwrap_or(1),
			expected_weight,
			kind,
			box_index,
			manual_order: raw.manual_order,
			status,
			box_settings: raw.box_settings,
			portions_range: raw.portions_range,
			portions_per_box: raw.portions_per_box,
		})
	}
}

/// One order as delivered by the upstream order source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderData {
	/// Unique identifier of the order.
	pub id: String,
	/// Flat list of boxes and products belonging to the order.
	pub items: Vec<RawOrderItem>,
}
