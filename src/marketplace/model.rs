//! Strictly typed marketplace resource shapes.
//!
//! Unknown fields are ignored; required fields that are absent fail decoding with the JSON
//! path of the offending field.

// self
use crate::{
	_prelude::*,
	auth::{CategoryId, OfferId, OrderId},
};

/// Monetary amount with its ISO 4217 currency code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
	/// Decimal amount; the marketplace transmits it as a string.
	pub amount: Decimal,
	/// Currency code (e.g. `PLN`).
	pub currency: String,
}

/// Reference to an offer embedded in other resources.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRef {
	/// Offer identifier.
	pub id: OfferId,
	/// Offer title, when the marketplace includes it.
	#[serde(default)]
	pub name: Option<String>,
}

/// Reference to an order embedded in a billing entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRef {
	/// Order identifier.
	pub id: OrderId,
}

/// Billing type (e.g. `SUC` for a sale commission).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingType {
	/// Short type code.
	pub id: String,
	/// Human-readable type name.
	pub name: String,
}

/// Tax applied to a billing entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tax {
	/// Tax percentage as transmitted.
	#[serde(default)]
	pub percentage: Option<String>,
}

/// One ledger line charged against the seller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingEntry {
	/// Entry identifier.
	pub id: String,
	/// Instant the charge occurred.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub occurred_at: Option<OffsetDateTime>,
	/// Billing type.
	#[serde(rename = "type", default)]
	pub kind: Option<BillingType>,
	/// Offer the entry was charged for.
	#[serde(default)]
	pub offer: Option<OfferRef>,
	/// Charged value; fees are usually negative.
	pub value: Money,
	/// Tax details.
	#[serde(default)]
	pub tax: Option<Tax>,
	/// Account balance after the entry.
	#[serde(default)]
	pub balance: Option<Money>,
	/// Order the entry belongs to; absent for charges not tied to a sale.
	#[serde(default)]
	pub order: Option<OrderRef>,
}
impl BillingEntry {
	/// Order identifier, when the entry can be joined to an order.
	pub fn order_id(&self) -> Option<&OrderId> {
		self.order.as_ref().map(|order| &order.id)
	}
}

/// Envelope returned by the billing entries endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingEntries {
	/// Entries in upstream order.
	pub billing_entries: Vec<BillingEntry>,
}

/// One purchased offer inside an order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
	/// Line item identifier.
	pub id: String,
	/// Purchased offer.
	pub offer: OfferRef,
	/// Purchased quantity.
	pub quantity: u32,
	/// Unit price actually paid.
	pub price: Money,
}
impl LineItem {
	/// `quantity × price.amount`.
	pub fn total(&self) -> Decimal {
		Decimal::from(self.quantity) * self.price.amount
	}
}

/// Checkout form (order).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	/// Order identifier.
	pub id: OrderId,
	/// Purchased line items.
	pub line_items: Vec<LineItem>,
}
impl Order {
	/// Line items purchased under `offer`.
	pub fn line_items_for<'a>(
		&'a self,
		offer: &'a OfferId,
	) -> impl Iterator<Item = &'a LineItem> {
		self.line_items.iter().filter(move |item| &item.offer.id == offer)
	}
}

/// Marketplace category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
	/// Category identifier.
	pub id: CategoryId,
	/// Category name.
	pub name: String,
}
