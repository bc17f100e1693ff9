//! Offer fee aggregation over billing entries and orders.
//!
//! Billing entries for an offer are grouped by the order they reference (entries without an
//! order are dropped), every referenced order is fetched, and each group's summed fee is set
//! against the sale value of the offer's line items in that order. Two reductions answer two
//! different questions:
//!
//! - [`FeeCalculator::offer_fee`]: arithmetic mean of the per-order fee ratios, so every order
//!   weighs the same regardless of its size.
//! - [`FeeCalculator::total_offer_fee`]: one pooled ratio, total fees over total sale value.
//!
//! Several line items for the offer inside one order are summed. An order with no sale value for
//! the offer fails either reduction before any ratio is taken. Both reductions report the
//! absolute value of the final ratio because the marketplace books fees as negative amounts.

// crates.io
use futures::{StreamExt, TryStreamExt, stream};
// self
use crate::{
	_prelude::*,
	auth::{OfferId, OrderId},
	marketplace::{BillingEntry, MarketplaceApi, Order},
	obs::{self, FlowKind, FlowSpan},
};

/// Number of orders fetched in parallel when none is configured.
pub const DEFAULT_ORDER_FETCH_CONCURRENCY: usize = 4;

/// Computed fee for one offer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferFee {
	/// Offer the fee was computed for.
	pub offer_id: OfferId,
	/// Fee as a decimal fraction of the sale value (`0.1` is 10%).
	pub fee_percent: Decimal,
}

/// Fee charged and sale value recorded for one order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderShare {
	/// Order identifier.
	pub order_id: OrderId,
	/// Sum of the billing amounts booked against the order for the offer.
	pub fee_total: Decimal,
	/// Sum of `quantity × price` over the offer's line items in the order.
	pub sale_total: Decimal,
}

/// Correlates billing entries with orders through a [`MarketplaceApi`].
#[derive(Debug)]
pub struct FeeCalculator<A>
where
	A: ?Sized + MarketplaceApi,
{
	api: Arc<A>,
	concurrency: usize,
}
impl<A> FeeCalculator<A>
where
	A: ?Sized + MarketplaceApi,
{
	/// Creates a calculator fetching up to [`DEFAULT_ORDER_FETCH_CONCURRENCY`] orders at once.
	pub fn new(api: Arc<A>) -> Self {
		Self { api, concurrency: DEFAULT_ORDER_FETCH_CONCURRENCY }
	}

	/// Overrides the order fetch concurrency (values below 1 are treated as 1).
	pub fn with_concurrency(mut self, concurrency: usize) -> Self {
		self.concurrency = concurrency.max(1);

		self
	}

	/// Maximum number of orders fetched in parallel.
	pub fn concurrency(&self) -> usize {
		self.concurrency
	}

	/// Mean of the per-order fee ratios.
	pub async fn offer_fee(&self, offer: &OfferId) -> Result<OfferFee> {
		obs::observe(FlowKind::FeeCalculation, "offer_fee", async move {
			let shares = self.order_shares(offer).await?;
			let fee_percent = mean_of_ratios(offer, &shares)?;

			Ok(OfferFee { offer_id: offer.clone(), fee_percent })
		})
		.await
	}

	/// Total fees over total sale value.
	pub async fn total_offer_fee(&self, offer: &OfferId) -> Result<OfferFee> {
		obs::observe(FlowKind::FeeCalculation, "total_offer_fee", async move {
			let shares = self.order_shares(offer).await?;
			let fee_percent = pooled_ratio(offer, &shares)?;

			Ok(OfferFee { offer_id: offer.clone(), fee_percent })
		})
		.await
	}

	/// Fetches billing entries and the orders they reference, then joins them per order.
	pub async fn order_shares(&self, offer: &OfferId) -> Result<Vec<OrderShare>> {
		let entries = match self.api.billing_entries(offer).await {
			Ok(entries) if !entries.is_empty() => entries,
			Ok(_) | Err(Error::NotFound { .. }) =>
				return Err(Error::not_found(format!("No billing entries for offer {offer}."))),
			Err(e) => return Err(e),
		};
		let fee_totals = group_fees_by_order(&entries);

		if fee_totals.is_empty() {
			return Err(Error::calculation(format!(
				"No billing entry for offer {offer} references an order."
			)));
		}

		let orders = self.fetch_orders(fee_totals.keys()).await?;

		join_orders(offer, fee_totals, &orders)
	}

	async fn fetch_orders<'a, I>(&'a self, ids: I) -> Result<HashMap<OrderId, Order>>
	where
		I: IntoIterator<Item = &'a OrderId>,
	{
		obs::record_flow_event(FlowKind::FeeCalculation, "fetching_orders");

		stream::iter(ids)
			.map(|id| async move { self.api.order(id).await.map(|order| (id.clone(), order)) })
			.buffer_unordered(self.concurrency)
			.try_collect()
			.await
	}
}

/// Sums billing amounts per referenced order, skipping entries without an order.
pub fn group_fees_by_order(entries: &[BillingEntry]) -> BTreeMap<OrderId, Decimal> {
	let mut totals = BTreeMap::new();

	for entry in entries {
		if let Some(order_id) = entry.order_id() {
			*totals.entry(order_id.clone()).or_insert(Decimal::ZERO) += entry.value.amount;
		}
	}

	totals
}

/// Pairs each order's fee total with the offer's sale value in that order.
///
/// Fails with [`Error::Calculation`] when an order is absent from `orders`, carries no line item
/// for the offer, or sells it for a zero total.
pub fn join_orders(
	offer: &OfferId,
	fee_totals: BTreeMap<OrderId, Decimal>,
	orders: &HashMap<OrderId, Order>,
) -> Result<Vec<OrderShare>> {
	fee_totals
		.into_iter()
		.map(|(order_id, fee_total)| {
			let mut items = orders
				.get(&order_id)
				.into_iter()
				.flat_map(|order| order.line_items_for(offer))
				.peekable();

			if items.peek().is_none() {
				return Err(Error::calculation(format!(
					"Order {order_id} has no line item for offer {offer}."
				)));
			}

			let sale_total = items
				.try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.total()))
				.ok_or_else(|| overflow(offer))?;

			if sale_total.is_zero() {
				return Err(Error::calculation(format!(
					"Sale value of offer {offer} in order {order_id} is 0."
				)));
			}

			Ok(OrderShare { order_id, fee_total, sale_total })
		})
		.collect()
}

/// Arithmetic mean of `fee_total / sale_total` over all orders, as an absolute value.
pub fn mean_of_ratios(offer: &OfferId, shares: &[OrderShare]) -> Result<Decimal> {
	let _span = FlowSpan::new(FlowKind::FeeCalculation, "mean_of_ratios").entered();

	if shares.is_empty() {
		return Err(Error::calculation(format!("No order data to average for offer {offer}.")));
	}

	let mut sum = Decimal::ZERO;

	for share in shares {
		if share.sale_total.is_zero() {
			return Err(Error::calculation(format!(
				"Sale value of offer {offer} in order {} is 0.",
				share.order_id
			)));
		}

		sum = share
			.fee_total
			.checked_div(share.sale_total)
			.and_then(|ratio| sum.checked_add(ratio))
			.ok_or_else(|| overflow(offer))?;
	}

	let count = Decimal::from(shares.len());

	sum.checked_div(count).map(|mean| mean.abs()).ok_or_else(|| overflow(offer))
}

/// `Σ fee_total / Σ sale_total`, as an absolute value.
pub fn pooled_ratio(offer: &OfferId, shares: &[OrderShare]) -> Result<Decimal> {
	let _span = FlowSpan::new(FlowKind::FeeCalculation, "pooled_ratio").entered();
	let mut fees = Decimal::ZERO;
	let mut sales = Decimal::ZERO;

	for share in shares {
		fees = fees.checked_add(share.fee_total).ok_or_else(|| overflow(offer))?;
		sales = sales.checked_add(share.sale_total).ok_or_else(|| overflow(offer))?;
	}

	if sales.is_zero() {
		return Err(Error::calculation(format!("Total sale amount for the offer id {offer} is 0.")));
	}

	fees.checked_div(sales).map(|ratio| ratio.abs()).ok_or_else(|| overflow(offer))
}

fn overflow(offer: &OfferId) -> Error {
	Error::calculation(format!("Fee computation for offer {offer} overflowed."))
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::{
		auth::CategoryId,
		marketplace::{ApiFuture, Category},
	};

	#[derive(Default)]
	struct FakeMarketplace {
		entries: Vec<BillingEntry>,
		orders: HashMap<OrderId, Order>,
		order_calls: AtomicUsize,
	}
	impl FakeMarketplace {
		fn entry(mut self, order: Option<&str>, amount: &str) -> Self {
			let id = format!("entry-{}", self.entries.len());

			self.entries.push(
				serde_json::from_value(json!({
					"id": id,
					"value": { "amount": amount, "currency": "PLN" },
					"order": order.map(|order| json!({ "id": order })),
				}))
				.expect("Billing entry fixture should decode."),
			);

			self
		}

		fn order(mut self, id: &str, items: &[(&str, u32, &str)]) -> Self {
			let line_items: Vec<_> = items
				.iter()
				.enumerate()
				.map(|(idx, (offer, quantity, price))| {
					json!({
						"id": format!("{id}-{idx}"),
						"offer": { "id": offer },
						"quantity": quantity,
						"price": { "amount": price, "currency": "PLN" },
					})
				})
				.collect();
			let order: Order = serde_json::from_value(json!({ "id": id, "lineItems": line_items }))
				.expect("Order fixture should decode.");

			self.orders.insert(order.id.clone(), order);

			self
		}
	}
	impl MarketplaceApi for FakeMarketplace {
		fn order<'a>(&'a self, id: &'a OrderId) -> ApiFuture<'a, Order> {
			Box::pin(async move {
				self.order_calls.fetch_add(1, Ordering::SeqCst);
				self.orders
					.get(id)
					.cloned()
					.ok_or_else(|| Error::not_found(format!("Order with ID {id} not found.")))
			})
		}

		fn billing_entries<'a>(&'a self, _offer: &'a OfferId) -> ApiFuture<'a, Vec<BillingEntry>> {
			Box::pin(async move { Ok(self.entries.clone()) })
		}

		fn category<'a>(&'a self, id: &'a CategoryId) -> ApiFuture<'a, Category> {
			Box::pin(async move { Err(Error::not_found(format!("Category {id} not found."))) })
		}
	}

	fn offer() -> OfferId {
		OfferId::new("X").expect("Offer fixture should be valid.")
	}

	fn dec(value: &str) -> Decimal {
		value.parse().expect("Decimal fixture should parse.")
	}

	fn calculator(api: FakeMarketplace) -> FeeCalculator<FakeMarketplace> {
		FeeCalculator::new(Arc::new(api)).with_concurrency(2)
	}

	#[tokio::test]
	async fn grouped_entries_against_one_order_yield_full_ratio() {
		let calculator = calculator(
			FakeMarketplace::default()
				.entry(Some("O1"), "10")
				.entry(Some("O1"), "5")
				.order("O1", &[("X", 3, "5")]),
		);
		let fee = calculator.offer_fee(&offer()).await.expect("Fee should compute.");

		assert_eq!(fee.offer_id, offer());
		assert_eq!(fee.fee_percent, Decimal::ONE);
		assert_eq!(calculator.api.order_calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn no_billing_entries_is_not_found() {
		let calculator = calculator(FakeMarketplace::default());

		assert!(matches!(calculator.offer_fee(&offer()).await, Err(Error::NotFound { .. })));
		assert!(matches!(calculator.total_offer_fee(&offer()).await, Err(Error::NotFound { .. })));
	}

	#[tokio::test]
	async fn zero_quantity_is_a_calculation_error() {
		let calculator = calculator(
			FakeMarketplace::default().entry(Some("O1"), "-2.50").order("O1", &[("X", 0, "5")]),
		);

		assert!(matches!(calculator.offer_fee(&offer()).await, Err(Error::Calculation { .. })));
		assert!(matches!(
			calculator.total_offer_fee(&offer()).await,
			Err(Error::Calculation { .. })
		));
	}

	#[tokio::test]
	async fn entries_without_order_are_excluded() {
		let calculator = calculator(
			FakeMarketplace::default()
				.entry(Some("O1"), "-1")
				.entry(None, "-1000")
				.order("O1", &[("X", 1, "10")]),
		);

		assert_eq!(calculator.offer_fee(&offer()).await.expect("Mean fee.").fee_percent, dec("0.1"));
		assert_eq!(
			calculator.total_offer_fee(&offer()).await.expect("Pooled fee.").fee_percent,
			dec("0.1")
		);
	}

	#[tokio::test]
	async fn only_unlinked_entries_is_a_calculation_error() {
		let calculator = calculator(FakeMarketplace::default().entry(None, "-3"));

		assert!(matches!(calculator.offer_fee(&offer()).await, Err(Error::Calculation { .. })));
		assert_eq!(calculator.api.order_calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn missing_order_fails_the_whole_computation() {
		let calculator = calculator(
			FakeMarketplace::default()
				.entry(Some("O1"), "-1")
				.entry(Some("O2"), "-1")
				.order("O1", &[("X", 1, "10")]),
		);
		let err = calculator.offer_fee(&offer()).await.expect_err("Missing order must fail.");

		assert!(matches!(err, Error::NotFound { ref message } if message.contains("O2")));
	}

	#[tokio::test]
	async fn mean_and_pooled_diverge_for_unequal_orders() {
		let calculator = calculator(
			FakeMarketplace::default()
				.entry(Some("O1"), "-10")
				.entry(Some("O2"), "-50")
				.order("O1", &[("X", 1, "100")])
				.order("O2", &[("X", 5, "50")]),
		);
		let mean = calculator.offer_fee(&offer()).await.expect("Mean fee.").fee_percent;
		let pooled = calculator.total_offer_fee(&offer()).await.expect("Pooled fee.").fee_percent;

		assert_eq!(mean, dec("0.15"));
		assert_eq!(pooled, dec("60") / dec("350"));
		assert_ne!(mean, pooled);
	}

	#[tokio::test]
	async fn mean_and_pooled_agree_for_equal_orders() {
		let tolerance = Decimal::new(1, 20);

		for (first, second, size) in [("-3", "-7", "40"), ("-1.11", "-2.22", "9.99"), ("-5", "-5", "5")]
		{
			let calculator = calculator(
				FakeMarketplace::default()
					.entry(Some("O1"), first)
					.entry(Some("O2"), second)
					.order("O1", &[("X", 1, size)])
					.order("O2", &[("X", 1, size)]),
			);
			let mean = calculator.offer_fee(&offer()).await.expect("Mean fee.").fee_percent;
			let pooled =
				calculator.total_offer_fee(&offer()).await.expect("Pooled fee.").fee_percent;

			assert!((mean - pooled).abs() < tolerance, "{mean} vs {pooled} for size {size}");
		}
	}

	#[tokio::test]
	async fn matching_line_items_in_one_order_are_summed() {
		let calculator = calculator(
			FakeMarketplace::default()
				.entry(Some("O1"), "-4")
				.order("O1", &[("X", 1, "10"), ("Y", 3, "100"), ("X", 3, "10")]),
		);

		assert_eq!(calculator.offer_fee(&offer()).await.expect("Mean fee.").fee_percent, dec("0.1"));
	}

	#[tokio::test]
	async fn repeated_computation_is_idempotent() {
		let calculator = calculator(
			FakeMarketplace::default()
				.entry(Some("O1"), "-1.5")
				.entry(Some("O2"), "-2")
				.order("O1", &[("X", 2, "7.5")])
				.order("O2", &[("X", 1, "40")]),
		);
		let first = calculator.offer_fee(&offer()).await.expect("First computation.");
		let second = calculator.offer_fee(&offer()).await.expect("Second computation.");
		let total_first = calculator.total_offer_fee(&offer()).await.expect("First total.");
		let total_second = calculator.total_offer_fee(&offer()).await.expect("Second total.");

		assert_eq!(first, second);
		assert_eq!(total_first, total_second);
		assert_eq!(calculator.api.order_calls.load(Ordering::SeqCst), 8);
	}

	#[tokio::test]
	async fn unsold_order_fails_both_reductions() {
		let zero_quantity = calculator(
			FakeMarketplace::default()
				.entry(Some("O1"), "-1")
				.entry(Some("O2"), "-1")
				.order("O1", &[("X", 1, "10")])
				.order("O2", &[("X", 0, "10")]),
		);
		let other_offer_only = calculator(
			FakeMarketplace::default()
				.entry(Some("O1"), "-1")
				.entry(Some("O2"), "-1")
				.order("O1", &[("X", 1, "10")])
				.order("O2", &[("Z", 2, "10")]),
		);

		for (calculator, message) in [
			(zero_quantity, "Sale value of offer X in order O2 is 0."),
			(other_offer_only, "Order O2 has no line item for offer X."),
		] {
			for result in
				[calculator.offer_fee(&offer()).await, calculator.total_offer_fee(&offer()).await]
			{
				let err = result.expect_err("An unsold order must fail the computation.");

				assert!(matches!(err, Error::Calculation { .. }));
				assert_eq!(err.to_string(), message);
			}
		}
	}

	#[test]
	fn pooled_ratio_rejects_zero_total() {
		let shares = vec![OrderShare {
			order_id: OrderId::new("O1").expect("Order fixture should be valid."),
			fee_total: dec("-1"),
			sale_total: Decimal::ZERO,
		}];
		let err = pooled_ratio(&offer(), &shares).expect_err("Zero total must fail.");

		assert_eq!(err.to_string(), "Total sale amount for the offer id X is 0.");
		assert!(matches!(mean_of_ratios(&offer(), &[]), Err(Error::Calculation { .. })));
	}
}
