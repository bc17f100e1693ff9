//! Marketplace REST resources consumed by the fee aggregator.
//!
//! [`MarketplaceApi`] is the seam the aggregator depends on; [`MarketplaceClient`] is the
//! HTTP implementation that authenticates through a [`TokenBroker`](crate::flows::TokenBroker).

pub mod client;
pub mod model;

pub use client::*;
pub use model::*;

// self
use crate::{
	_prelude::*,
	auth::{CategoryId, OfferId, OrderId},
};

/// Boxed future returned by [`MarketplaceApi`] operations.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Read operations against the marketplace.
///
/// Implementations map HTTP 404 to [`Error::NotFound`], any other non-success status to
/// [`Error::UpstreamApi`], and undecodable bodies to [`Error::MalformedResponse`].
pub trait MarketplaceApi
where
	Self: Send + Sync,
{
	/// Fetches one order (checkout form) with the user token.
	fn order<'a>(&'a self, id: &'a OrderId) -> ApiFuture<'a, Order>;

	/// Fetches the billing entries recorded for an offer with the user token.
	fn billing_entries<'a>(&'a self, offer: &'a OfferId) -> ApiFuture<'a, Vec<BillingEntry>>;

	/// Fetches a category with the application token.
	fn category<'a>(&'a self, id: &'a CategoryId) -> ApiFuture<'a, Category>;
}
