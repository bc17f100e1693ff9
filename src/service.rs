//! Caller-facing facade over the fee aggregator and the category lookup.
//!
//! Identifiers arrive as raw strings (path parameters, CLI arguments) and every failure is
//! flattened into an [`ErrorResponse`] carrying the HTTP status a controller should return.

// self
use crate::{
	_prelude::*,
	auth::{CategoryId, OfferId},
	fee::{FeeCalculator, OfferFee},
	marketplace::{Category, MarketplaceApi},
	obs::{self, FlowKind},
};

/// Structured failure returned to callers of [`FeeService`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
#[error("{status} {message}")]
pub struct ErrorResponse {
	/// HTTP status code.
	pub status: u16,
	/// Human-readable message; never includes source chains.
	pub message: String,
}
impl From<&Error> for ErrorResponse {
	fn from(err: &Error) -> Self {
		Self { status: err.status_code(), message: err.to_string() }
	}
}
impl From<Error> for ErrorResponse {
	fn from(err: Error) -> Self {
		Self::from(&err)
	}
}

/// Fee and category operations keyed by raw identifiers.
pub struct FeeService<A>
where
	A: ?Sized + MarketplaceApi,
{
	api: Arc<A>,
	calculator: FeeCalculator<A>,
}
impl<A> FeeService<A>
where
	A: ?Sized + MarketplaceApi,
{
	/// Creates a service with the default order fetch concurrency.
	pub fn new(api: Arc<A>) -> Self {
		let calculator = FeeCalculator::new(api.clone());

		Self { api, calculator }
	}

	/// Overrides the order fetch concurrency of the underlying calculator.
	pub fn with_concurrency(mut self, concurrency: usize) -> Self {
		self.calculator = self.calculator.with_concurrency(concurrency);

		self
	}

	/// Mean fee ratio for `offer_id`.
	pub async fn calculated_offer_fee(&self, offer_id: &str) -> Result<OfferFee, ErrorResponse> {
		let offer = OfferId::new(offer_id).map_err(Error::from).map_err(reject)?;

		self.calculator.offer_fee(&offer).await.map_err(reject)
	}

	/// Pooled fee ratio for `offer_id`.
	pub async fn calculated_total_offer_fee(
		&self,
		offer_id: &str,
	) -> Result<OfferFee, ErrorResponse> {
		let offer = OfferId::new(offer_id).map_err(Error::from).map_err(reject)?;

		self.calculator.total_offer_fee(&offer).await.map_err(reject)
	}

	/// Category lookup authenticated with the application token.
	pub async fn category(&self, category_id: &str) -> Result<Category, ErrorResponse> {
		let category = CategoryId::new(category_id).map_err(Error::from).map_err(reject)?;

		self.api.category(&category).await.map_err(reject)
	}
}
impl<A> Debug for FeeService<A>
where
	A: ?Sized + MarketplaceApi,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FeeService")
			.field("concurrency", &self.calculator.concurrency())
			.finish_non_exhaustive()
	}
}

fn reject(err: Error) -> ErrorResponse {
	obs::record_flow_event(FlowKind::FeeCalculation, "request_rejected");

	ErrorResponse::from(err)
}
