//! Optional observability helpers for token flows, resource calls, and fee computations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `marketplace_fee.flow` with the `flow`
//!   and `stage` (call site) fields.
//! - Enable `metrics` to increment the `marketplace_fee_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Flow kinds observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Application token via the client-credentials grant.
	ApplicationToken,
	/// User token resolution (cache, store, refresh, bootstrap).
	UserToken,
	/// Refresh token exchange.
	Refresh,
	/// Authorization Code + PKCE bootstrap.
	AuthorizationCode,
	/// Authenticated GET against the marketplace REST API.
	MarketplaceRequest,
	/// Fee aggregation over billing entries and orders.
	FeeCalculation,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::ApplicationToken => "application_token",
			FlowKind::UserToken => "user_token",
			FlowKind::Refresh => "refresh",
			FlowKind::AuthorizationCode => "authorization_code",
			FlowKind::MarketplaceRequest => "marketplace_request",
			FlowKind::FeeCalculation => "fee_calculation",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to an instrumented operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside a [`FlowSpan`] and records attempt plus success/failure outcomes.
pub async fn observe<T, Fut>(kind: FlowKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = FlowSpan::new(kind, stage);

	record_flow_outcome(kind, FlowOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => record_flow_outcome(kind, FlowOutcome::Success),
		Err(_) => record_flow_outcome(kind, FlowOutcome::Failure),
	}

	result
}
