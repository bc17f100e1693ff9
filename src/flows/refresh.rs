//! Refresh token exchange with single-flight guards and metrics.
//!
//! [`TokenBroker::refresh_user_token`] forces a `grant_type=refresh_token` call for the
//! stored row. [`TokenBroker::get_user_token`] reaches the same exchange automatically
//! once the stored access token has expired. Rotated refresh tokens replace the stored
//! one; when the marketplace omits `refresh_token` the previous value is kept. Failures
//! surface as-is and never fall back to the interactive bootstrap.
//!
//! Callers queued on the single-flight guard while an exchange fails receive that failure
//! (as [`Error::UpstreamAuth`]) instead of repeating the exchange with the same refresh
//! token. Callers arriving after the failure settled try again.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, StoredToken, TokenSecret},
	flows::{TokenBroker, common},
	http::BrokerHttpClient,
	oauth::OAuth2Facade,
	obs::{self, FlowKind},
	provider::GrantType,
};

/// Settled refresh exchanges and the most recent failure.
#[derive(Debug, Default)]
pub(crate) struct RefreshLedger {
	settled: u64,
	failure: Option<RefreshFailure>,
}

#[derive(Debug)]
struct RefreshFailure {
	exchange: u64,
	refresh_token: TokenSecret,
	status: Option<u16>,
	reason: String,
}

impl<C> TokenBroker<C>
where
	C: ?Sized + BrokerHttpClient,
{
	/// Refreshes the stored user token regardless of its remaining lifetime.
	///
	/// Fails with [`Error::AuthorizationRequired`] when there is no stored row or the row
	/// carries no refresh token.
	pub async fn refresh_user_token(&self) -> Result<AccessToken> {
		let seen = self.settled_refreshes();
		let guard = common::flow_guard(self, &self.client);
		let _singleflight = guard.lock().await;
		let current = self.store.fetch(&self.client).await?;

		match current {
			Some(record) if record.can_refresh() =>
				self.refresh_locked(seen, record).await.map(|refreshed| refreshed.access()),
			_ => Err(self.authorization_required(OffsetDateTime::now_utc())),
		}
	}

	/// Number of refresh exchanges that have settled so far.
	///
	/// Read it before queueing on the single-flight guard and pass it to `refresh_locked`.
	pub(crate) fn settled_refreshes(&self) -> u64 {
		self.refresh_ledger.lock().settled
	}

	/// Performs the refresh exchange. Callers must hold the client's single-flight guard.
	///
	/// Returns the failure of an exchange that settled after `seen` for the same refresh token
	/// without calling the token endpoint again.
	pub(crate) async fn refresh_locked(
		&self,
		seen: u64,
		current: StoredToken,
	) -> Result<StoredToken> {
		if let Some(err) = self.shared_refresh_failure(seen, &current) {
			return Err(err);
		}

		obs::observe(FlowKind::Refresh, "refresh_token", async move {
			self.refresh_metrics.record_attempt();

			let refresh_token = current.refresh_token.clone();
			let result = self.exchange_refresh(current).await;

			self.settle_refresh(refresh_token, &result);

			match &result {
				Ok(_) => self.refresh_metrics.record_success(),
				Err(_) => self.refresh_metrics.record_failure(),
			}

			result
		})
		.await
	}

	fn shared_refresh_failure(&self, seen: u64, current: &StoredToken) -> Option<Error> {
		let ledger = self.refresh_ledger.lock();
		let failure = ledger.failure.as_ref().filter(|failure| {
			failure.exchange > seen && current.refresh_token.as_ref() == Some(&failure.refresh_token)
		})?;

		obs::record_flow_event(FlowKind::Refresh, "failure_shared");

		Some(Error::UpstreamAuth {
			grant: GrantType::RefreshToken.as_str(),
			status: failure.status,
			reason: failure.reason.clone(),
		})
	}

	fn settle_refresh(&self, refresh_token: Option<TokenSecret>, result: &Result<StoredToken>) {
		let mut ledger = self.refresh_ledger.lock();

		ledger.settled += 1;

		let exchange = ledger.settled;

		ledger.failure = match (result, refresh_token) {
			(Err(err), Some(refresh_token)) => {
				let (status, reason) = match err {
					Error::UpstreamAuth { status, reason, .. } => (*status, reason.clone()),
					other => (None, other.to_string()),
				};

				Some(RefreshFailure { exchange, refresh_token, status, reason })
			},
			_ => None,
		};
	}

	async fn exchange_refresh(&self, current: StoredToken) -> Result<StoredToken> {
		let Some(previous_refresh) = current.refresh_token else {
			return Err(self.authorization_required(OffsetDateTime::now_utc()));
		};
		let facade = common::facade(self)?;
		let mut refreshed = facade.refresh_token(&self.client, &previous_refresh).await?;

		if refreshed.refresh_token.is_none() {
			refreshed.refresh_token = Some(previous_refresh);
		}

		common::write_through(self, refreshed.clone()).await?;
		obs::record_flow_event(FlowKind::Refresh, "token_rotated");

		Ok(refreshed)
	}
}
