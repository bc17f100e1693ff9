//! User token resolution: cache, then store, then refresh, then interactive bootstrap.

// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	flows::{TokenBroker, common},
	http::BrokerHttpClient,
	obs::{self, FlowKind},
};

impl<C> TokenBroker<C>
where
	C: ?Sized + BrokerHttpClient,
{
	/// Returns a valid user-scoped token.
	///
	/// Resolution order:
	/// 1. cache hit that is still valid,
	/// 2. unexpired store row (copied into the cache),
	/// 3. refresh-token exchange when the stored row has expired but carries a refresh token,
	/// 4. otherwise [`Error::AuthorizationRequired`] with the URL of a pending PKCE session.
	///
	/// Concurrent callers share one single-flight guard, so an expired token is refreshed
	/// once and the waiters pick up the cached result, or the same failure when the
	/// exchange fails.
	pub async fn get_user_token(&self) -> Result<AccessToken> {
		obs::observe(FlowKind::UserToken, "get_user_token", async move {
			if let Some(token) = self.cached_user_token() {
				return Ok(token);
			}

			let seen = self.settled_refreshes();
			let guard = common::flow_guard(self, &self.client);
			let _singleflight = guard.lock().await;

			if let Some(token) = self.cached_user_token() {
				return Ok(token);
			}

			let now = OffsetDateTime::now_utc();
			let horizon = self.usable_horizon(now);

			match self.store.fetch(&self.client).await? {
				Some(record) if !record.is_expired_at(horizon) => {
					obs::record_flow_event(FlowKind::UserToken, "store_hit");

					let access = record.access();

					self.cache.put(self.client.clone(), access.clone());

					Ok(access)
				},
				Some(record) if record.can_refresh() =>
					self.refresh_locked(seen, record).await.map(|refreshed| refreshed.access()),
				_ => Err(self.authorization_required(now)),
			}
		})
		.await
	}

	fn cached_user_token(&self) -> Option<AccessToken> {
		let token =
			self.cache.get(&self.client, self.usable_horizon(OffsetDateTime::now_utc()))?;

		obs::record_flow_event(FlowKind::UserToken, "cache_hit");

		Some(token)
	}
}
