//! Two-phase Authorization Code + PKCE bootstrap.
//!
//! [`TokenBroker::begin_authorization`] opens a pending session and returns the URL the
//! seller must visit; the host application collects the redirect parameters however it
//! likes and calls [`TokenBroker::complete_authorization`]. Sessions expire after
//! [`BrokerOptions::authorization_ttl`](crate::flows::BrokerOptions::authorization_ttl)
//! and can be abandoned with [`TokenBroker::cancel_authorization`].

mod session;

pub use session::*;

// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	flows::{TokenBroker, common},
	http::BrokerHttpClient,
	oauth::OAuth2Facade,
	obs::{self, FlowKind},
};

impl<C> TokenBroker<C>
where
	C: ?Sized + BrokerHttpClient,
{
	/// Opens a new pending authorization, replacing any previous one.
	pub fn begin_authorization(&self) -> AuthorizationSession {
		let session = session::build_session(
			&self.descriptor,
			&self.client,
			OffsetDateTime::now_utc(),
			self.options.authorization_ttl,
		);

		*self.pending.lock() = Some(session.clone());
		obs::record_flow_event(FlowKind::AuthorizationCode, "authorization_started");

		session
	}

	/// Returns the pending authorization, if one is open and not yet expired.
	pub fn pending_authorization(&self) -> Option<AuthorizationSession> {
		let now = OffsetDateTime::now_utc();

		self.pending.lock().as_ref().filter(|session| !session.is_expired_at(now)).cloned()
	}

	/// Abandons the pending authorization. Returns `true` when one was open.
	pub fn cancel_authorization(&self) -> bool {
		let cancelled = self.pending.lock().take().is_some();

		if cancelled {
			obs::record_flow_event(FlowKind::AuthorizationCode, "authorization_cancelled");
		}

		cancelled
	}

	/// Completes the pending authorization with the redirect's `state` and `code`.
	///
	/// On success the issued tokens are written through to the store and the cache. A
	/// mismatched `state` leaves the session pending so the genuine callback can still land.
	pub async fn complete_authorization(&self, state: &str, code: &str) -> Result<AccessToken> {
		obs::observe(FlowKind::AuthorizationCode, "complete_authorization", async move {
			let session = self.take_pending(state, OffsetDateTime::now_utc())?;
			let guard = common::flow_guard(self, &self.client);
			let _singleflight = guard.lock().await;
			let facade = common::facade(self)?;
			let record = facade
				.exchange_authorization_code(
					&self.client,
					code,
					session.verifier(),
					&session.redirect_uri,
				)
				.await?;

			common::write_through(self, record).await
		})
		.await
	}

	/// Reuses the open session or starts a new one, then reports that consent is needed.
	pub(crate) fn authorization_required(&self, now: OffsetDateTime) -> Error {
		let reusable = self
			.pending
			.lock()
			.as_ref()
			.filter(|session| !session.is_expired_at(now))
			.map(|session| session.authorize_url.clone());
		let authorize_url = match reusable {
			Some(url) => url,
			None => self.begin_authorization().authorize_url,
		};

		obs::record_flow_event(FlowKind::UserToken, "authorization_required");

		Error::AuthorizationRequired { authorize_url }
	}

	fn take_pending(&self, state: &str, now: OffsetDateTime) -> Result<AuthorizationSession> {
		let mut pending = self.pending.lock();
		let session = pending.as_ref().ok_or(Error::AuthorizationNotPending)?;

		if session.is_expired_at(now) {
			*pending = None;

			return Err(Error::AuthorizationExpired);
		}

		session.validate_state(state)?;

		pending.take().ok_or(Error::AuthorizationNotPending)
	}
}
