//! Access token view handed out by the cache and the user-token flow.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Bearer token plus its expiry, as held by the process-local cache and returned to callers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessToken {
	/// Access token secret.
	pub secret: TokenSecret,
	/// Instant at which the token stops being usable.
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Creates a token view from its parts.
	pub fn new(secret: TokenSecret, expires_at: OffsetDateTime) -> Self {
		Self { secret, expires_at }
	}

	/// Strict validity check: usable only while `instant < expires_at`.
	pub fn is_valid_at(&self, instant: OffsetDateTime) -> bool {
		instant < self.expires_at
	}
}
