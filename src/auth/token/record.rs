//! Durable token row and its builder.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientIdentity, token::secret::TokenSecret},
};

/// Errors produced by [`StoredTokenBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoredTokenBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
}

/// The one token row kept per client identity.
///
/// Created on the first successful authorization and overwritten in place on every refresh.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StoredToken {
	/// Client identity owning the row.
	pub client: ClientIdentity,
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh token secret, if the marketplace issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Issued-at instant recorded when the token endpoint answered.
	pub issued_at: OffsetDateTime,
	/// Expiry instant derived from issued_at plus expires_in.
	pub expires_at: OffsetDateTime,
}
impl StoredToken {
	/// Returns a builder for the provided client identity.
	pub fn builder(client: ClientIdentity) -> StoredTokenBuilder {
		StoredTokenBuilder::new(client)
	}

	/// Returns `true` once `instant` reaches the expiry instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Returns `true` when a refresh token is available.
	pub fn can_refresh(&self) -> bool {
		self.refresh_token.is_some()
	}

	/// Projects the row into the cache/caller view.
	pub fn access(&self) -> AccessToken {
		AccessToken::new(self.access_token.clone(), self.expires_at)
	}
}
impl Debug for StoredToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StoredToken")
			.field("client", &self.client)
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`StoredToken`].
#[derive(Clone, Debug)]
pub struct StoredTokenBuilder {
	client: ClientIdentity,
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl StoredTokenBuilder {
	fn new(client: ClientIdentity) -> Self {
		Self {
			client,
			access_token: None,
			refresh_token: None,
			issued_at: None,
			expires_at: None,
			expires_in: None,
		}
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Consumes the builder and produces a [`StoredToken`].
	pub fn build(self) -> Result<StoredToken, StoredTokenBuilderError> {
		let access_token = self.access_token.ok_or(StoredTokenBuilderError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => issued_at + delta,
			(None, None) => return Err(StoredTokenBuilderError::MissingExpiry),
		};

		Ok(StoredToken {
			client: self.client,
			access_token,
			refresh_token: self.refresh_token,
			issued_at,
			expires_at,
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn client() -> ClientIdentity {
		ClientIdentity::new("client-1").expect("Client fixture should be valid.")
	}

	#[test]
	fn expiry_is_reached_at_the_expiry_instant() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let expires = macros::datetime!(2025-01-01 01:00 UTC);
		let record = StoredToken::builder(client())
			.access_token("access")
			.refresh_token("refresh")
			.issued_at(issued)
			.expires_at(expires)
			.build()
			.expect("Stored token builder should succeed for expiry checks.");

		assert!(!record.is_expired_at(macros::datetime!(2024-12-31 23:59 UTC)));
		assert!(!record.is_expired_at(macros::datetime!(2025-01-01 00:59:59 UTC)));
		assert!(record.is_expired_at(macros::datetime!(2025-01-01 01:00 UTC)));
		assert!(record.is_expired_at(macros::datetime!(2025-01-01 01:30 UTC)));
		assert!(record.can_refresh());
	}

	#[test]
	fn builder_handles_relative_expiry() {
		let record = StoredToken::builder(client())
			.access_token("secret")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::seconds(43_199))
			.build()
			.expect("Stored token builder should support relative expiry calculations.");

		assert_eq!(record.expires_at, macros::datetime!(2025-01-01 11:59:59 UTC));
		assert!(!record.can_refresh());
	}

	#[test]
	fn builder_requires_access_token_and_expiry() {
		assert_eq!(
			StoredToken::builder(client()).expires_in(Duration::hours(1)).build(),
			Err(StoredTokenBuilderError::MissingAccessToken)
		);
		assert_eq!(
			StoredToken::builder(client()).access_token("a").build(),
			Err(StoredTokenBuilderError::MissingExpiry)
		);
	}

	#[test]
	fn debug_output_redacts_secrets() {
		let record = StoredToken::builder(client())
			.access_token("very-secret-access")
			.refresh_token("very-secret-refresh")
			.expires_in(Duration::hours(1))
			.build()
			.expect("Stored token builder should succeed.");
		let rendered = format!("{record:?}");

		assert!(!rendered.contains("very-secret"));
		assert!(rendered.contains("<redacted>"));
	}
}
