//! Process-local, time-bounded token cache sitting in front of the durable store.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientIdentity},
};

/// Keyed in-memory cache of [`AccessToken`] values.
///
/// Entries at or past `expires_at` are treated as absent and evicted on the next lookup.
#[derive(Clone, Debug, Default)]
pub struct TokenCache(Arc<RwLock<HashMap<ClientIdentity, AccessToken>>>);
impl TokenCache {
	/// Returns the cached token when it is still valid at `now`.
	pub fn get(&self, client: &ClientIdentity, now: OffsetDateTime) -> Option<AccessToken> {
		{
			let guard = self.0.read();

			match guard.get(client) {
				Some(token) if token.is_valid_at(now) => return Some(token.clone()),
				Some(_) => {},
				None => return None,
			}
		}

		let mut guard = self.0.write();

		if guard.get(client).is_some_and(|token| !token.is_valid_at(now)) {
			guard.remove(client);
		}

		None
	}

	/// Stores or overwrites the token for `client`.
	pub fn put(&self, client: ClientIdentity, token: AccessToken) {
		self.0.write().insert(client, token);
	}

	/// Drops the cached token for `client`.
	pub fn invalidate(&self, client: &ClientIdentity) {
		self.0.write().remove(client);
	}

	/// Number of entries physically held (including ones not yet evicted).
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no entries are held.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::auth::TokenSecret;

	fn client() -> ClientIdentity {
		ClientIdentity::new("client-cache").expect("Client fixture should be valid.")
	}

	#[test]
	fn hit_before_expiry_and_miss_at_expiry() {
		let cache = TokenCache::default();
		let expires = macros::datetime!(2025-01-01 12:00 UTC);

		cache.put(client(), AccessToken::new(TokenSecret::new("cached"), expires));

		let hit = cache
			.get(&client(), macros::datetime!(2025-01-01 11:59:59 UTC))
			.expect("Token should be served before expiry.");

		assert_eq!(hit.secret.expose(), "cached");
		assert!(cache.get(&client(), expires).is_none(), "Expiry instant is exclusive.");
		assert!(cache.is_empty(), "Expired entries are evicted on lookup.");
	}

	#[test]
	fn put_overwrites_and_invalidate_removes() {
		let cache = TokenCache::default();
		let expires = macros::datetime!(2025-01-01 12:00 UTC);
		let now = macros::datetime!(2025-01-01 10:00 UTC);

		cache.put(client(), AccessToken::new(TokenSecret::new("one"), expires));
		cache.put(client(), AccessToken::new(TokenSecret::new("two"), expires));

		assert_eq!(cache.len(), 1);
		assert_eq!(
			cache.get(&client(), now).map(|token| token.secret.expose().to_owned()),
			Some("two".into())
		);

		cache.invalidate(&client());

		assert!(cache.get(&client(), now).is_none());
	}
}
