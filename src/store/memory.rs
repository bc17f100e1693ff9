//! Thread-safe in-memory [`TokenStore`] for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{ClientIdentity, StoredToken},
	store::{StoreError, StoreFuture, TokenStore},
};

type StoreMap = Arc<RwLock<HashMap<ClientIdentity, StoredToken>>>;

/// Storage backend that keeps rows in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of rows currently held.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no rows are held.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn add_now(map: StoreMap, record: StoredToken) -> Result<(), StoreError> {
		let mut guard = map.write();

		if guard.contains_key(&record.client) {
			return Err(StoreError::duplicate(&record.client));
		}

		guard.insert(record.client.clone(), record);

		Ok(())
	}

	fn update_now(map: StoreMap, record: StoredToken) -> Result<(), StoreError> {
		let mut guard = map.write();

		match guard.get_mut(&record.client) {
			Some(existing) => {
				*existing = record;

				Ok(())
			},
			None => Err(StoreError::missing(&record.client)),
		}
	}
}
impl TokenStore for MemoryStore {
	fn fetch<'a>(&'a self, client: &'a ClientIdentity) -> StoreFuture<'a, Option<StoredToken>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(client).cloned()) })
	}

	fn add(&self, record: StoredToken) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::add_now(map, record) })
	}

	fn update(&self, record: StoredToken) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::update_now(map, record) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn record(client: &str, access: &str) -> StoredToken {
		StoredToken::builder(ClientIdentity::new(client).expect("Client fixture should be valid."))
			.access_token(access)
			.refresh_token("refresh")
			.expires_in(Duration::minutes(30))
			.build()
			.expect("Record fixture should build.")
	}

	#[tokio::test]
	async fn add_rejects_duplicates_and_update_requires_row() {
		let store = MemoryStore::default();

		store.add(record("client-a", "one")).await.expect("First add should succeed.");

		let err = store
			.add(record("client-a", "two"))
			.await
			.expect_err("Second add for the same client should fail.");

		assert_eq!(err, StoreError::Duplicate { client: "client-a".into() });

		let err = store
			.update(record("client-b", "three"))
			.await
			.expect_err("Update without a row should fail.");

		assert_eq!(err, StoreError::Missing { client: "client-b".into() });
		assert_eq!(store.len(), 1);
	}

	#[tokio::test]
	async fn update_overwrites_in_place() {
		let store = MemoryStore::default();
		let client = ClientIdentity::new("client-a").expect("Client fixture should be valid.");

		store.add(record("client-a", "one")).await.expect("Add should succeed.");
		store.update(record("client-a", "two")).await.expect("Update should succeed.");

		let fetched = store
			.fetch(&client)
			.await
			.expect("Fetch should succeed.")
			.expect("Row should be present.");

		assert_eq!(fetched.access_token.expose(), "two");
		assert_eq!(store.len(), 1);
	}
}
