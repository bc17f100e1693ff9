//! Durable token storage: one [`StoredToken`] row per client identity.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{ClientIdentity, StoredToken},
};

/// Boxed future returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract for stored tokens.
///
/// Every mutation is committed before its future resolves; single-row writes must be atomic.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Fetches the row owned by `client`, if present.
	fn fetch<'a>(&'a self, client: &'a ClientIdentity) -> StoreFuture<'a, Option<StoredToken>>;

	/// Inserts a new row; fails with [`StoreError::Duplicate`] if one already exists.
	fn add(&self, record: StoredToken) -> StoreFuture<'_, ()>;

	/// Overwrites an existing row; fails with [`StoreError::Missing`] if none exists.
	fn update(&self, record: StoredToken) -> StoreFuture<'_, ()>;

	/// Updates the row when present, otherwise adds it.
	fn upsert(&self, record: StoredToken) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			match self.fetch(&record.client).await? {
				Some(_) => self.update(record).await,
				None => self.add(record).await,
			}
		})
	}
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// `add` was called for a client that already owns a row.
	#[error("A token row already exists for client {client}.")]
	Duplicate {
		/// Client identity.
		client: String,
	},
	/// `update` was called for a client without a row.
	#[error("No token row exists for client {client}.")]
	Missing {
		/// Client identity.
		client: String,
	},
}
impl StoreError {
	pub(crate) fn duplicate(client: &ClientIdentity) -> Self {
		Self::Duplicate { client: client.to_string() }
	}

	pub(crate) fn missing(client: &ClientIdentity) -> Self {
		Self::Missing { client: client.to_string() }
	}
}
