//! File-backed [`TokenStore`] that keeps the seller's token across restarts.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{ClientIdentity, StoredToken},
	store::{StoreError, StoreFuture, TokenStore},
};

/// Persists token rows to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<ClientIdentity, StoredToken>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the snapshot file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<HashMap<ClientIdentity, StoredToken>, StoreError> {
		if !path.exists() {
			return Ok(HashMap::new());
		}

		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;
		let rows: Vec<StoredToken> =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(rows.into_iter().map(|row| (row.client.clone(), row)).collect())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &HashMap<ClientIdentity, StoredToken>) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let mut rows: Vec<_> = contents.values().collect();

		rows.sort_by(|a, b| a.client.cmp(&b.client));

		let serialized =
			serde_json::to_vec_pretty(&rows).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl TokenStore for FileStore {
	fn fetch<'a>(&'a self, client: &'a ClientIdentity) -> StoreFuture<'a, Option<StoredToken>> {
		Box::pin(async move { Ok(self.inner.read().get(client).cloned()) })
	}

	fn add(&self, record: StoredToken) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			if guard.contains_key(&record.client) {
				return Err(StoreError::duplicate(&record.client));
			}

			let client = record.client.clone();

			guard.insert(client.clone(), record);

			if let Err(e) = self.persist_locked(&guard) {
				guard.remove(&client);

				return Err(e);
			}

			Ok(())
		})
	}

	fn update(&self, record: StoredToken) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let previous = match guard.get_mut(&record.client) {
				Some(existing) => std::mem::replace(existing, record),
				None => return Err(StoreError::missing(&record.client)),
			};

			if let Err(e) = self.persist_locked(&guard) {
				guard.insert(previous.client.clone(), previous);

				return Err(e);
			}

			Ok(())
		})
	}
}
