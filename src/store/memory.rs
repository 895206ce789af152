//! Thread-safe in-memory [`SecretStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{SecretStore, SecretStoreError},
};

type StoreMap = Arc<RwLock<HashMap<String, Vec<u8>>>>;

/// Thread-safe storage backend that keeps payloads in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of stored entries.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Raw payload as the vault persisted it (ciphertext for every credential).
	pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
		self.0.read().get(key).cloned()
	}
}
impl SecretStore for MemoryStore {
	fn put(&self, key: &str, value: &[u8]) -> Result<(), SecretStoreError> {
		self.0.write().insert(key.to_owned(), value.to_vec());

		Ok(())
	}

	fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SecretStoreError> {
		Ok(self.raw(key))
	}

	fn delete(&self, key: &str) -> Result<bool, SecretStoreError> {
		Ok(self.0.write().remove(key).is_some())
	}

	fn list(&self) -> Result<Vec<String>, SecretStoreError> {
		Ok(self.0.read().keys().cloned().collect())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn put_get_delete_round_trip() {
		let store = MemoryStore::default();

		store.put("alpha", b"one").expect("Put should succeed.");
		assert_eq!(store.get("alpha").expect("Get should succeed."), Some(b"one".to_vec()));
		assert!(store.delete("alpha").expect("Delete should succeed."));
		assert!(!store.delete("alpha").expect("Second delete should succeed."));
		assert!(store.is_empty());
	}
}
