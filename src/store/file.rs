//! File-backed [`SecretStore`] for machines without a usable platform keyring.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// crates.io
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
// self
use crate::{
	_prelude::*,
	store::{SecretStore, SecretStoreError},
};

/// Persists vault payloads to a JSON snapshot (key → base64 payload) after each mutation.
///
/// Payloads are already encrypted by the vault; the file itself is created owner-only on Unix.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<BTreeMap<String, String>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, SecretStoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = if path.exists() { Self::load_snapshot(&path)? } else { BTreeMap::new() };

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the snapshot file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<BTreeMap<String, String>, SecretStoreError> {
		let metadata = path.metadata().map_err(|e| SecretStoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(BTreeMap::new());
		}

		let bytes = fs::read(path).map_err(|e| SecretStoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		serde_json::from_slice(&bytes).map_err(|e| SecretStoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), SecretStoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| SecretStoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &BTreeMap<String, String>) -> Result<(), SecretStoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| SecretStoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| SecretStoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			restrict_permissions(&tmp_path)?;
			file.write_all(&serialized).map_err(|e| SecretStoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| SecretStoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| SecretStoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl SecretStore for FileStore {
	fn put(&self, key: &str, value: &[u8]) -> Result<(), SecretStoreError> {
		let mut guard = self.inner.write();
		let mut next = guard.clone();

		next.insert(key.to_owned(), BASE64.encode(value));
		self.persist_locked(&next)?;
		*guard = next;

		Ok(())
	}

	fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SecretStoreError> {
		let guard = self.inner.read();

		guard
			.get(key)
			.map(|encoded| {
				BASE64.decode(encoded).map_err(|e| SecretStoreError::Serialization {
					message: format!("Stored payload for `{key}` is not valid base64: {e}"),
				})
			})
			.transpose()
	}

	fn delete(&self, key: &str) -> Result<bool, SecretStoreError> {
		let mut guard = self.inner.write();

		if !guard.contains_key(key) {
			return Ok(false);
		}

		let mut next = guard.clone();

		next.remove(key);
		self.persist_locked(&next)?;
		*guard = next;

		Ok(true)
	}

	fn list(&self) -> Result<Vec<String>, SecretStoreError> {
		Ok(self.inner.read().keys().cloned().collect())
	}
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), SecretStoreError> {
	// std
	use std::os::unix::fs::PermissionsExt;

	fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| {
		SecretStoreError::Backend {
			message: format!("Failed to restrict permissions on {}: {e}", path.display()),
		}
	})
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), SecretStoreError> {
	Ok(())
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;

	fn temp_path() -> PathBuf {
		let unique = format!(
			"relay_core_file_store_{}_{}.json",
			process::id(),
			time::OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn save_and_reload_round_trip() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");

		store.put("jira-token", &[0, 159, 146, 150]).expect("Failed to save fixture payload.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = reopened
			.get("jira-token")
			.expect("Failed to read fixture payload.")
			.expect("File store lost payload after reopen.");

		assert_eq!(fetched, vec![0, 159, 146, 150]);
		assert_eq!(reopened.list().expect("List should succeed."), vec!["jira-token".to_owned()]);
		assert!(reopened.delete("jira-token").expect("Delete should succeed."));
		assert!(!reopened.delete("jira-token").expect("Second delete should succeed."));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn failed_persist_leaves_memory_unchanged() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");

		store.put("jira-token", b"kept").expect("Failed to save fixture payload.");

		let mut tmp_path = path.clone();

		tmp_path.set_extension("tmp");
		fs::create_dir(&tmp_path).expect("Failed to occupy the temporary snapshot path.");

		let err = store.put("jira-token", b"lost").expect_err("Blocked snapshot write must fail.");

		assert!(matches!(err, SecretStoreError::Backend { .. }));
		assert_eq!(
			store.get("jira-token").expect("Read should succeed."),
			Some(b"kept".to_vec()),
			"A failed write must not be visible in memory."
		);
		assert!(store.delete("jira-token").is_err());
		assert!(store.get("jira-token").expect("Read should succeed.").is_some());

		fs::remove_dir(&tmp_path).expect("Failed to remove the blocking directory.");

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");

		assert_eq!(
			reopened.get("jira-token").expect("Read should succeed."),
			Some(b"kept".to_vec())
		);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[cfg(unix)]
	#[test]
	fn snapshot_is_owner_only() {
		// std
		use std::os::unix::fs::PermissionsExt;

		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");

		store.put("gemini-api-key", b"payload").expect("Failed to save fixture payload.");

		let mode = fs::metadata(&path).expect("Snapshot should exist.").permissions().mode();

		assert_eq!(mode & 0o777, 0o600);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
