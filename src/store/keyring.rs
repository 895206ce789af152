//! Platform-native [`SecretStore`] backed by the OS keyring (macOS Keychain, Windows Credential
//! Manager, Linux Secret Service).

// std
use std::collections::BTreeSet;
// crates.io
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use keyring::{Entry, Error as KeyringError};
// self
use crate::{
	_prelude::*,
	store::{SecretStore, SecretStoreError},
	vault::CredentialKey,
};

/// Stores each payload as a base64 password under `(service, key)`.
///
/// Platform keyrings cannot enumerate entries by service, so [`SecretStore::list`] probes every
/// known [`CredentialKey`] plus any other name written through this instance.
#[derive(Debug)]
pub struct KeyringStore {
	service: String,
	written: Mutex<BTreeSet<String>>,
}
impl KeyringStore {
	/// Service name used when none is supplied.
	pub const DEFAULT_SERVICE: &'static str = "relay-core";

	/// Creates a store scoped to `service`.
	pub fn new(service: impl Into<String>) -> Self {
		Self { service: service.into(), written: Mutex::new(BTreeSet::new()) }
	}

	fn entry(&self, key: &str) -> Result<Entry, SecretStoreError> {
		Entry::new(&self.service, key).map_err(|e| backend("open", key, e))
	}
}
impl Default for KeyringStore {
	fn default() -> Self {
		Self::new(Self::DEFAULT_SERVICE)
	}
}
impl SecretStore for KeyringStore {
	fn put(&self, key: &str, value: &[u8]) -> Result<(), SecretStoreError> {
		self.entry(key)?.set_password(&BASE64.encode(value)).map_err(|e| backend("write", key, e))?;
		self.written.lock().insert(key.to_owned());

		Ok(())
	}

	fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SecretStoreError> {
		let encoded = match self.entry(key)?.get_password() {
			Ok(encoded) => encoded,
			Err(KeyringError::NoEntry) => return Ok(None),
			Err(e) => return Err(backend("read", key, e)),
		};

		BASE64.decode(encoded.trim()).map(Some).map_err(|e| SecretStoreError::Serialization {
			message: format!("Keyring payload for `{key}` is not valid base64: {e}"),
		})
	}

	fn delete(&self, key: &str) -> Result<bool, SecretStoreError> {
		let removed = match self.entry(key)?.delete_credential() {
			Ok(()) => true,
			Err(KeyringError::NoEntry) => false,
			Err(e) => return Err(backend("delete", key, e)),
		};

		self.written.lock().remove(key);

		Ok(removed)
	}

	fn list(&self) -> Result<Vec<String>, SecretStoreError> {
		let mut candidates: BTreeSet<String> =
			CredentialKey::ALL.iter().map(|key| key.as_str().to_owned()).collect();

		candidates.extend(self.written.lock().iter().cloned());

		let mut present = Vec::new();

		for key in candidates {
			if self.get(&key)?.is_some() {
				present.push(key);
			}
		}

		Ok(present)
	}
}

fn backend(action: &str, key: &str, e: KeyringError) -> SecretStoreError {
	SecretStoreError::Backend { message: format!("Keyring {action} failed for `{key}`: {e}") }
}
