//! Encrypted credential vault with root-key lifecycle management and secure erasure.
//!
//! Every credential is sealed with AES-256-GCM under a process-wide root key before it reaches the
//! [`SecretStore`]. The root key itself lives raw under the reserved `encryption-key` name and is
//! generated on first use.

pub mod cipher;
pub mod key;
pub mod secret;
pub mod typed;

pub use key::{CredentialKey, EncryptionKey};
pub use secret::SecretValue;
pub use typed::{GeminiCredentials, GoogleCredentials, JiraCredentials};

// std
use std::collections::BTreeSet;
// crates.io
use subtle::{Choice, ConstantTimeEq};
use zeroize::Zeroize;
// self
use crate::{_prelude::*, obs, store::SecretStore};

/// Thread-safe credential vault shared by every authenticator.
pub struct CredentialVault {
	store: Arc<dyn SecretStore>,
	key_lock: Mutex<()>,
}
impl CredentialVault {
	const ROOT_KEY: &'static str = CredentialKey::EncryptionKey.as_str();

	/// Creates a vault persisting through `store`.
	pub fn new(store: Arc<dyn SecretStore>) -> Self {
		Self { store, key_lock: Mutex::new(()) }
	}

	/// Underlying secret store.
	pub fn backend(&self) -> &Arc<dyn SecretStore> {
		&self.store
	}

	/// Encrypts and persists `value` under `key`.
	pub fn store(&self, key: impl AsRef<str>, value: &str) -> Result<()> {
		let key = key.as_ref();

		Self::ensure_key_name(key)?;

		if key == Self::ROOT_KEY {
			return Err(Error::validation(format!(
				"`{key}` is reserved for the vault's root encryption key."
			)));
		}
		if value.is_empty() {
			return Err(Error::validation(format!("Credential value for `{key}` must not be empty.")));
		}

		let root = self.get_or_generate_encryption_key()?;
		let envelope = cipher::seal(&root, key, value.as_bytes())?;

		self.store.put(key, &envelope)?;
		obs::log_vault_event("store", key);

		Ok(())
	}

	/// Reads and decrypts the credential stored under `key`.
	pub fn get(&self, key: impl AsRef<str>) -> Result<SecretValue> {
		let key = key.as_ref();

		Self::ensure_key_name(key)?;

		if key == Self::ROOT_KEY {
			return Err(Error::validation(
				"The root encryption key cannot be read as a credential.",
			));
		}

		let Some(envelope) = self.store.get(key)? else {
			return Err(Error::credentials_missing(key));
		};
		let root = self.existing_encryption_key()?.ok_or_else(|| {
			Error::vault(format!(
				"Credential `{key}` is stored but the root encryption key is missing."
			))
		})?;
		let mut plaintext = cipher::open(&root, key, &envelope)?;
		let value = String::from_utf8(plaintext.clone()).map_err(|_| {
			Error::vault(format!("Decrypted credential `{key}` is not valid UTF-8."))
		});

		Self::clear_sensitive_data(&mut plaintext);

		value.map(SecretValue::from)
	}

	/// Removes `key`, failing when it was not stored.
	pub fn delete(&self, key: impl AsRef<str>) -> Result<()> {
		let key = key.as_ref();

		Self::ensure_key_name(key)?;

		if !self.store.delete(key)? {
			return Err(Error::credentials_missing(key));
		}

		obs::log_vault_event("delete", key);

		Ok(())
	}

	/// Returns whether `key` is stored.
	pub fn has(&self, key: impl AsRef<str>) -> Result<bool> {
		let key = key.as_ref();

		Self::ensure_key_name(key)?;

		Ok(self.store.get(key)?.is_some())
	}

	/// Stored key names; values are never returned.
	pub fn list(&self) -> Result<BTreeSet<String>> {
		Ok(self.store.list()?.into_iter().collect())
	}

	/// Fails with [`ErrorKind::CredentialsMissing`] unless `key` is stored.
	pub fn validate_credential(&self, key: impl AsRef<str>) -> Result<()> {
		let key = key.as_ref();

		if self.has(key)? { Ok(()) } else { Err(Error::credentials_missing(key)) }
	}

	/// Generates a new root key, replacing any existing one.
	///
	/// Credentials sealed under the previous key become unreadable.
	pub fn generate_encryption_key(&self) -> Result<EncryptionKey> {
		let _guard = self.key_lock.lock();

		self.generate_locked()
	}

	/// Returns the stored root key, generating and persisting one on first use.
	pub fn get_or_generate_encryption_key(&self) -> Result<EncryptionKey> {
		let _guard = self.key_lock.lock();

		match self.load_root_key()? {
			Some(key) => Ok(key),
			None => self.generate_locked(),
		}
	}

	fn existing_encryption_key(&self) -> Result<Option<EncryptionKey>> {
		let _guard = self.key_lock.lock();

		self.load_root_key()
	}

	fn load_root_key(&self) -> Result<Option<EncryptionKey>> {
		let Some(mut raw) = self.store.get(Self::ROOT_KEY)? else {
			return Ok(None);
		};
		let key = EncryptionKey::from_slice(&raw);

		Self::clear_sensitive_data(&mut raw);

		key.map(Some)
	}

	/// Equality over every byte of the longer input without an early exit.
	pub fn secure_compare(a: &[u8], b: &[u8]) -> bool {
		let len = a.len().max(b.len());
		let mut equal = Choice::from(u8::from(a.len() == b.len()));

		for idx in 0..len {
			let lhs = a.get(idx).copied().unwrap_or(0);
			let rhs = b.get(idx).copied().unwrap_or(0);

			equal &= lhs.ct_eq(&rhs);
		}

		equal.into()
	}

	/// Overwrites `buf` with zeroes in a way the optimizer cannot elide.
	pub fn clear_sensitive_data(buf: &mut [u8]) {
		buf.zeroize();
	}

	fn generate_locked(&self) -> Result<EncryptionKey> {
		let key = EncryptionKey::generate()?;

		self.store.put(Self::ROOT_KEY, key.expose())?;
		obs::log_vault_event("generate_key", &key.fingerprint());

		Ok(key)
	}

	fn ensure_key_name(key: &str) -> Result<()> {
		if key.trim().is_empty() {
			return Err(Error::validation("Credential key must not be empty."));
		}

		Ok(())
	}
}
impl Debug for CredentialVault {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialVault").finish_non_exhaustive()
	}
}
