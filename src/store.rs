//! Secret storage capability and the built-in backends the vault persists through.
//!
//! Backends only ever see opaque byte payloads: the vault encrypts every credential before it
//! calls [`SecretStore::put`], except the root encryption key itself.

pub mod file;
#[cfg(feature = "keyring")] pub mod keyring;
pub mod memory;

pub use file::FileStore;
#[cfg(feature = "keyring")] pub use self::keyring::KeyringStore;
pub use memory::MemoryStore;

// self
use crate::_prelude::*;

/// Persistence contract for vault payloads.
///
/// Implementations must provide atomic per-key read/modify/write; the vault never relies on
/// transactions spanning several keys.
pub trait SecretStore
where
	Self: Send + Sync,
{
	/// Writes or replaces the payload stored under `key`.
	fn put(&self, key: &str, value: &[u8]) -> Result<(), SecretStoreError>;

	/// Reads the payload stored under `key`, if present.
	fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SecretStoreError>;

	/// Removes `key`, returning whether it existed.
	fn delete(&self, key: &str) -> Result<bool, SecretStoreError>;

	/// Lists stored key names.
	fn list(&self) -> Result<Vec<String>, SecretStoreError>;
}

/// Error type produced by [`SecretStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SecretStoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure (platform store unavailable, I/O, permissions).
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn store_error_converts_into_vault_error_with_source() {
		let store_error = SecretStoreError::Backend { message: "keyring unreachable".into() };
		let error: Error = store_error.clone().into();

		assert_eq!(error.kind(), ErrorKind::Vault);

		let source = StdError::source(&error)
			.expect("Vault error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
