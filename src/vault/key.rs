//! Credential names and the vault's root encryption key.

// crates.io
use rand::{TryRngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};
// self
use crate::{_prelude::*, provider::Provider};

/// Logical names under which the vault stores credentials.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialKey {
	/// Jira API token.
	JiraToken,
	/// Gemini API key.
	GeminiApiKey,
	/// Google OAuth client secret.
	GoogleClientSecret,
	/// Google OAuth access token.
	GoogleAccessToken,
	/// Google OAuth refresh token.
	GoogleRefreshToken,
	/// Reserved slot holding the raw root encryption key.
	EncryptionKey,
}
impl CredentialKey {
	/// Every key the vault knows about.
	pub const ALL: [CredentialKey; 6] = [
		CredentialKey::JiraToken,
		CredentialKey::GeminiApiKey,
		CredentialKey::GoogleClientSecret,
		CredentialKey::GoogleAccessToken,
		CredentialKey::GoogleRefreshToken,
		CredentialKey::EncryptionKey,
	];

	/// Storage name.
	pub const fn as_str(self) -> &'static str {
		match self {
			CredentialKey::JiraToken => "jira-token",
			CredentialKey::GeminiApiKey => "gemini-api-key",
			CredentialKey::GoogleClientSecret => "google-client-secret",
			CredentialKey::GoogleAccessToken => "google-access-token",
			CredentialKey::GoogleRefreshToken => "google-refresh-token",
			CredentialKey::EncryptionKey => "encryption-key",
		}
	}

	/// Provider owning the credential; `None` for the root key.
	pub const fn provider(self) -> Option<Provider> {
		match self {
			CredentialKey::JiraToken => Some(Provider::Jira),
			CredentialKey::GeminiApiKey => Some(Provider::Gemini),
			CredentialKey::GoogleClientSecret
			| CredentialKey::GoogleAccessToken
			| CredentialKey::GoogleRefreshToken => Some(Provider::Google),
			CredentialKey::EncryptionKey => None,
		}
	}
}
impl AsRef<str> for CredentialKey {
	fn as_ref(&self) -> &str {
		self.as_str()
	}
}
impl Display for CredentialKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for CredentialKey {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		Self::ALL
			.into_iter()
			.find(|key| key.as_str() == s)
			.ok_or_else(|| Error::validation(format!("Unknown credential key `{s}`.")))
	}
}

const KEY_LEN: usize = 32;

/// 256-bit AES-GCM root key. Wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_LEN]);
impl EncryptionKey {
	/// Key length in bytes.
	pub const LEN: usize = KEY_LEN;

	/// Draws a fresh key from the operating system CSPRNG.
	pub fn generate() -> Result<Self> {
		let mut bytes = [0_u8; Self::LEN];

		OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
			Error::vault("Operating system random source is unavailable.").with_source(e)
		})?;

		Ok(Self(bytes))
	}

	/// Restores a key from its raw stored form.
	pub fn from_slice(bytes: &[u8]) -> Result<Self> {
		let bytes: [u8; Self::LEN] = bytes.try_into().map_err(|_| {
			Error::vault(format!(
				"Stored encryption key has {} bytes; expected {}.",
				bytes.len(),
				Self::LEN
			))
		})?;

		Ok(Self(bytes))
	}

	/// Raw key bytes. Never log these.
	pub fn expose(&self) -> &[u8; Self::LEN] {
		&self.0
	}

	/// Short SHA-256 fingerprint, safe to log.
	pub fn fingerprint(&self) -> String {
		Sha256::digest(self.0)[..8].iter().map(|byte| format!("{byte:02x}")).collect()
	}
}
impl Debug for EncryptionKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("EncryptionKey").field("fingerprint", &self.fingerprint()).finish()
	}
}
