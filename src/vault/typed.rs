//! Per-provider credential bundles layered over the string-keyed vault.

// self
use crate::{
	_prelude::*,
	provider::Provider,
	vault::{CredentialKey, CredentialVault, SecretValue},
};

/// Jira API token.
#[derive(Clone, Debug)]
pub struct JiraCredentials {
	/// API token paired with the configured account e-mail.
	pub token: SecretValue,
}

/// Gemini API key.
#[derive(Clone, Debug)]
pub struct GeminiCredentials {
	/// API key sent in the `x-goog-api-key` header.
	pub api_key: SecretValue,
}

/// Google OAuth client secret and tokens.
#[derive(Clone, Debug)]
pub struct GoogleCredentials {
	/// OAuth client secret.
	pub client_secret: SecretValue,
	/// Current access token, once obtained.
	pub access_token: Option<SecretValue>,
	/// Refresh token, once obtained.
	pub refresh_token: Option<SecretValue>,
}

impl CredentialVault {
	/// Stores the Jira token.
	pub fn set_jira_credentials(&self, credentials: &JiraCredentials) -> Result<()> {
		require(&credentials.token, CredentialKey::JiraToken)?;

		self.store(CredentialKey::JiraToken, credentials.token.expose())
	}

	/// Reads the Jira token.
	pub fn jira_credentials(&self) -> Result<JiraCredentials> {
		Ok(JiraCredentials { token: self.get(CredentialKey::JiraToken)? })
	}

	/// Stores the Gemini API key.
	pub fn set_gemini_credentials(&self, credentials: &GeminiCredentials) -> Result<()> {
		require(&credentials.api_key, CredentialKey::GeminiApiKey)?;

		self.store(CredentialKey::GeminiApiKey, credentials.api_key.expose())
	}

	/// Reads the Gemini API key.
	pub fn gemini_credentials(&self) -> Result<GeminiCredentials> {
		Ok(GeminiCredentials { api_key: self.get(CredentialKey::GeminiApiKey)? })
	}

	/// Stores the Google client secret and whichever tokens are present.
	pub fn set_google_credentials(&self, credentials: &GoogleCredentials) -> Result<()> {
		require(&credentials.client_secret, CredentialKey::GoogleClientSecret)?;

		self.store(CredentialKey::GoogleClientSecret, credentials.client_secret.expose())?;

		for (key, token) in [
			(CredentialKey::GoogleAccessToken, &credentials.access_token),
			(CredentialKey::GoogleRefreshToken, &credentials.refresh_token),
		] {
			match token.as_ref().filter(|token| !token.is_empty()) {
				Some(token) => self.store(key, token.expose())?,
				None => self.delete_if_present(key)?,
			}
		}

		Ok(())
	}

	/// Reads the Google client secret and any stored tokens.
	pub fn google_credentials(&self) -> Result<GoogleCredentials> {
		Ok(GoogleCredentials {
			client_secret: self.get(CredentialKey::GoogleClientSecret)?,
			access_token: self.get_optional(CredentialKey::GoogleAccessToken)?,
			refresh_token: self.get_optional(CredentialKey::GoogleRefreshToken)?,
		})
	}

	/// Fails with a validation error naming the first provider whose required credential is
	/// absent. Makes no network calls.
	pub fn validate_all_credentials(&self) -> Result<()> {
		for provider in Provider::ALL {
			let key = provider.required_credential();

			if !self.has(key)? {
				return Err(Error::validation(format!(
					"Missing required {provider} credential `{key}`."
				))
				.with_provider(provider));
			}
		}

		Ok(())
	}

	/// Deletes every known credential and the root key; absent keys are skipped.
	pub fn clear_all_credentials(&self) -> Result<()> {
		for key in CredentialKey::ALL {
			self.delete_if_present(key)?;
		}

		Ok(())
	}

	fn delete_if_present(&self, key: CredentialKey) -> Result<()> {
		match self.delete(key) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == ErrorKind::CredentialsMissing => Ok(()),
			Err(e) => Err(e),
		}
	}

	pub(crate) fn get_optional(&self, key: CredentialKey) -> Result<Option<SecretValue>> {
		match self.get(key) {
			Ok(value) => Ok(Some(value)),
			Err(e) if e.kind() == ErrorKind::CredentialsMissing => Ok(None),
			Err(e) => Err(e),
		}
	}
}

fn require(value: &SecretValue, key: CredentialKey) -> Result<()> {
	if value.is_empty() {
		return Err(Error::validation(format!("Credential `{key}` must not be empty.")));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::MemoryStore;

	fn vault() -> CredentialVault {
		CredentialVault::new(Arc::new(MemoryStore::default()))
	}

	#[test]
	fn typed_round_trip() {
		let vault = vault();

		vault
			.set_google_credentials(&GoogleCredentials {
				client_secret: "secret".into(),
				access_token: None,
				refresh_token: Some("refresh".into()),
			})
			.expect("Google credentials should store.");

		let google = vault.google_credentials().expect("Google credentials should load.");

		assert_eq!(google.client_secret.expose(), "secret");
		assert!(google.access_token.is_none());
		assert_eq!(google.refresh_token.as_ref().map(SecretValue::expose), Some("refresh"));
	}

	#[test]
	fn resetting_google_without_tokens_drops_stale_ones() {
		let vault = vault();

		vault
			.set_google_credentials(&GoogleCredentials {
				client_secret: "secret".into(),
				access_token: Some("old-access".into()),
				refresh_token: Some("old-refresh".into()),
			})
			.expect("Google credentials should store.");
		vault
			.set_google_credentials(&GoogleCredentials {
				client_secret: "secret-2".into(),
				access_token: None,
				refresh_token: Some("".into()),
			})
			.expect("Google credentials should be replaced.");

		let google = vault.google_credentials().expect("Google credentials should load.");

		assert_eq!(google.client_secret.expose(), "secret-2");
		assert!(google.access_token.is_none(), "Stale access token must be removed.");
		assert!(google.refresh_token.is_none(), "Stale refresh token must be removed.");
	}

	#[test]
	fn empty_required_field_is_rejected() {
		let err = vault()
			.set_jira_credentials(&JiraCredentials { token: "".into() })
			.expect_err("Empty token must be rejected.");

		assert_eq!(err.kind(), ErrorKind::Validation);
	}

	#[test]
	fn validate_all_names_first_missing_provider() {
		let vault = vault();

		vault
			.set_jira_credentials(&JiraCredentials { token: "t".into() })
			.expect("Jira credentials should store.");
		vault
			.set_google_credentials(&GoogleCredentials {
				client_secret: "s".into(),
				access_token: None,
				refresh_token: None,
			})
			.expect("Google credentials should store.");

		let err = vault.validate_all_credentials().expect_err("Gemini key is missing.");

		assert_eq!(err.kind(), ErrorKind::Validation);
		assert_eq!(err.provider(), Some(Provider::Gemini));
		assert!(err.to_string().contains("gemini"));
	}

	#[test]
	fn clear_all_tolerates_absent_keys() {
		let vault = vault();

		vault
			.set_gemini_credentials(&GeminiCredentials { api_key: "k".into() })
			.expect("Gemini credentials should store.");
		vault.clear_all_credentials().expect("Clearing should succeed.");
		vault.clear_all_credentials().expect("Clearing twice should succeed.");

		assert!(vault.list().expect("List should succeed.").is_empty());
	}
}
