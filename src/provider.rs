//! Provider identities and their named configuration structs.
//!
//! Each outbound integration gets an explicit config type (endpoints, rate limit, retry policy)
//! instead of an ad hoc record shape, so the manager can wire authenticators statically.

// self
use crate::{
	_prelude::*,
	config::ProviderLimits,
	vault::CredentialKey,
};

/// Outbound API providers served by the request core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
	/// Issue tracker.
	Jira,
	/// Generative-AI API.
	Gemini,
	/// Document service.
	Google,
}
impl Provider {
	/// Every provider, in the order aggregate validation visits them.
	pub const ALL: [Provider; 3] = [Provider::Jira, Provider::Gemini, Provider::Google];

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Provider::Jira => "jira",
			Provider::Gemini => "gemini",
			Provider::Google => "google",
		}
	}

	/// Credential that must be present before the provider can be used.
	pub const fn required_credential(self) -> CredentialKey {
		match self {
			Provider::Jira => CredentialKey::JiraToken,
			Provider::Gemini => CredentialKey::GeminiApiKey,
			Provider::Google => CredentialKey::GoogleClientSecret,
		}
	}
}
impl Display for Provider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Jira Cloud connection settings.
#[derive(Clone, Debug, Deserialize)]
pub struct JiraConfig {
	/// Site root, e.g. `https://example.atlassian.net`.
	pub base_url: Url,
	/// Account e-mail paired with the API token for basic auth.
	pub email: String,
	/// Rate limit and retry policy.
	#[serde(default)]
	pub limits: ProviderLimits,
}
impl JiraConfig {
	/// Creates a config with default limits.
	pub fn new(base_url: Url, email: impl Into<String>) -> Self {
		Self { base_url, email: email.into(), limits: ProviderLimits::default() }
	}

	/// Overrides the provider limits.
	pub fn with_limits(mut self, limits: ProviderLimits) -> Self {
		self.limits = limits;

		self
	}
}

/// Gemini API connection settings.
#[derive(Clone, Debug, Deserialize)]
pub struct GeminiConfig {
	/// API root, defaults to `https://generativelanguage.googleapis.com`.
	#[serde(default = "GeminiConfig::default_base_url")]
	pub base_url: Url,
	/// Rate limit and retry policy.
	#[serde(default)]
	pub limits: ProviderLimits,
}
impl GeminiConfig {
	const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com";

	/// Creates a config pointing at a custom API root.
	pub fn new(base_url: Url) -> Self {
		Self { base_url, limits: ProviderLimits::default() }
	}

	/// Overrides the provider limits.
	pub fn with_limits(mut self, limits: ProviderLimits) -> Self {
		self.limits = limits;

		self
	}

	fn default_base_url() -> Url {
		Url::parse(Self::DEFAULT_BASE_URL).expect("Default Gemini URL must parse.")
	}
}
impl Default for GeminiConfig {
	fn default() -> Self {
		Self::new(Self::default_base_url())
	}
}

/// Google APIs (Docs, OAuth) connection settings.
#[derive(Clone, Debug, Deserialize)]
pub struct GoogleConfig {
	/// OAuth client identifier paired with the stored client secret.
	pub client_id: String,
	/// API root used for identity checks, defaults to `https://www.googleapis.com`.
	#[serde(default = "GoogleConfig::default_api_base")]
	pub api_base: Url,
	/// OAuth token endpoint, defaults to `https://oauth2.googleapis.com/token`.
	#[serde(default = "GoogleConfig::default_token_endpoint")]
	pub token_endpoint: Url,
	/// Rate limit and retry policy.
	#[serde(default)]
	pub limits: ProviderLimits,
}
impl GoogleConfig {
	const DEFAULT_API_BASE: &'static str = "https://www.googleapis.com";
	const DEFAULT_TOKEN_ENDPOINT: &'static str = "https://oauth2.googleapis.com/token";

	/// Creates a config with Google's public endpoints.
	pub fn new(client_id: impl Into<String>) -> Self {
		Self {
			client_id: client_id.into(),
			api_base: Self::default_api_base(),
			token_endpoint: Self::default_token_endpoint(),
			limits: ProviderLimits::default(),
		}
	}

	/// Points identity checks and token refreshes at custom endpoints.
	pub fn with_endpoints(mut self, api_base: Url, token_endpoint: Url) -> Self {
		self.api_base = api_base;
		self.token_endpoint = token_endpoint;

		self
	}

	/// Overrides the provider limits.
	pub fn with_limits(mut self, limits: ProviderLimits) -> Self {
		self.limits = limits;

		self
	}

	fn default_api_base() -> Url {
		Url::parse(Self::DEFAULT_API_BASE).expect("Default Google API URL must parse.")
	}

	fn default_token_endpoint() -> Url {
		Url::parse(Self::DEFAULT_TOKEN_ENDPOINT).expect("Default Google token URL must parse.")
	}
}

/// Joins a relative path onto a configured root without discarding the root's own path.
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url> {
	let mut joined = base.clone();

	{
		let mut segments = joined
			.path_segments_mut()
			.map_err(|_| Error::config(format!("Endpoint `{base}` cannot carry a path.")))?;

		segments.pop_if_empty();
		segments.extend(path.trim_start_matches('/').split('/'));
	}

	Ok(joined)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn endpoint_keeps_base_path() {
		let base = Url::parse("https://example.com/jira/").expect("Fixture URL should parse.");
		let joined = endpoint(&base, "/rest/api/3/myself").expect("Join should succeed.");

		assert_eq!(joined.as_str(), "https://example.com/jira/rest/api/3/myself");
	}

	#[test]
	fn every_provider_has_a_required_credential() {
		for provider in Provider::ALL {
			assert_eq!(provider.required_credential().provider(), Some(provider));
		}
	}

	#[test]
	fn gemini_defaults_to_public_endpoint() {
		let config = GeminiConfig::default();

		assert_eq!(config.base_url.as_str(), "https://generativelanguage.googleapis.com/");
	}
}
