//! Caller-supplied configuration: TLS settings, request timeouts, and per-provider limits.
//!
//! Structs derive [`Deserialize`] with durations expressed in milliseconds so an outer loader
//! can feed them from any format; loading files is left to the caller.

// self
use crate::{
	_prelude::*,
	provider::{GeminiConfig, GoogleConfig, JiraConfig},
	retry::RetryPolicy,
};

/// Minimum TLS protocol version accepted by the transport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum TlsVersion {
	/// TLS 1.0.
	V1_0,
	/// TLS 1.1.
	V1_1,
	/// TLS 1.2.
	V1_2,
	/// TLS 1.3.
	#[default]
	V1_3,
}
impl TlsVersion {
	/// Returns the dotted version label.
	pub const fn as_str(self) -> &'static str {
		match self {
			TlsVersion::V1_0 => "1.0",
			TlsVersion::V1_1 => "1.1",
			TlsVersion::V1_2 => "1.2",
			TlsVersion::V1_3 => "1.3",
		}
	}
}
impl Display for TlsVersion {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for TlsVersion {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		match s.trim() {
			"1.0" => Ok(TlsVersion::V1_0),
			"1.1" => Ok(TlsVersion::V1_1),
			"1.2" => Ok(TlsVersion::V1_2),
			"1.3" => Ok(TlsVersion::V1_3),
			other => Err(Error::validation(format!(
				"Unsupported TLS version `{other}`; expected 1.0, 1.1, 1.2, or 1.3."
			))),
		}
	}
}
impl TryFrom<String> for TlsVersion {
	type Error = Error;

	fn try_from(value: String) -> Result<Self> {
		value.parse()
	}
}

/// Transport hardening knobs.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
	/// Lowest TLS version the transport negotiates.
	pub tls_min_version: TlsVersion,
	/// Verify server certificates; turning this off is an explicit opt-out.
	pub verify_ssl: bool,
	/// Overall per-request timeout.
	#[serde(with = "duration_ms")]
	pub request_timeout: Duration,
	/// TCP connect + TLS handshake timeout.
	#[serde(with = "duration_ms")]
	pub connect_timeout: Duration,
	/// Idle connections kept per host.
	pub pool_max_idle_per_host: usize,
	/// How long an idle pooled connection is kept.
	#[serde(with = "duration_ms")]
	pub pool_idle_timeout: Duration,
	/// Cipher suite names (IANA spelling) narrowing the built-in allow-list; empty keeps the full
	/// allow-list.
	pub cipher_suites: Vec<String>,
}
impl AuthConfig {
	/// Sets the minimum TLS version.
	pub fn with_tls_min_version(mut self, version: TlsVersion) -> Self {
		self.tls_min_version = version;

		self
	}

	/// Opts out of certificate verification. Never use outside local testing.
	pub fn danger_disable_verification(mut self) -> Self {
		self.verify_ssl = false;

		self
	}

	/// Overrides the overall request timeout.
	pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Narrows the cipher suite allow-list.
	pub fn with_cipher_suites<I, S>(mut self, suites: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.cipher_suites = suites.into_iter().map(Into::into).collect();

		self
	}
}
impl Default for AuthConfig {
	fn default() -> Self {
		Self {
			tls_min_version: TlsVersion::default(),
			verify_ssl: true,
			request_timeout: Duration::from_secs(30),
			connect_timeout: Duration::from_secs(10),
			pool_max_idle_per_host: 8,
			pool_idle_timeout: Duration::from_secs(90),
			cipher_suites: Vec::new(),
		}
	}
}

/// Requests allowed per window for one provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct RateLimitConfig {
	/// Maximum calls admitted within any window.
	pub requests: u32,
	/// Window length.
	#[serde(with = "duration_ms")]
	pub window: Duration,
}
impl RateLimitConfig {
	/// Creates a limit of `requests` per `window`.
	pub const fn new(requests: u32, window: Duration) -> Self {
		Self { requests, window }
	}
}
impl Default for RateLimitConfig {
	fn default() -> Self {
		Self::new(10, Duration::from_secs(1))
	}
}

/// Rate limit plus retry policy applied to one provider.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProviderLimits {
	/// Token-bucket parameters.
	pub rate_limit: RateLimitConfig,
	/// Retry/backoff policy.
	pub retry: RetryPolicy,
}
impl ProviderLimits {
	/// Creates limits from the provided parts.
	pub fn new(rate_limit: RateLimitConfig, retry: RetryPolicy) -> Self {
		Self { rate_limit, retry }
	}
}

/// Everything the manager needs at construction time.
#[derive(Clone, Debug, Deserialize)]
pub struct ManagerConfig {
	/// Transport hardening.
	#[serde(default)]
	pub auth: AuthConfig,
	/// Jira settings.
	pub jira: JiraConfig,
	/// Gemini settings.
	#[serde(default)]
	pub gemini: GeminiConfig,
	/// Google settings.
	pub google: GoogleConfig,
}
impl ManagerConfig {
	/// Creates a config with the default transport settings.
	pub fn new(jira: JiraConfig, gemini: GeminiConfig, google: GoogleConfig) -> Self {
		Self { auth: AuthConfig::default(), jira, gemini, google }
	}

	/// Overrides the transport settings.
	pub fn with_auth(mut self, auth: AuthConfig) -> Self {
		self.auth = auth;

		self
	}
}

pub(crate) mod duration_ms {
	//! Serde adapter storing [`Duration`] as whole milliseconds.

	// crates.io
	use serde::Deserializer;
	// self
	use crate::_prelude::*;

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		u64::deserialize(deserializer).map(Duration::from_millis)
	}
}
