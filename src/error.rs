//! Classified errors shared by the rate limiter, retry executor, vault, authenticators, and
//! transport.
//!
//! Every failure is mapped exactly once into an [`ErrorKind`]; the retry executor decides
//! retryability from that kind alone. Errors may carry a provider tag, an HTTP status, a truncated
//! response body, a `Retry-After` hint, and the attempt count, but never secret material.

// self
use crate::{_prelude::*, provider::Provider};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;

/// Taxonomy used to classify every failure surfaced by the request core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	/// Transport failure (DNS, connect, TLS handshake, timeout).
	Network,
	/// Credential is bad, missing at injection time, or rejected upstream.
	AuthFailed,
	/// Vault lookup miss.
	CredentialsMissing,
	/// Underlying secure-storage failure or undecryptable payload.
	Vault,
	/// Empty or malformed input.
	Validation,
	/// HTTP 403.
	ApiUnauthorized,
	/// HTTP 404 / 410.
	ApiNotFound,
	/// HTTP 429.
	ApiRateLimit,
	/// Any other HTTP 4xx.
	ApiBadRequest,
	/// HTTP 5xx.
	ApiServerError,
	/// Opaque upstream failure after status mapping.
	Provider,
	/// Response parsing failure.
	DataInvalid,
	/// Local configuration problem (transport construction, request building).
	Config,
	/// The caller cancelled or the deadline elapsed.
	Cancelled,
}
impl ErrorKind {
	/// Kinds retried by default when a policy does not override them.
	pub const DEFAULT_RETRYABLE: [ErrorKind; 4] =
		[ErrorKind::Network, ErrorKind::ApiRateLimit, ErrorKind::ApiServerError, ErrorKind::Provider];

	/// Returns `false` for kinds a retry can never fix, regardless of policy.
	pub const fn may_retry(self) -> bool {
		!matches!(
			self,
			ErrorKind::AuthFailed
				| ErrorKind::CredentialsMissing
				| ErrorKind::Validation
				| ErrorKind::Config
				| ErrorKind::Cancelled
		)
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorKind::Network => "network",
			ErrorKind::AuthFailed => "auth_failed",
			ErrorKind::CredentialsMissing => "credentials_missing",
			ErrorKind::Vault => "vault",
			ErrorKind::Validation => "validation",
			ErrorKind::ApiUnauthorized => "api_unauthorized",
			ErrorKind::ApiNotFound => "api_not_found",
			ErrorKind::ApiRateLimit => "api_rate_limit",
			ErrorKind::ApiBadRequest => "api_bad_request",
			ErrorKind::ApiServerError => "api_server_error",
			ErrorKind::Provider => "provider",
			ErrorKind::DataInvalid => "data_invalid",
			ErrorKind::Config => "config",
			ErrorKind::Cancelled => "cancelled",
		}
	}

	/// Maps a non-success HTTP status code into its kind.
	pub const fn from_status(status: u16) -> Self {
		match status {
			401 => ErrorKind::AuthFailed,
			403 => ErrorKind::ApiUnauthorized,
			404 | 410 => ErrorKind::ApiNotFound,
			429 => ErrorKind::ApiRateLimit,
			400..=499 => ErrorKind::ApiBadRequest,
			500..=599 => ErrorKind::ApiServerError,
			_ => ErrorKind::Provider,
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Classified error exposed by every public API of the crate.
#[derive(Debug)]
pub struct Error {
	kind: ErrorKind,
	message: String,
	provider: Option<Provider>,
	status: Option<u16>,
	body: Option<String>,
	retry_after: Option<Duration>,
	attempts: Option<u32>,
	source: Option<BoxError>,
}
impl Error {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates an error of the given kind with a human-readable message.
	pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
		Self {
			kind,
			message: message.into(),
			provider: None,
			status: None,
			body: None,
			retry_after: None,
			attempts: None,
			source: None,
		}
	}

	/// Transport-level failure wrapping the underlying cause.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::new(ErrorKind::Network, "Network error occurred while calling the provider.")
			.with_source(src)
	}

	/// Authentication failure with a reason.
	pub fn auth_failed(reason: impl Into<String>) -> Self {
		Self::new(ErrorKind::AuthFailed, reason)
	}

	/// Vault lookup miss for the provided key.
	pub fn credentials_missing(key: impl AsRef<str>) -> Self {
		Self::new(ErrorKind::CredentialsMissing, format!("Credentials missing for `{}`.", key.as_ref()))
	}

	/// Secure-storage failure.
	pub fn vault(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::Vault, message)
	}

	/// Invalid caller input.
	pub fn validation(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::Validation, message)
	}

	/// Local configuration failure.
	pub fn config(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::Config, message)
	}

	/// Response parsing failure.
	pub fn data_invalid(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::DataInvalid, message)
	}

	/// Caller cancellation.
	pub fn cancelled() -> Self {
		Self::new(ErrorKind::Cancelled, "Operation was cancelled.")
	}

	/// Deadline expiry, reported as a cancellation.
	pub fn deadline_exceeded() -> Self {
		Self::new(ErrorKind::Cancelled, "Operation deadline elapsed.")
	}

	/// Classifies a non-success HTTP response.
	pub fn from_status(status: u16, body: Option<String>) -> Self {
		let kind = ErrorKind::from_status(status);
		let err = Self::new(kind, format!("Provider responded with HTTP {status}."))
			.with_status(status);

		match body {
			Some(body) if !body.is_empty() => err.with_body(body),
			_ => err,
		}
	}

	/// Wraps `self` around another classified error, re-labelling its kind.
	pub fn wrap(kind: ErrorKind, message: impl Into<String>, inner: Error) -> Self {
		let provider = inner.provider;

		Self { provider, ..Self::new(kind, message) }.with_source(inner)
	}

	/// Attaches a provider tag.
	pub fn with_provider(mut self, provider: Provider) -> Self {
		self.provider = Some(provider);

		self
	}

	/// Attaches the underlying cause.
	pub fn with_source(mut self, src: impl 'static + Send + Sync + StdError) -> Self {
		self.source = Some(Box::new(src));

		self
	}

	/// Attaches the HTTP status code.
	pub fn with_status(mut self, status: u16) -> Self {
		self.status = Some(status);

		self
	}

	/// Attaches a response body preview, truncated to a bounded length.
	pub fn with_body(mut self, body: impl Into<String>) -> Self {
		self.body = Some(truncate_preview(body.into()));

		self
	}

	/// Attaches an upstream `Retry-After` hint.
	pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
		self.retry_after = Some(retry_after);

		self
	}

	/// Records how many attempts were made before giving up.
	pub fn with_attempts(mut self, attempts: u32) -> Self {
		self.attempts = Some(attempts);

		self
	}

	/// Classification of this error.
	pub fn kind(&self) -> ErrorKind {
		self.kind
	}

	/// Human-readable message without annotations.
	pub fn message(&self) -> &str {
		&self.message
	}

	/// Provider tag, when known.
	pub fn provider(&self) -> Option<Provider> {
		self.provider
	}

	/// HTTP status code, when the error came from a response.
	pub fn status(&self) -> Option<u16> {
		self.status
	}

	/// Truncated response body, when captured.
	pub fn body(&self) -> Option<&str> {
		self.body.as_deref()
	}

	/// Upstream `Retry-After` hint, when supplied.
	pub fn retry_after(&self) -> Option<Duration> {
		self.retry_after
	}

	/// Attempt count, set once retries are exhausted.
	pub fn attempts(&self) -> Option<u32> {
		self.attempts
	}

	/// Returns the wrapped classified error, if the cause is one.
	pub fn inner(&self) -> Option<&Error> {
		self.source.as_deref().and_then(|src| src.downcast_ref::<Error>())
	}
}
impl Display for Error {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		if let Some(provider) = self.provider {
			write!(f, "[{provider}] ")?;
		}

		f.write_str(&self.message)?;

		if let Some(attempts) = self.attempts {
			write!(f, " (gave up after {attempts} attempts)")?;
		}

		Ok(())
	}
}
impl StdError for Error {
	fn source(&self) -> Option<&(dyn StdError + 'static)> {
		self.source.as_deref().map(|src| src as &(dyn StdError + 'static))
	}
}
impl From<crate::store::SecretStoreError> for Error {
	fn from(e: crate::store::SecretStoreError) -> Self {
		Self::vault("Secure storage backend failed.").with_source(e)
	}
}
impl From<crate::http::TlsConfigError> for Error {
	fn from(e: crate::http::TlsConfigError) -> Self {
		// Bad cipher lists are caller input; everything else is a construction failure.
		let kind = match e {
			crate::http::TlsConfigError::UnknownCipherSuite { .. }
			| crate::http::TlsConfigError::NoCipherSuites { .. } => ErrorKind::Validation,
			crate::http::TlsConfigError::Rustls(_) => ErrorKind::Config,
		};

		Self::new(kind, "TLS configuration could not be built.").with_source(e)
	}
}

fn truncate_preview(body: String) -> String {
	if body.chars().count() <= Error::BODY_PREVIEW_LIMIT {
		return body;
	}

	let mut buf = String::new();

	for (idx, ch) in body.chars().enumerate() {
		if idx >= Error::BODY_PREVIEW_LIMIT {
			buf.push('…');

			break;
		}
		buf.push(ch);
	}

	buf
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn status_codes_map_to_kinds() {
		assert_eq!(ErrorKind::from_status(401), ErrorKind::AuthFailed);
		assert_eq!(ErrorKind::from_status(403), ErrorKind::ApiUnauthorized);
		assert_eq!(ErrorKind::from_status(404), ErrorKind::ApiNotFound);
		assert_eq!(ErrorKind::from_status(429), ErrorKind::ApiRateLimit);
		assert_eq!(ErrorKind::from_status(422), ErrorKind::ApiBadRequest);
		assert_eq!(ErrorKind::from_status(503), ErrorKind::ApiServerError);
		assert_eq!(ErrorKind::from_status(302), ErrorKind::Provider);
	}

	#[test]
	fn secrets_related_kinds_never_retry() {
		assert!(!ErrorKind::AuthFailed.may_retry());
		assert!(!ErrorKind::CredentialsMissing.may_retry());
		assert!(!ErrorKind::Validation.may_retry());
		assert!(ErrorKind::DEFAULT_RETRYABLE.iter().all(|kind| kind.may_retry()));
	}

	#[test]
	fn body_preview_is_truncated() {
		let err = Error::from_status(500, Some("x".repeat(1_000)));
		let body = err.body().expect("Body preview should be captured.");

		assert_eq!(body.chars().count(), Error::BODY_PREVIEW_LIMIT + 1);
		assert!(body.ends_with('…'));
	}

	#[test]
	fn display_includes_provider_and_attempts() {
		let err = Error::from_status(429, None).with_provider(Provider::Gemini).with_attempts(3);

		assert_eq!(err.to_string(), "[gemini] Provider responded with HTTP 429. (gave up after 3 attempts)");
	}

	#[test]
	fn wrapped_error_exposes_inner_classification() {
		let inner = Error::credentials_missing("jira-token").with_provider(Provider::Jira);
		let outer = Error::wrap(ErrorKind::AuthFailed, "Jira credentials unavailable.", inner);

		assert_eq!(outer.kind(), ErrorKind::AuthFailed);
		assert_eq!(outer.provider(), Some(Provider::Jira));
		assert_eq!(
			outer.inner().map(Error::kind),
			Some(ErrorKind::CredentialsMissing),
			"Wrapped error must keep the vault classification as its source."
		);
	}
}
