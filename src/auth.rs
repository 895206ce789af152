//! Per-provider authenticators: credential injection and live self-validation.
//!
//! Each [`Authenticator`] holds shared handles to the [`crate::vault::CredentialVault`] and the
//! [`AuthTransport`]. Header values built from credentials are always marked sensitive so they
//! never show up in `Debug` output of the request.

pub mod gemini;
pub mod google;
pub mod jira;

pub use gemini::GeminiAuthenticator;
pub use google::GoogleAuthenticator;
pub use jira::JiraAuthenticator;

// crates.io
use reqwest::{Request, header::HeaderValue};
// self
use crate::{
	_prelude::*,
	context::Context,
	http::AuthTransport,
	provider::Provider,
};

/// Boxed future returned by authenticator methods.
pub type AuthFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Strategy injecting and validating one provider's credentials.
pub trait Authenticator
where
	Self: Send + Sync,
{
	/// Provider served by this authenticator.
	fn provider(&self) -> Provider;

	/// Reads the provider's credentials from the vault and attaches them to `request`.
	///
	/// Vault failures surface as [`ErrorKind::AuthFailed`] with the vault error as the source.
	fn add_auth_headers(&self, request: &mut Request) -> Result<()>;

	/// Performs one authenticated identity call. 401/403 map to [`ErrorKind::AuthFailed`]; any
	/// other non-2xx maps to [`ErrorKind::Validation`].
	fn validate_credentials<'a>(&'a self, ctx: &'a Context) -> AuthFuture<'a, ()>;
}

/// Wraps a vault failure so callers see an authentication problem with the cause attached.
pub(crate) fn credentials_unavailable(provider: Provider, err: Error) -> Error {
	Error::wrap(ErrorKind::AuthFailed, format!("{provider} credentials are unavailable."), err)
		.with_provider(provider)
}

/// Builds a header value that is redacted from `Debug` output.
pub(crate) fn sensitive_header(provider: Provider, value: &str) -> Result<HeaderValue> {
	let mut header = HeaderValue::from_str(value).map_err(|e| {
		Error::auth_failed(format!("{provider} credential contains characters invalid in a header."))
			.with_provider(provider)
			.with_source(e)
	})?;

	header.set_sensitive(true);

	Ok(header)
}

/// Sends an identity probe and maps its status to the validation outcome.
pub(crate) async fn probe_identity(
	transport: &AuthTransport,
	ctx: &Context,
	provider: Provider,
	request: Request,
) -> Result<()> {
	let response =
		ctx.run(transport.send(request)).await?.map_err(|e| e.with_provider(provider))?;
	let status = response.status();

	if status.is_success() {
		return Ok(());
	}

	let code = status.as_u16();
	let err = match code {
		401 | 403 => Error::auth_failed(format!("{provider} rejected the stored credentials.")),
		_ => Error::validation(format!(
			"{provider} credential check failed with HTTP {code}."
		)),
	};

	Err(err.with_provider(provider).with_status(code))
}

