//! Gemini API: `x-goog-api-key` header.

// crates.io
use reqwest::{Method, Request, header::HeaderName};
// self
use crate::{
	_prelude::*,
	auth::{self, AuthFuture, Authenticator},
	context::Context,
	http::AuthTransport,
	provider::{self as provider_config, GeminiConfig, Provider},
	vault::CredentialVault,
};

/// Injects the stored API key.
#[derive(Debug)]
pub struct GeminiAuthenticator {
	config: GeminiConfig,
	vault: Arc<CredentialVault>,
	transport: Arc<AuthTransport>,
}
impl GeminiAuthenticator {
	/// Header carrying the API key.
	pub const API_KEY_HEADER: &'static str = "x-goog-api-key";
	const IDENTITY_PATH: &'static str = "v1beta/models";

	/// Creates the authenticator.
	pub fn new(
		config: GeminiConfig,
		vault: Arc<CredentialVault>,
		transport: Arc<AuthTransport>,
	) -> Self {
		Self { config, vault, transport }
	}

	/// Connection settings.
	pub fn config(&self) -> &GeminiConfig {
		&self.config
	}
}
impl Authenticator for GeminiAuthenticator {
	fn provider(&self) -> Provider {
		Provider::Gemini
	}

	fn add_auth_headers(&self, request: &mut Request) -> Result<()> {
		let credentials = self
			.vault
			.gemini_credentials()
			.map_err(|e| auth::credentials_unavailable(Provider::Gemini, e))?;

		request.headers_mut().insert(
			HeaderName::from_static(Self::API_KEY_HEADER),
			auth::sensitive_header(Provider::Gemini, credentials.api_key.expose())?,
		);

		Ok(())
	}

	fn validate_credentials<'a>(&'a self, ctx: &'a Context) -> AuthFuture<'a, ()> {
		Box::pin(async move {
			let mut url = provider_config::endpoint(&self.config.base_url, Self::IDENTITY_PATH)?;

			url.query_pairs_mut().append_pair("pageSize", "1");

			let mut request = AuthTransport::build(self.transport.request(Method::GET, url))?;

			self.add_auth_headers(&mut request)?;

			auth::probe_identity(&self.transport, ctx, Provider::Gemini, request).await
		})
	}
}
