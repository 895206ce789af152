//! Jira Cloud: HTTP basic auth with the account e-mail and API token.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use reqwest::{Method, Request, header::AUTHORIZATION};
use zeroize::Zeroizing;
// self
use crate::{
	_prelude::*,
	auth::{self, AuthFuture, Authenticator},
	context::Context,
	http::AuthTransport,
	provider::{self as provider_config, JiraConfig, Provider},
	vault::CredentialVault,
};

/// Injects `Authorization: Basic base64(email:token)`.
#[derive(Debug)]
pub struct JiraAuthenticator {
	config: JiraConfig,
	vault: Arc<CredentialVault>,
	transport: Arc<AuthTransport>,
}
impl JiraAuthenticator {
	const IDENTITY_PATH: &'static str = "rest/api/3/myself";

	/// Creates the authenticator.
	pub fn new(config: JiraConfig, vault: Arc<CredentialVault>, transport: Arc<AuthTransport>) -> Self {
		Self { config, vault, transport }
	}

	/// Connection settings.
	pub fn config(&self) -> &JiraConfig {
		&self.config
	}
}
impl Authenticator for JiraAuthenticator {
	fn provider(&self) -> Provider {
		Provider::Jira
	}

	fn add_auth_headers(&self, request: &mut Request) -> Result<()> {
		let credentials = self
			.vault
			.jira_credentials()
			.map_err(|e| auth::credentials_unavailable(Provider::Jira, e))?;
		let pair = Zeroizing::new(format!("{}:{}", self.config.email, credentials.token.expose()));
		let header = Zeroizing::new(format!("Basic {}", BASE64.encode(pair.as_bytes())));

		request.headers_mut().insert(AUTHORIZATION, auth::sensitive_header(Provider::Jira, &header)?);

		Ok(())
	}

	fn validate_credentials<'a>(&'a self, ctx: &'a Context) -> AuthFuture<'a, ()> {
		Box::pin(async move {
			let url = provider_config::endpoint(&self.config.base_url, Self::IDENTITY_PATH)?;
			let mut request = AuthTransport::build(self.transport.request(Method::GET, url))?;

			self.add_auth_headers(&mut request)?;

			auth::probe_identity(&self.transport, ctx, Provider::Jira, request).await
		})
	}
}
