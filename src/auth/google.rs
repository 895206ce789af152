//! Google APIs: OAuth bearer tokens, refreshed from the stored refresh token when needed.

// crates.io
use reqwest::{Method, Request, header::AUTHORIZATION};
use zeroize::Zeroizing;
// self
use crate::{
	_prelude::*,
	auth::{self, AuthFuture, Authenticator},
	context::Context,
	http::AuthTransport,
	provider::{self as provider_config, GoogleConfig, Provider},
	vault::{CredentialKey, CredentialVault, SecretValue},
};

#[derive(Deserialize)]
struct RefreshResponse {
	access_token: String,
	#[serde(default)]
	refresh_token: Option<String>,
}

/// Injects `Authorization: Bearer <access token>`.
#[derive(Debug)]
pub struct GoogleAuthenticator {
	config: GoogleConfig,
	vault: Arc<CredentialVault>,
	transport: Arc<AuthTransport>,
}
impl GoogleAuthenticator {
	const IDENTITY_PATH: &'static str = "oauth2/v3/userinfo";

	/// Creates the authenticator.
	pub fn new(
		config: GoogleConfig,
		vault: Arc<CredentialVault>,
		transport: Arc<AuthTransport>,
	) -> Self {
		Self { config, vault, transport }
	}

	/// Connection settings.
	pub fn config(&self) -> &GoogleConfig {
		&self.config
	}

	/// Exchanges the stored refresh token for a new access token and stores it, along with any
	/// rotated refresh token.
	pub async fn refresh_access_token(&self, ctx: &Context) -> Result<SecretValue> {
		let credentials = self
			.vault
			.google_credentials()
			.map_err(|e| auth::credentials_unavailable(Provider::Google, e))?;
		let Some(refresh_token) = credentials.refresh_token else {
			return Err(auth::credentials_unavailable(
				Provider::Google,
				Error::credentials_missing(CredentialKey::GoogleRefreshToken),
			));
		};
		let form = [
			("grant_type", "refresh_token"),
			("refresh_token", refresh_token.expose()),
			("client_id", self.config.client_id.as_str()),
			("client_secret", credentials.client_secret.expose()),
		];
		let request = AuthTransport::build(
			self.transport.request(Method::POST, self.config.token_endpoint.clone()).form(&form),
		)?;
		let response = ctx
			.run(self.transport.send_checked(request))
			.await?
			.map_err(|e| match e.status() {
				Some(400 | 401) => Error::wrap(
					ErrorKind::AuthFailed,
					"Google rejected the stored refresh token.",
					e,
				),
				_ => e,
			})
			.map_err(|e| e.with_provider(Provider::Google))?;
		let payload: RefreshResponse = AuthTransport::read_json(response)
			.await
			.map_err(|e| e.with_provider(Provider::Google))?;
		let access_token = Zeroizing::new(payload.access_token);

		self.vault.store(CredentialKey::GoogleAccessToken, &access_token)?;

		if let Some(rotated) = payload.refresh_token.map(Zeroizing::new).filter(|t| !t.is_empty()) {
			self.vault.store(CredentialKey::GoogleRefreshToken, &rotated)?;
		}

		Ok(SecretValue::new(access_token.as_str()))
	}
}
impl Authenticator for GoogleAuthenticator {
	fn provider(&self) -> Provider {
		Provider::Google
	}

	fn add_auth_headers(&self, request: &mut Request) -> Result<()> {
		let access_token = self
			.vault
			.get(CredentialKey::GoogleAccessToken)
			.map_err(|e| auth::credentials_unavailable(Provider::Google, e))?;
		let header = Zeroizing::new(format!("Bearer {}", access_token.expose()));

		request
			.headers_mut()
			.insert(AUTHORIZATION, auth::sensitive_header(Provider::Google, &header)?);

		Ok(())
	}

	fn validate_credentials<'a>(&'a self, ctx: &'a Context) -> AuthFuture<'a, ()> {
		Box::pin(async move {
			let needs_refresh = !self
				.vault
				.has(CredentialKey::GoogleAccessToken)
				.map_err(|e| auth::credentials_unavailable(Provider::Google, e))?
				&& self
					.vault
					.has(CredentialKey::GoogleRefreshToken)
					.map_err(|e| auth::credentials_unavailable(Provider::Google, e))?;

			if needs_refresh {
				self.refresh_access_token(ctx).await?;
			}

			let url = provider_config::endpoint(&self.config.api_base, Self::IDENTITY_PATH)?;
			let mut request = AuthTransport::build(self.transport.request(Method::GET, url))?;

			self.add_auth_headers(&mut request)?;

			auth::probe_identity(&self.transport, ctx, Provider::Google, request).await
		})
	}
}
