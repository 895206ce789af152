//! Composition root wiring the transport, vault, authenticators, and per-provider executors.

// crates.io
use reqwest::{Request, Response};
// self
use crate::{
	_prelude::*,
	auth::{Authenticator, GeminiAuthenticator, GoogleAuthenticator, JiraAuthenticator},
	config::{ManagerConfig, ProviderLimits},
	context::Context,
	http::AuthTransport,
	obs::CallSpan,
	provider::Provider,
	rate_limit::RateLimiter,
	retry::{RetryExecutor, RetryPolicy},
	store::SecretStore,
	vault::CredentialVault,
};

/// Retry executor paired with the policy it applies.
#[derive(Clone, Debug)]
struct ProviderLane {
	executor: RetryExecutor,
	policy: RetryPolicy,
}
impl ProviderLane {
	fn build(provider: Provider, limits: &ProviderLimits) -> Result<Self> {
		limits.retry.validate().map_err(|e| e.with_provider(provider))?;

		let limiter = RateLimiter::from_config(&limits.rate_limit)
			.map_err(|e| e.with_provider(provider))?
			.for_provider(provider);

		Ok(Self {
			executor: RetryExecutor::new(Arc::new(limiter)).for_provider(provider),
			policy: limits.retry.clone(),
		})
	}
}

/// Process-wide owner of every request-core component.
#[derive(Debug)]
pub struct AuthManager {
	transport: Arc<AuthTransport>,
	vault: Arc<CredentialVault>,
	jira: JiraAuthenticator,
	gemini: GeminiAuthenticator,
	google: GoogleAuthenticator,
	jira_lane: ProviderLane,
	gemini_lane: ProviderLane,
	google_lane: ProviderLane,
}
impl AuthManager {
	/// Builds every component from `config`, persisting credentials through `store`.
	pub fn new(config: ManagerConfig, store: Arc<dyn SecretStore>) -> Result<Self> {
		let transport = Arc::new(AuthTransport::new(&config.auth)?);

		Self::with_transport(config, store, transport)
	}

	/// Same as [`AuthManager::new`] with a caller-supplied transport.
	pub fn with_transport(
		config: ManagerConfig,
		store: Arc<dyn SecretStore>,
		transport: Arc<AuthTransport>,
	) -> Result<Self> {
		let vault = Arc::new(CredentialVault::new(store));
		let jira_lane = ProviderLane::build(Provider::Jira, &config.jira.limits)?;
		let gemini_lane = ProviderLane::build(Provider::Gemini, &config.gemini.limits)?;
		let google_lane = ProviderLane::build(Provider::Google, &config.google.limits)?;

		Ok(Self {
			jira: JiraAuthenticator::new(config.jira, vault.clone(), transport.clone()),
			gemini: GeminiAuthenticator::new(config.gemini, vault.clone(), transport.clone()),
			google: GoogleAuthenticator::new(config.google, vault.clone(), transport.clone()),
			transport,
			vault,
			jira_lane,
			gemini_lane,
			google_lane,
		})
	}

	/// Shared HTTP transport.
	pub fn http_client(&self) -> &Arc<AuthTransport> {
		&self.transport
	}

	/// Shared credential vault.
	pub fn credential_store(&self) -> &Arc<CredentialVault> {
		&self.vault
	}

	/// Jira authenticator.
	pub fn jira_authenticator(&self) -> &JiraAuthenticator {
		&self.jira
	}

	/// Gemini authenticator.
	pub fn gemini_authenticator(&self) -> &GeminiAuthenticator {
		&self.gemini
	}

	/// Google authenticator.
	pub fn google_authenticator(&self) -> &GoogleAuthenticator {
		&self.google
	}

	/// Authenticator for `provider` as a trait object.
	pub fn authenticator(&self, provider: Provider) -> &dyn Authenticator {
		match provider {
			Provider::Jira => &self.jira,
			Provider::Gemini => &self.gemini,
			Provider::Google => &self.google,
		}
	}

	/// Retry executor (and its rate limiter) for `provider`.
	pub fn executor(&self, provider: Provider) -> &RetryExecutor {
		&self.lane(provider).executor
	}

	/// Retry policy configured for `provider`.
	pub fn retry_policy(&self, provider: Provider) -> &RetryPolicy {
		&self.lane(provider).policy
	}

	/// Checks vault presence for every required secret, then validates each provider live in
	/// order, stopping at the first failure.
	pub async fn validate_all_credentials(&self, ctx: &Context) -> Result<()> {
		self.vault.validate_all_credentials()?;

		for provider in Provider::ALL {
			CallSpan::new(Some(provider), "validate_credentials")
				.instrument(self.authenticator(provider).validate_credentials(ctx))
				.await
				.map_err(|e| e.with_provider(provider))?;
		}

		Ok(())
	}

	/// Builds, authenticates, and sends a request through the provider's executor, retrying per
	/// its policy. `build` runs once per attempt.
	pub async fn send_authenticated<F>(
		&self,
		ctx: &Context,
		provider: Provider,
		mut build: F,
	) -> Result<Response>
	where
		F: FnMut(&AuthTransport) -> Result<Request>,
	{
		let lane = self.lane(provider);
		let authenticator = self.authenticator(provider);

		lane.executor
			.execute(ctx, &lane.policy, || {
				let prepared = build(&self.transport).and_then(|mut request| {
					authenticator.add_auth_headers(&mut request)?;

					Ok(request)
				});

				async move { self.transport.send_checked(prepared?).await }
			})
			.await
	}

	fn lane(&self, provider: Provider) -> &ProviderLane {
		match provider {
			Provider::Jira => &self.jira_lane,
			Provider::Gemini => &self.gemini_lane,
			Provider::Google => &self.google_lane,
		}
	}
}
