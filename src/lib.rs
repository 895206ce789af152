//! Resilient request core for tracker-to-docs automation: a FIFO token-bucket rate limiter,
//! classified retries, an AES-GCM credential vault, per-provider authenticators, and a
//! TLS-hardened authenticated transport, wired together by one manager.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod manager;
pub mod obs;
pub mod provider;
pub mod rate_limit;
pub mod retry;
pub mod store;
pub mod vault;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::ManagerConfig,
		http::AuthTransport,
		manager::AuthManager,
		provider::{GeminiConfig, GoogleConfig, JiraConfig},
		store::MemoryStore,
		vault::CredentialVault,
	};

	/// Plain reqwest transport for talking to `httpmock` over HTTP.
	pub fn test_transport() -> Arc<AuthTransport> {
		let client = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.expect("Failed to build reqwest client for tests.");

		Arc::new(AuthTransport::with_client(client))
	}

	/// Vault over a fresh in-memory store, returned with the store for raw inspection.
	pub fn memory_vault() -> (Arc<CredentialVault>, MemoryStore) {
		let store = MemoryStore::default();

		(Arc::new(CredentialVault::new(Arc::new(store.clone()))), store)
	}

	/// Manager config whose every endpoint points at `base`.
	pub fn test_manager_config(base: &str) -> ManagerConfig {
		let base = Url::parse(base).expect("Mock server URL should parse.");
		let token_endpoint = base.join("token").expect("Mock token URL should parse.");

		ManagerConfig::new(
			JiraConfig::new(base.clone(), "dev@example.com"),
			GeminiConfig::new(base.clone()),
			GoogleConfig::new("client-123").with_endpoints(base, token_endpoint),
		)
	}

	/// Manager wired to `base` with the test transport and an in-memory store.
	pub fn build_test_manager(base: &str) -> (AuthManager, MemoryStore) {
		let store = MemoryStore::default();
		let manager = AuthManager::with_transport(
			test_manager_config(base),
			Arc::new(store.clone()),
			test_transport(),
		)
		.expect("Test manager should build.");

		(manager, store)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, ErrorKind, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
