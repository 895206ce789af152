// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicU32, Ordering},
	},
	time::{Duration, Instant},
};
// crates.io
use httpmock::prelude::*;
// self
use relay_core::{
	config::ManagerConfig,
	context::Context,
	error::ErrorKind,
	http::AuthTransport,
	manager::AuthManager,
	provider::{GeminiConfig, GoogleConfig, JiraConfig, Provider},
	reqwest::{Client, Method},
	retry::RetryPolicy,
	store::MemoryStore,
	url::Url,
	vault::JiraCredentials,
};

fn manager(server: &MockServer, retry: RetryPolicy) -> AuthManager {
	let base = Url::parse(&server.base_url()).expect("Mock server URL should parse.");
	let mut jira = JiraConfig::new(base.clone(), "dev@example.com");

	jira.limits.retry = retry;

	let config = ManagerConfig::new(
		jira,
		GeminiConfig::new(base.clone()),
		GoogleConfig::new("client-123"),
	);
	let transport = Arc::new(AuthTransport::with_client(Client::new()));
	let manager =
		AuthManager::with_transport(config, Arc::new(MemoryStore::default()), transport)
			.expect("Manager should build against the mock server.");

	manager
		.credential_store()
		.set_jira_credentials(&JiraCredentials { token: "tok".into() })
		.expect("Fixture credentials should store.");

	manager
}

#[tokio::test]
async fn rate_limited_twice_then_success() {
	let server = MockServer::start_async().await;
	let first = server
		.mock_async(|when, then| {
			when.method(GET).path("/rest/api/3/search").header("x-attempt", "1");
			then.status(429).body("slow down");
		})
		.await;
	let second = server
		.mock_async(|when, then| {
			when.method(GET).path("/rest/api/3/search").header("x-attempt", "2");
			then.status(429).body("slow down");
		})
		.await;
	let success = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/rest/api/3/search")
				.header("x-attempt", "3")
				.header_exists("authorization");
			then.status(200).header("content-type", "application/json").body("{\"issues\":[]}");
		})
		.await;
	let policy = RetryPolicy::new(3)
		.with_delays(Duration::from_millis(10), Duration::from_secs(1))
		.with_jitter(0.0);
	let manager = manager(&server, policy);
	let url = Url::parse(&server.url("/rest/api/3/search")).expect("Mock URL should parse.");
	let attempts = AtomicU32::new(0);
	let started = Instant::now();
	let response = manager
		.send_authenticated(&Context::new(), Provider::Jira, |transport| {
			let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;

			AuthTransport::build(
				transport.request(Method::GET, url.clone()).header("x-attempt", attempt.to_string()),
			)
		})
		.await
		.expect("Third attempt should succeed.");

	assert_eq!(response.status().as_u16(), 200);
	assert_eq!(attempts.load(Ordering::SeqCst), 3);
	assert!(
		started.elapsed() >= Duration::from_millis(30),
		"Two backoffs of 10ms and 20ms must elapse before the third attempt."
	);

	first.assert_calls_async(1).await;
	second.assert_calls_async(1).await;
	success.assert_calls_async(1).await;
}

#[tokio::test]
async fn unauthorized_is_not_retried() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/rest/api/3/search");
			then.status(401).body("{\"errorMessages\":[\"bad token\"]}");
		})
		.await;
	let manager = manager(&server, RetryPolicy::new(5).with_delays(
		Duration::from_millis(10),
		Duration::from_millis(50),
	));
	let url = Url::parse(&server.url("/rest/api/3/search")).expect("Mock URL should parse.");
	let err = manager
		.send_authenticated(&Context::new(), Provider::Jira, |transport| {
			AuthTransport::build(transport.request(Method::GET, url.clone()))
		})
		.await
		.expect_err("401 must fail.");

	assert_eq!(err.kind(), ErrorKind::AuthFailed);
	assert_eq!(err.status(), Some(401));
	assert_eq!(err.provider(), Some(Provider::Jira));
	assert!(err.body().is_some_and(|body| body.contains("bad token")));

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn exhausted_retries_report_attempts_and_retry_after() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/rest/api/3/search");
			then.status(503).header("retry-after", "0");
		})
		.await;
	let manager = manager(&server, RetryPolicy::new(2).with_delays(
		Duration::from_millis(5),
		Duration::from_millis(20),
	));
	let url = Url::parse(&server.url("/rest/api/3/search")).expect("Mock URL should parse.");
	let err = manager
		.send_authenticated(&Context::new(), Provider::Jira, |transport| {
			AuthTransport::build(transport.request(Method::GET, url.clone()))
		})
		.await
		.expect_err("Persistent 503 must fail.");

	assert_eq!(err.kind(), ErrorKind::ApiServerError);
	assert_eq!(err.attempts(), Some(2));
	assert_eq!(err.retry_after(), Some(Duration::ZERO));

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn missing_credentials_never_reach_the_network() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.path("/rest/api/3/search");
			then.status(200);
		})
		.await;
	let manager = manager(&server, RetryPolicy::default());

	manager.credential_store().clear_all_credentials().expect("Clearing should succeed.");

	let url = Url::parse(&server.url("/rest/api/3/search")).expect("Mock URL should parse.");
	let err = manager
		.send_authenticated(&Context::new(), Provider::Jira, |transport| {
			AuthTransport::build(transport.request(Method::GET, url.clone()))
		})
		.await
		.expect_err("Missing token must fail.");

	assert_eq!(err.kind(), ErrorKind::AuthFailed);
	assert_eq!(err.inner().map(|inner| inner.kind()), Some(ErrorKind::CredentialsMissing));

	mock.assert_calls_async(0).await;
}
