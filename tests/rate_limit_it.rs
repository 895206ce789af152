// std
use std::{
	sync::Arc,
	time::{Duration, Instant},
};
// crates.io
use tokio::sync::Mutex;
// self
use relay_core::{context::Context, error::ErrorKind, rate_limit::RateLimiter};

#[tokio::test]
async fn concurrent_callers_never_exceed_capacity_per_window() {
	let window = Duration::from_millis(100);
	let limiter =
		Arc::new(RateLimiter::new(3, window).expect("Limiter fixture should build."));
	let grants = Arc::new(Mutex::new(Vec::new()));
	let started = Instant::now();
	let handles = (0..10)
		.map(|_| {
			let limiter = limiter.clone();
			let grants = grants.clone();

			tokio::spawn(async move {
				limiter.acquire(&Context::new()).await.expect("Uncancelled acquire should succeed.");
				grants.lock().await.push(Instant::now());
			})
		})
		.collect::<Vec<_>>();

	for handle in handles {
		handle.await.expect("Acquiring task should not panic.");
	}

	assert!(
		started.elapsed() >= Duration::from_millis(300),
		"Ten calls at three per 100ms need at least three full windows."
	);

	let mut grants = grants.lock().await.clone();

	grants.sort();

	for pair in grants.windows(4) {
		assert!(
			pair[3].duration_since(pair[0]) + Duration::from_millis(2) >= window,
			"Four grants landed inside one window."
		);
	}
}

#[tokio::test]
async fn cancelled_waiter_releases_its_place() {
	let limiter = Arc::new(
		RateLimiter::new(1, Duration::from_millis(200)).expect("Limiter fixture should build."),
	);

	limiter.acquire(&Context::new()).await.expect("First permit should be immediate.");

	let ctx = Context::new();
	let waiter = {
		let limiter = limiter.clone();
		let ctx = ctx.clone();

		tokio::spawn(async move { limiter.acquire(&ctx).await })
	};

	tokio::time::sleep(Duration::from_millis(20)).await;
	ctx.cancel();

	let err = waiter
		.await
		.expect("Waiting task should not panic.")
		.expect_err("Cancelled waiter must not receive a permit.");

	assert_eq!(err.kind(), ErrorKind::Cancelled);

	tokio::time::sleep(Duration::from_millis(220)).await;

	assert_eq!(limiter.available(), 1, "The cancelled waiter must not have consumed a permit.");
}
