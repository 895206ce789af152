//! Per-provider token-bucket rate limiter shared by every call to that provider.
//!
//! The bucket holds `capacity` permits. A granted permit returns to the bucket exactly one
//! `window` after it was handed out, so no sliding window of that length ever admits more than
//! `capacity` calls. Waiters queue on a FIFO [`tokio::sync::Mutex`], which grants permits in
//! arrival order; a waiter that is cancelled leaves the queue without consuming anything.

// std
use std::collections::VecDeque;
// crates.io
use tokio::{
	sync::Mutex as FairMutex,
	time::{self, Instant},
};
// self
use crate::{_prelude::*, config::RateLimitConfig, context::Context, obs, provider::Provider};

/// Token-bucket limiter bounding outbound call frequency.
#[derive(Debug)]
pub struct RateLimiter {
	capacity: usize,
	window: Duration,
	provider: Option<Provider>,
	state: FairMutex<BucketState>,
}
impl RateLimiter {
	/// Creates a limiter admitting `capacity` calls per `window`.
	pub fn new(capacity: u32, window: Duration) -> Result<Self> {
		if capacity == 0 {
			return Err(Error::validation("Rate limit capacity must be at least 1."));
		}
		if window.is_zero() {
			return Err(Error::validation("Rate limit window must be longer than zero."));
		}

		let capacity = usize::try_from(capacity)
			.map_err(|_| Error::validation("Rate limit capacity exceeds the platform limit."))?;

		Ok(Self {
			capacity,
			window,
			provider: None,
			state: FairMutex::new(BucketState::new(capacity)),
		})
	}

	/// Builds a limiter from a provider config.
	pub fn from_config(config: &RateLimitConfig) -> Result<Self> {
		Self::new(config.requests, config.window)
	}

	/// Tags wait metrics and logs with the provider.
	pub fn for_provider(mut self, provider: Provider) -> Self {
		self.provider = Some(provider);

		self
	}

	/// Maximum calls admitted per window.
	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Window length.
	pub fn window(&self) -> Duration {
		self.window
	}

	/// Waits for a permit, the context's deadline, or its cancellation, whichever comes first.
	///
	/// On cancellation no permit is consumed.
	pub async fn acquire(&self, ctx: &Context) -> Result<()> {
		ctx.run(self.acquire_in_order()).await
	}

	/// Takes a permit only if one is free right now and nobody is queued ahead.
	pub fn try_acquire(&self) -> bool {
		let Ok(mut state) = self.state.try_lock() else {
			return false;
		};

		state.try_take(Instant::now(), self.window, self.capacity)
	}

	/// Permits free at this instant, or `0` while waiters hold the queue.
	pub fn available(&self) -> usize {
		self.snapshot().map(|state| state.tokens).unwrap_or(0)
	}

	/// Point-in-time view of the bucket, or `None` while a waiter holds the queue.
	pub fn snapshot(&self) -> Option<RateLimiterState> {
		let mut state = self.state.try_lock().ok()?;

		state.reclaim(Instant::now(), self.window);

		Some(RateLimiterState {
			capacity: self.capacity,
			window: self.window,
			tokens: self.capacity - state.outstanding.len(),
			last_refill: state.last_refill,
		})
	}

	async fn acquire_in_order(&self) {
		let mut state = self.state.lock().await;
		let mut waited = false;

		loop {
			let now = Instant::now();

			if state.try_take(now, self.window, self.capacity) {
				if waited {
					obs::record_rate_limit_wait(self.provider);
				}

				return;
			}

			// The queue is full: the oldest outstanding permit is the next one back.
			let next_free = state
				.outstanding
				.front()
				.map(|granted| *granted + self.window)
				.unwrap_or(now);

			waited = true;

			time::sleep_until(next_free).await;
		}
	}
}

/// Observable bucket accounting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimiterState {
	/// Maximum calls per window.
	pub capacity: usize,
	/// Window length.
	pub window: Duration,
	/// Permits currently free.
	pub tokens: usize,
	/// When a permit last returned to the bucket.
	pub last_refill: Option<Instant>,
}

#[derive(Debug)]
struct BucketState {
	/// Grant instants of permits still inside the window, oldest first.
	outstanding: VecDeque<Instant>,
	last_refill: Option<Instant>,
}
impl BucketState {
	fn new(capacity: usize) -> Self {
		Self { outstanding: VecDeque::with_capacity(capacity), last_refill: None }
	}

	fn reclaim(&mut self, now: Instant, window: Duration) {
		while let Some(granted) = self.outstanding.front() {
			if now.saturating_duration_since(*granted) < window {
				break;
			}

			self.outstanding.pop_front();
			self.last_refill = Some(now);
		}
	}

	fn try_take(&mut self, now: Instant, window: Duration, capacity: usize) -> bool {
		self.reclaim(now, window);

		if self.outstanding.len() >= capacity {
			return false;
		}

		self.outstanding.push_back(now);

		true
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn construction_rejects_degenerate_limits() {
		let err = RateLimiter::new(0, Duration::from_secs(1)).expect_err("Zero capacity is invalid.");

		assert_eq!(err.kind(), ErrorKind::Validation);

		let err = RateLimiter::new(1, Duration::ZERO).expect_err("Zero window is invalid.");

		assert_eq!(err.kind(), ErrorKind::Validation);
	}

	#[tokio::test]
	async fn try_acquire_stops_at_capacity() {
		let limiter =
			RateLimiter::new(3, Duration::from_secs(60)).expect("Limiter fixture should build.");

		assert!(limiter.try_acquire());
		assert!(limiter.try_acquire());
		assert!(limiter.try_acquire());
		assert!(!limiter.try_acquire(), "Fourth permit inside the window must be refused.");
		assert_eq!(limiter.available(), 0);
	}

	#[tokio::test]
	async fn permits_return_after_window() {
		let limiter =
			RateLimiter::new(1, Duration::from_millis(40)).expect("Limiter fixture should build.");

		assert!(limiter.try_acquire());
		assert!(!limiter.try_acquire());

		time::sleep(Duration::from_millis(60)).await;

		assert!(limiter.try_acquire(), "Permit must be reclaimed once the window has passed.");

		let state = limiter.snapshot().expect("Idle limiter should expose its state.");

		assert_eq!(state.tokens, 0);
		assert!(state.last_refill.is_some());
	}

	#[tokio::test]
	async fn cancelled_waiter_consumes_nothing() {
		let limiter =
			RateLimiter::new(1, Duration::from_secs(60)).expect("Limiter fixture should build.");
		let ctx = Context::new();

		limiter.acquire(&ctx).await.expect("First permit should be granted immediately.");

		let short = Context::new().with_timeout(Duration::from_millis(20));
		let err = limiter.acquire(&short).await.expect_err("Second permit must time out.");

		assert_eq!(err.kind(), ErrorKind::Cancelled);

		let state = limiter.state.lock().await;

		assert_eq!(state.outstanding.len(), 1, "Cancelled waiter must not hold a permit.");
	}
}
