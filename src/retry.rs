//! Classified, bounded, backed-off retries gated by a provider's rate limiter.

// std
use std::collections::BTreeSet;
// crates.io
use rand::Rng;
// self
use crate::{
	_prelude::*,
	config::duration_ms,
	context::Context,
	obs::{self, CallSpan},
	provider::Provider,
	rate_limit::RateLimiter,
};

/// Retry/backoff parameters for one provider.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
	/// Total attempts including the first; at least 1.
	pub max_attempts: u32,
	/// Delay after the first failed attempt.
	#[serde(with = "duration_ms")]
	pub base_delay: Duration,
	/// Upper bound on any single delay.
	#[serde(with = "duration_ms")]
	pub max_delay: Duration,
	/// Growth factor between consecutive delays; at least 1.0.
	pub multiplier: f64,
	/// Extra random delay as a fraction of the computed delay, in `[0, 1]`.
	pub jitter: f64,
	/// Error kinds worth another attempt.
	pub retryable_kinds: BTreeSet<ErrorKind>,
}
impl RetryPolicy {
	/// Creates the default policy with a custom attempt budget.
	pub fn new(max_attempts: u32) -> Self {
		Self { max_attempts, ..Self::default() }
	}

	/// Policy that never retries.
	pub fn no_retry() -> Self {
		Self::new(1)
	}

	/// Overrides the base and max delays.
	pub fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
		self.base_delay = base_delay;
		self.max_delay = max_delay;

		self
	}

	/// Overrides the backoff multiplier.
	pub fn with_multiplier(mut self, multiplier: f64) -> Self {
		self.multiplier = multiplier;

		self
	}

	/// Overrides the jitter fraction.
	pub fn with_jitter(mut self, jitter: f64) -> Self {
		self.jitter = jitter;

		self
	}

	/// Replaces the retryable kind set.
	pub fn with_retryable_kinds(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
		self.retryable_kinds = kinds.into_iter().collect();

		self
	}

	/// Checks the policy invariants.
	pub fn validate(&self) -> Result<()> {
		if self.max_attempts == 0 {
			return Err(Error::validation("Retry policy needs at least one attempt."));
		}
		if !self.multiplier.is_finite() || self.multiplier < 1.0 {
			return Err(Error::validation("Retry multiplier must be a finite value of at least 1.0."));
		}
		if !(0.0..=1.0).contains(&self.jitter) {
			return Err(Error::validation("Retry jitter must lie within [0, 1]."));
		}
		if self.base_delay > self.max_delay {
			return Err(Error::validation("Retry base delay cannot exceed the max delay."));
		}

		Ok(())
	}

	/// Whether another attempt could fix an error of this kind.
	pub fn is_retryable(&self, kind: ErrorKind) -> bool {
		kind.may_retry() && self.retryable_kinds.contains(&kind)
	}

	/// Backoff before attempt `attempt + 1`, without jitter.
	///
	/// `min(max_delay, base_delay * multiplier^(attempt - 1))`; attempts are 1-based.
	pub fn backoff(&self, attempt: u32) -> Duration {
		let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
		let scaled = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);

		if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
			return self.max_delay;
		}

		Duration::from_secs_f64(scaled)
	}

	fn delay_for(&self, attempt: u32, hint: Option<Duration>) -> Duration {
		let mut delay = self.backoff(attempt);

		if let Some(hint) = hint {
			delay = delay.max(hint.min(self.max_delay));
		}
		if self.jitter > 0.0 && !delay.is_zero() {
			let spread = delay.as_secs_f64() * self.jitter;

			delay += Duration::from_secs_f64(rand::rng().random_range(0.0..=spread));
		}

		delay
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_millis(500),
			max_delay: Duration::from_secs(30),
			multiplier: 2.0,
			jitter: 0.1,
			retryable_kinds: ErrorKind::DEFAULT_RETRYABLE.into_iter().collect(),
		}
	}
}

/// Runs operations with bounded, classified retries, acquiring a rate-limit permit before each
/// attempt.
#[derive(Clone, Debug)]
pub struct RetryExecutor {
	limiter: Arc<RateLimiter>,
	provider: Option<Provider>,
}
impl RetryExecutor {
	/// Creates an executor gated by `limiter`.
	pub fn new(limiter: Arc<RateLimiter>) -> Self {
		Self { limiter, provider: None }
	}

	/// Tags errors, spans, and metrics with the provider.
	pub fn for_provider(mut self, provider: Provider) -> Self {
		self.provider = Some(provider);

		self
	}

	/// Limiter shared by this executor.
	pub fn limiter(&self) -> &Arc<RateLimiter> {
		&self.limiter
	}

	/// Runs `operation` until it succeeds, fails with a non-retryable kind, the attempt budget is
	/// spent, or `ctx` fires.
	///
	/// Cancellation while waiting for a permit, during an attempt, or during backoff returns a
	/// [`ErrorKind::Cancelled`] error immediately and never retries.
	pub async fn execute<T, F, Fut>(
		&self,
		ctx: &Context,
		policy: &RetryPolicy,
		mut operation: F,
	) -> Result<T>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		policy.validate()?;

		let span = CallSpan::new(self.provider, "execute");

		span.instrument(async move {
			let mut attempt = 0;

			loop {
				attempt += 1;

				self.limiter.acquire(ctx).await.map_err(|e| self.tag(e))?;

				let err = match ctx.run(operation()).await.map_err(|e| self.tag(e))? {
					Ok(value) => {
						obs::record_attempt_outcome(self.provider, attempt, None);

						return Ok(value);
					},
					Err(err) => self.tag(err),
				};

				obs::record_attempt_outcome(self.provider, attempt, Some(err.kind()));

				if !policy.is_retryable(err.kind()) {
					return Err(err);
				}
				if attempt >= policy.max_attempts {
					return Err(err.with_attempts(attempt));
				}

				let delay = policy.delay_for(attempt, err.retry_after());

				obs::record_retry(self.provider, err.kind(), attempt, delay);

				ctx.sleep(delay).await.map_err(|e| self.tag(e))?;
			}
		})
		.await
	}

	fn tag(&self, err: Error) -> Error {
		match (self.provider, err.provider()) {
			(Some(provider), None) => err.with_provider(provider),
			_ => err,
		}
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicU32, Ordering};
	// self
	use super::*;

	fn executor() -> RetryExecutor {
		let limiter = RateLimiter::new(1_000, Duration::from_secs(1))
			.expect("Limiter fixture should build.");

		RetryExecutor::new(Arc::new(limiter)).for_provider(Provider::Jira)
	}

	fn fast_policy(max_attempts: u32) -> RetryPolicy {
		RetryPolicy::new(max_attempts)
			.with_delays(Duration::from_millis(5), Duration::from_millis(50))
			.with_jitter(0.0)
	}

	#[test]
	fn backoff_grows_and_caps() {
		let policy = RetryPolicy::default()
			.with_delays(Duration::from_millis(100), Duration::from_millis(500))
			.with_multiplier(2.0);

		assert_eq!(policy.backoff(1), Duration::from_millis(100));
		assert_eq!(policy.backoff(2), Duration::from_millis(200));
		assert_eq!(policy.backoff(3), Duration::from_millis(400));
		assert_eq!(policy.backoff(4), Duration::from_millis(500));
		assert_eq!(policy.backoff(60), Duration::from_millis(500));
	}

	#[test]
	fn jitter_stays_within_fraction() {
		let policy = RetryPolicy::default()
			.with_delays(Duration::from_millis(100), Duration::from_secs(1))
			.with_jitter(0.5);

		for _ in 0..100 {
			let delay = policy.delay_for(1, None);

			assert!(delay >= Duration::from_millis(100));
			assert!(delay <= Duration::from_millis(150));
		}
	}

	#[test]
	fn retry_after_hint_raises_delay_up_to_cap() {
		let policy = fast_policy(3);

		assert_eq!(policy.delay_for(1, Some(Duration::from_millis(20))), Duration::from_millis(20));
		assert_eq!(policy.delay_for(1, Some(Duration::from_secs(10))), Duration::from_millis(50));
	}

	#[test]
	fn invalid_policies_are_rejected() {
		assert!(RetryPolicy::new(0).validate().is_err());
		assert!(RetryPolicy::default().with_multiplier(0.5).validate().is_err());
		assert!(RetryPolicy::default().with_jitter(1.5).validate().is_err());
		assert!(
			RetryPolicy::default()
				.with_delays(Duration::from_secs(2), Duration::from_secs(1))
				.validate()
				.is_err()
		);
	}

	#[test]
	fn policy_cannot_opt_into_retrying_auth_failures() {
		let policy = RetryPolicy::default()
			.with_retryable_kinds([ErrorKind::AuthFailed, ErrorKind::Network]);

		assert!(!policy.is_retryable(ErrorKind::AuthFailed));
		assert!(policy.is_retryable(ErrorKind::Network));
	}

	#[tokio::test]
	async fn retryable_failures_then_success() {
		let calls = AtomicU32::new(0);
		let value = executor()
			.execute(&Context::new(), &fast_policy(4), || {
				let call = calls.fetch_add(1, Ordering::SeqCst) + 1;

				async move {
					if call <= 2 {
						Err(Error::from_status(503, None))
					} else {
						Ok(call)
					}
				}
			})
			.await
			.expect("Third attempt should succeed.");

		assert_eq!(value, 3);
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn non_retryable_failure_stops_after_one_call() {
		let calls = AtomicU32::new(0);
		let err = executor()
			.execute(&Context::new(), &fast_policy(5), || {
				calls.fetch_add(1, Ordering::SeqCst);

				async { Err::<(), _>(Error::validation("bad input")) }
			})
			.await
			.expect_err("Validation errors are never retried.");

		assert_eq!(err.kind(), ErrorKind::Validation);
		assert_eq!(err.provider(), Some(Provider::Jira));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn exhausted_attempts_are_annotated() {
		let calls = AtomicU32::new(0);
		let err = executor()
			.execute(&Context::new(), &fast_policy(3), || {
				calls.fetch_add(1, Ordering::SeqCst);

				async { Err::<(), _>(Error::from_status(429, None)) }
			})
			.await
			.expect_err("Every attempt fails.");

		assert_eq!(err.kind(), ErrorKind::ApiRateLimit);
		assert_eq!(err.attempts(), Some(3));
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn cancellation_during_backoff_stops_retries() {
		let calls = Arc::new(AtomicU32::new(0));
		let ctx = Context::new();
		let policy = RetryPolicy::new(5)
			.with_delays(Duration::from_secs(30), Duration::from_secs(30))
			.with_jitter(0.0);
		let canceller = ctx.clone();

		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(30)).await;
			canceller.cancel();
		});

		let counter = calls.clone();
		let err = executor()
			.execute(&ctx, &policy, move || {
				counter.fetch_add(1, Ordering::SeqCst);

				async { Err::<(), _>(Error::from_status(500, None)) }
			})
			.await
			.expect_err("Cancellation must abort the backoff sleep.");

		assert_eq!(err.kind(), ErrorKind::Cancelled);
		assert_eq!(calls.load(Ordering::SeqCst), 1, "No attempt may start after cancellation.");
	}
}
