//! Cancellation and deadline propagation for every suspension point in the request core.
//!
//! A [`Context`] is cheap to clone; clones share the same cancellation token. Rate limiter waits,
//! backoff sleeps, and in-flight attempts all race against [`Context::done`] and return a
//! [`ErrorKind::Cancelled`] error as soon as it fires.

// crates.io
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
// self
use crate::_prelude::*;

/// Caller-controlled cancellation signal with an optional deadline.
#[derive(Clone, Debug, Default)]
pub struct Context {
	token: CancellationToken,
	deadline: Option<Instant>,
}
impl Context {
	/// Creates a context that never expires on its own.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns a copy that expires `timeout` from now, keeping any earlier deadline.
	pub fn with_timeout(self, timeout: Duration) -> Self {
		let deadline = Instant::now() + timeout;

		self.with_deadline(deadline)
	}

	/// Returns a copy that expires at `deadline`, keeping any earlier deadline.
	pub fn with_deadline(mut self, deadline: Instant) -> Self {
		self.deadline = Some(match self.deadline {
			Some(current) if current <= deadline => current,
			_ => deadline,
		});

		self
	}

	/// Creates a child context that is cancelled with its parent but can be cancelled alone.
	pub fn child(&self) -> Self {
		Self { token: self.token.child_token(), deadline: self.deadline }
	}

	/// Signals cancellation to every holder of this context and its children.
	pub fn cancel(&self) {
		self.token.cancel();
	}

	/// Returns `true` once cancelled or past the deadline.
	pub fn is_cancelled(&self) -> bool {
		self.token.is_cancelled() || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
	}

	/// Deadline, when one is set.
	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	/// Resolves once the context is cancelled or its deadline elapses.
	pub async fn done(&self) -> Error {
		match self.deadline {
			Some(deadline) => tokio::select! {
				biased;
				_ = self.token.cancelled() => Error::cancelled(),
				_ = time::sleep_until(deadline) => Error::deadline_exceeded(),
			},
			None => {
				self.token.cancelled().await;

				Error::cancelled()
			},
		}
	}

	/// Sleeps for `duration` unless the context fires first.
	pub async fn sleep(&self, duration: Duration) -> Result<()> {
		self.run(time::sleep(duration)).await
	}

	/// Drives `fut` to completion unless the context fires first, in which case `fut` is dropped.
	pub async fn run<F>(&self, fut: F) -> Result<F::Output>
	where
		F: Future,
	{
		tokio::select! {
			biased;
			err = self.done() => Err(err),
			output = fut => Ok(output),
		}
	}
}
