//! Optional observability helpers for the request core.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (default) to emit structured spans named `relay_core.call` with the
//!   `provider` and `stage` fields, plus per-request and per-retry events.
//! - Enable `metrics` to increment `relay_core_http_requests_total`, `relay_core_attempt_total`,
//!   `relay_core_retry_total`, and `relay_core_rate_limit_wait_total`, and to record attempt
//!   numbers in the `relay_core_attempt_number` histogram.
//!
//! Nothing in this module ever receives header values, bodies, or credential material.

mod metrics;
mod tracing;

pub use self::metrics::*;
pub use self::tracing::*;

// self
use crate::provider::Provider;

/// Stable label for an optional provider tag.
pub(crate) const fn provider_label(provider: Option<Provider>) -> &'static str {
	match provider {
		Some(provider) => provider.as_str(),
		None => "unscoped",
	}
}
