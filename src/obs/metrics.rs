// self
use crate::{_prelude::*, obs, provider::Provider};

/// Records an HTTP exchange (metrics) and logs its metadata (tracing).
pub fn record_http(method: &str, url: &Url, status: Option<u16>, elapsed: Duration) {
	#[cfg(feature = "metrics")]
	{
		let status_label = status.map(|code| code.to_string()).unwrap_or_else(|| "error".into());

		metrics::counter!(
			"relay_core_http_requests_total",
			"method" => method.to_owned(),
			"status" => status_label
		)
		.increment(1);
	}

	obs::log_http_exchange(method, url, status, elapsed);
}

/// Records the outcome of one attempt inside the retry executor.
pub fn record_attempt_outcome(provider: Option<Provider>, attempt: u32, failure: Option<ErrorKind>) {
	#[cfg(feature = "metrics")]
	{
		let outcome = failure.map(ErrorKind::as_str).unwrap_or("success");

		metrics::counter!(
			"relay_core_attempt_total",
			"provider" => obs::provider_label(provider),
			"outcome" => outcome
		)
		.increment(1);
		metrics::histogram!(
			"relay_core_attempt_number",
			"provider" => obs::provider_label(provider)
		)
		.record(f64::from(attempt));
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (provider, attempt, failure);
	}
}

/// Records a scheduled retry.
pub fn record_retry(provider: Option<Provider>, kind: ErrorKind, attempt: u32, delay: Duration) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"relay_core_retry_total",
			"provider" => obs::provider_label(provider),
			"kind" => kind.as_str()
		)
		.increment(1);
	}

	obs::log_retry(provider, kind, attempt, delay);
}

/// Records a caller that had to queue for a rate-limit permit.
pub fn record_rate_limit_wait(provider: Option<Provider>) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"relay_core_rate_limit_wait_total",
			"provider" => obs::provider_label(provider)
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = provider;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_noop_without_metrics() {
		record_attempt_outcome(Some(Provider::Gemini), 1, Some(ErrorKind::Network));
		record_rate_limit_wait(None);
	}
}
