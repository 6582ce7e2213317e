//! Client configuration.

use std::time::Duration;

use tracing::warn;

/// Transport timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable holding the default server endpoint.
pub const ENDPOINT_ENV: &str = "MQLURI";
/// Environment variable overriding the request timeout, in seconds.
pub const TIMEOUT_ENV: &str = "MQL_TIMEOUT_SECS";

/// Settings for a [`Client`](crate::Client).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
	/// Server endpoint; may also be supplied later via `set_endpoint` or `connect`.
	pub endpoint: Option<String>,
	/// Upper bound on a single round trip.
	pub timeout: Duration,
}

impl Default for ClientOptions {
	fn default() -> Self {
		Self {
			endpoint: None,
			timeout: DEFAULT_TIMEOUT,
		}
	}
}

impl ClientOptions {
	/// Reads [`ENDPOINT_ENV`] and [`TIMEOUT_ENV`] from the process environment.
	pub fn from_env() -> Self {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
		let endpoint = lookup(ENDPOINT_ENV).filter(|value| !value.trim().is_empty());
		let timeout = match lookup(TIMEOUT_ENV) {
			Some(raw) => match raw.trim().parse::<u64>() {
				Ok(secs) if secs > 0 => Duration::from_secs(secs),
				_ => {
					warn!(target = "mql", value = %raw, "ignoring invalid {TIMEOUT_ENV}");
					DEFAULT_TIMEOUT
				}
			},
			None => DEFAULT_TIMEOUT,
		};
		Self { endpoint, timeout }
	}

	pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
		self.endpoint = Some(endpoint.into());
		self
	}

	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}
}
