//! Tracing setup for the binary.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a stderr subscriber. `RUST_LOG` overrides the level picked by
/// `verbosity` (0 = warn, 1 = info, 2+ = debug).
pub fn init_logging(verbosity: u8) {
	let level = match verbosity {
		0 => "warn",
		1 => "info",
		_ => "debug",
	};

	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(format!("mql={level},mql_cli={level},mql_protocol={level}")));

	// A second init (e.g. from tests) keeps the first subscriber.
	let _ = tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_writer(std::io::stderr).with_target(verbosity >= 2))
		.try_init();
}
