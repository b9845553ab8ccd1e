//! Logging setup
//!
//! Configure via the RUST_LOG environment variable:
//! - `RUST_LOG=debug` - all debug logs
//! - `RUST_LOG=lark_highlight::loader=debug` - gate transitions and imports only
//!
//! Defaults to `warn`. Logs go to stderr so stdout stays clean for output.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "warn";

/// Filter from RUST_LOG, falling back to `default`
pub fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the stderr subscriber. Does nothing if one is already installed.
pub fn init() {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter(DEFAULT_FILTER))
        .with(console_layer)
        .try_init();
}
