//! Tracing setup
//!
//! Console logging with an env-filter; `RUST_LOG` wins over the configured
//! level. JSON output is opt-in for machine-readable logs.

use tracing_subscriber::EnvFilter;

pub fn init(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    // try_init so repeated initialization (tests, embedding) is harmless.
    if json {
        let _ = tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init();
    }
}
