//! Structured logging

use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Resolve the log filter: `RUST_LOG` wins over `service.log_level`.
///
/// An unparseable directive falls back to `info`.
pub fn env_filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.service.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the JSON subscriber.
///
/// Only the first call installs anything; later calls (tests, embedding
/// binaries that already set a subscriber) are ignored.
pub fn init_tracing(config: &Config) {
    let installed = tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter(config))
        .with_target(true)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            service = %config.service.name,
            environment = %config.service.environment,
            "Tracing initialized"
        );
    }
}
