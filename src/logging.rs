//! Logging configuration using tracing

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ClipError, ClipResult};

/// Build the filter: `RUST_LOG` wins, then `level`, then `info`
pub fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber, writing to stderr
pub fn init(level: &str) -> ClipResult<()> {
    tracing_subscriber::registry()
        .with(filter(level))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .map_err(|e| ClipError::Config(format!("Failed to initialize logging: {}", e)))
}
