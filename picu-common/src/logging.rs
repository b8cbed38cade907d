//! Tracing subscriber setup shared by the PICU binaries

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

/// Logging configuration (`[logging]` table of a config file)
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub fn default_log_level() -> String {
    "info".to_string()
}

/// Build the filter used by [`init_tracing`]
///
/// `RUST_LOG` takes precedence; otherwise `level` applies to every target.
pub fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(default_log_level()))
}

/// Install the global fmt subscriber
///
/// Calling this more than once is harmless: later calls are ignored.
pub fn init_tracing(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(level))
        .with_target(false)
        .try_init();
}
