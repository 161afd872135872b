//! Structured logging setup
//!
//! Filtering follows the `SAMYAMA_ORM_LOG` environment variable using
//! `EnvFilter` directives, e.g. `SAMYAMA_ORM_LOG=samyama_orm::model=debug`.

use crate::config::GraphConfig;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "SAMYAMA_ORM_LOG";

/// Install the global subscriber at `info` unless `SAMYAMA_ORM_LOG` says otherwise
pub fn init() {
    init_with_default("info");
}

/// Install the global subscriber with a custom default level.
///
/// Only the first call installs a subscriber; later calls are ignored.
pub fn init_with_default(default_level: &str) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .try_init();
}

/// Install the global subscriber at the configured `log_level`
pub fn init_from_config(config: &GraphConfig) {
    init_with_default(&config.log_level);
}
