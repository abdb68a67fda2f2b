//! Logger initialization
//!
//! Library code only talks to the `log` facade. The binary installs
//! `env_logger` once at startup; `RUST_LOG` always wins over the filter
//! chosen here.

use crate::config::LoggingConfig;
use env_logger::{Builder, Env};

/// Filter used when `RUST_LOG` is unset
pub fn default_filter(config: &LoggingConfig, debug: bool) -> &str {
    if debug {
        "debug"
    } else {
        config.level.as_str()
    }
}

/// Installs the global logger
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init(config: &LoggingConfig, debug: bool) {
    let filter = default_filter(config, debug).to_string();
    let _ = Builder::from_env(Env::default().default_filter_or(filter))
        .format_timestamp_millis()
        .try_init();
}
