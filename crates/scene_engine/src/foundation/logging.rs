//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

use crate::config::LoggingConfig;

/// Initialize the logging system
///
/// Honours `RUST_LOG`; repeated calls are ignored.
pub fn init() {
    let _ = env_logger::try_init();
}

/// Initialize logging with a default filter used when `RUST_LOG` is unset
pub fn init_with_level(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("logger already initialized, keeping existing filter");
    }
}

/// Initialize logging from the engine configuration
pub fn init_from_config(config: &LoggingConfig) {
    init_with_level(&config.level);
}
