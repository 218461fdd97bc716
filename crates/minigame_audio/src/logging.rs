//! Logging utilities
//!
//! The crate logs through the `log` facade. Hosts without their own logger
//! can call [`init`] once at startup.

pub use log::{debug, error, info, trace, warn};

/// Initialize `env_logger`, defaulting to `info` unless `RUST_LOG` says otherwise
///
/// Safe to call more than once; later calls are ignored.
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}
