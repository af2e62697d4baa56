//! Tracing initialization for binaries and examples.
//!
//! The library itself only emits via `tracing` and never installs a
//! subscriber; embedding applications bring their own. This helper is the
//! stdout setup used by the turnq binary.

use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

/// Install a stdout fmt subscriber. `RUST_LOG` wins over `default_level`.
///
/// # Errors
/// Returns an error if a global subscriber is already set.
pub fn init_tracing(default_level: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init()
        .map_err(|e| Error::Telemetry(e.to_string()))
}
