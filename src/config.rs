//! Typed configuration from defaults, builder calls, or environment.
//!
//! Every knob has a default matching the reference behavior (ceiling 3,
//! two retries, 2 s base backoff), so `QueueConfig::default()` is a
//! working configuration. `from_env` is for the binary and for deployments
//! that tune via environment; it fails fast on malformed values.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum operations executing at once.
    pub concurrency: usize,
    /// Retry limits and backoff schedule.
    pub retry: RetryPolicy,
    /// Buffer size of the broadcast event stream.
    pub event_capacity: usize,
    /// Default log filter for the binary when RUST_LOG is unset.
    pub log_level: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            retry: RetryPolicy::default(),
            event_capacity: 256,
            log_level: "info".to_string(),
        }
    }
}

impl QueueConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// Recognized: `TURNQ_CONCURRENCY`, `TURNQ_MAX_RETRIES`,
    /// `TURNQ_BASE_DELAY_MS`, `TURNQ_RETRY_UNKNOWN`, `LOG_LEVEL`.
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(n) = parsed_var::<usize>("TURNQ_CONCURRENCY")? {
            if n == 0 {
                return Err(Error::Config(
                    "TURNQ_CONCURRENCY must be at least 1".to_string(),
                ));
            }
            config.concurrency = n;
        }
        if let Some(n) = parsed_var::<u32>("TURNQ_MAX_RETRIES")? {
            config.retry.max_retries = n;
        }
        if let Some(ms) = parsed_var::<u64>("TURNQ_BASE_DELAY_MS")? {
            config.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(flag) = parsed_var::<bool>("TURNQ_RETRY_UNKNOWN")? {
            config.retry.retry_unknown = flag;
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }

        Ok(config)
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.retry.max_retries = n;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.retry.base_delay = delay;
        self
    }

    pub fn retry_unknown(mut self, flag: bool) -> Self {
        self.retry.retry_unknown = flag;
        self
    }
}

/// Read and parse an optional env var, erroring on malformed values
/// rather than silently falling back.
fn parsed_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{name} has unparseable value {raw:?}"))),
        Err(_) => Ok(None),
    }
}
