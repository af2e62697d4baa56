//! Retry classification and backoff policy.
//!
//! The retry decision used to be a duck-typed probe of an `error.status`
//! field; here it is an exhaustive match on a small taxonomy, so adding a
//! class forces every decision site to account for it.

use std::time::Duration;

/// What kind of failure an operation produced, for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller/validation fault (status-coded below 500). Never retried;
    /// retrying a bad request just repeats the bad request.
    Client { code: u16 },
    /// Transient fault (network failure, 5xx). Retried with backoff.
    Transient,
    /// Couldn't be classified. Retried or not per [`RetryPolicy::retry_unknown`].
    Unknown,
}

/// Maps a caller error type onto the retry taxonomy.
///
/// Implemented by [`RequestError`](crate::error::RequestError) for
/// HTTP-shaped errors; callers with richer error types implement it
/// themselves.
pub trait Classify {
    fn class(&self) -> ErrorClass;
}

/// Retry limits and backoff schedule.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra attempts after the first, for retryable failures.
    pub max_retries: u32,
    /// Delay before the first retry; doubles each subsequent retry.
    pub base_delay: Duration,
    /// Whether [`ErrorClass::Unknown`] failures are retried. Defaults to
    /// true (optimistic): an unclassified error is more often a flaky
    /// upstream than a bad request.
    pub retry_unknown: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(2000),
            retry_unknown: true,
        }
    }
}

impl RetryPolicy {
    /// Should a failure of this class be retried at all?
    pub fn should_retry(&self, class: ErrorClass) -> bool {
        match class {
            ErrorClass::Client { .. } => false,
            ErrorClass::Transient => true,
            ErrorClass::Unknown => self.retry_unknown,
        }
    }

    /// Backoff before retry number `attempt` (zero-based): base · 2^attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}
