//! Error types for turnq.

use thiserror::Error;

use crate::retry::{Classify, ErrorClass};

/// Errors from the queue's own machinery (not from submitted operations).
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("telemetry init failed: {0}")]
    Telemetry(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// How a submitted operation's ticket ultimately settled when it didn't
/// produce a value.
#[derive(Debug, Error)]
pub enum TicketError<E: std::error::Error> {
    /// The settlement channel dropped without a value: the executing task
    /// was torn down with its runtime before the operation settled. Note
    /// that dropping queue handles does not cancel work — executing tasks
    /// keep the queue alive and pending items still run to settlement —
    /// so this is only seen when a ticket outlives the runtime's tasks.
    #[error("queue torn down before the request settled")]
    Closed,

    /// The operation failed after `attempts` invocations — either a
    /// non-retryable failure on the first attempt, or retry exhaustion.
    #[error("request failed after {attempts} attempt(s)")]
    Failed {
        attempts: u32,
        #[source]
        source: E,
    },
}

impl<E: std::error::Error> TicketError<E> {
    /// The operation's own error, if this wasn't a queue teardown.
    pub fn into_inner(self) -> Option<E> {
        match self {
            TicketError::Closed => None,
            TicketError::Failed { source, .. } => Some(source),
        }
    }
}

/// Ready-made error type for HTTP-shaped operations.
///
/// Callers with their own error types implement [`Classify`] directly;
/// this covers the common case of a status-coded upstream API.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    /// The upstream answered with an HTTP status. Codes below 500 are
    /// treated as the caller's fault and are not retried.
    #[error("upstream returned status {code}: {message}")]
    Status { code: u16, message: String },

    /// Transport-level failure (connect, reset, timeout). Always retryable.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Anything that couldn't be classified.
    #[error("{0}")]
    Unknown(String),
}

impl Classify for RequestError {
    fn class(&self) -> ErrorClass {
        match self {
            RequestError::Status { code, .. } if *code < 500 => ErrorClass::Client { code: *code },
            RequestError::Status { .. } => ErrorClass::Transient,
            RequestError::Transport(_) => ErrorClass::Transient,
            RequestError::Unknown(_) => ErrorClass::Unknown,
        }
    }
}
