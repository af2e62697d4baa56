//! # turnq
//!
//! Bounded-concurrency request queue for rate-limited async APIs.
//!
//! Accepts asynchronous operations, runs at most a fixed number of them
//! concurrently in FIFO submission order, retries transient failures with
//! exponential backoff, and reports queue position to interested observers.
//! All state is in-memory; nothing survives a restart.

pub mod config;
pub mod error;
pub mod event;
pub mod model;
pub mod queue;
pub mod retry;
pub mod telemetry;
