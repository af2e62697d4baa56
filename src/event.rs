//! Structured events emitted by the queue on every composition change.
//!
//! Consumers subscribe to the event stream to build dashboards, progress
//! bars, or audit logs. Events are the whole-queue surface; per-item
//! position observers are registered on the queue itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::TicketId;

/// A structured event emitted by the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEvent {
    /// Monotonic sequence number. Consumers can detect gaps (the stream
    /// is lossy under backpressure — it's a broadcast channel).
    pub seq: u64,
    /// When this event occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub kind: QueueEventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueEventKind {
    /// Operation accepted and placed at the back of the pending list.
    Enqueued { id: TicketId, waiting: usize },
    /// Operation popped from pending and began executing.
    Started { id: TicketId, waited_ms: u64 },
    /// A retryable failure; the operation will run again after the delay.
    RetryScheduled {
        id: TicketId,
        /// Which retry this is (1-based).
        attempt: u32,
        delay_ms: u64,
        error: String,
    },
    /// Operation settled successfully.
    Completed {
        id: TicketId,
        duration_ms: u64,
        attempts: u32,
    },
    /// Operation settled with a failure — non-retryable, or retries exhausted.
    Failed {
        id: TicketId,
        error: String,
        attempts: u32,
        retryable: bool,
    },
}

/// Shared event emitter. Cloned into every executing task so retries and
/// settlements are reported from wherever they happen.
#[derive(Clone)]
pub(crate) struct Emitter {
    seq: Arc<AtomicU64>,
    tx: broadcast::Sender<QueueEvent>,
}

impl Emitter {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            seq: Arc::new(AtomicU64::new(0)),
            tx,
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.tx.subscribe()
    }

    /// Stamp and send. A send error just means nobody is listening.
    pub(crate) fn emit(&self, kind: QueueEventKind) {
        let event = QueueEvent {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            timestamp: Utc::now(),
            kind,
        };
        let _ = self.tx.send(event);
    }
}
