//! Core data model.
//!
//! A ticket identifies one submitted operation for its whole life in the
//! queue: waiting, executing, and settlement. Observers and events refer
//! to operations by ticket id.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Newtype for ticket IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(pub Uuid);

impl TicketId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for TicketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short display: first 8 chars of UUID
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time composition of the queue. Snapshot only, no side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Items waiting for a free slot.
    pub waiting: usize,
    /// Items currently executing (≤ the concurrency ceiling).
    pub processing: usize,
    /// waiting + processing.
    pub total: usize,
}
