//! Outbound write queue.
//!
//! Ordered (pending bytes, originating frame) pairs. Insertion order is
//! transmission order; a partially written entry goes back to the head so
//! its remaining bytes are sent before anything queued after it.
//!
//! The queue has no capacity bound. A client that enqueues faster than the
//! socket drains grows memory without limit; backpressure policy belongs to
//! the client, which can watch [`WriteQueue::pending_bytes`].

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use crate::protocol::Frame;

// ============================================================================
// WriteQueue
// ============================================================================

/// FIFO of serialized frames awaiting transmission.
///
/// Each entry's bytes are always an unsent suffix of the frame's encoding.
#[derive(Debug, Default)]
pub struct WriteQueue {
    /// Pending entries, head first.
    entries: VecDeque<(Vec<u8>, Frame)>,
    /// Sum of pending byte lengths.
    pending_bytes: usize,
}

impl WriteQueue {
    /// Creates an empty queue.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry at the tail.
    pub fn push_back(&mut self, bytes: Vec<u8>, frame: Frame) {
        self.pending_bytes += bytes.len();
        self.entries.push_back((bytes, frame));
    }

    /// Returns an entry to the head.
    pub fn push_front(&mut self, bytes: Vec<u8>, frame: Frame) {
        self.pending_bytes += bytes.len();
        self.entries.push_front((bytes, frame));
    }

    /// Removes and returns the head entry.
    pub fn pop_front(&mut self) -> Option<(Vec<u8>, Frame)> {
        let entry = self.entries.pop_front()?;
        self.pending_bytes -= entry.0.len();
        Some(entry)
    }

    /// Discards every entry and returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        self.pending_bytes = 0;
        dropped
    }

    /// Returns the number of queued entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the total unsent bytes across all entries.
    #[inline]
    #[must_use]
    pub fn pending_bytes(&self) -> usize {
        self.pending_bytes
    }
}

// ============================================================================
// Tests
// ============================================================================
