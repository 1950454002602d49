//! Track deferral queue
//!
//! Track-change notifications that arrive while playback is paused (or while
//! a pause is logically pending) must not surface immediately. Each is
//! buffered with a delivery instant; resuming playback shifts every buffered
//! instant forward by the elapsed pause duration, so a track is never
//! announced earlier than its original arrival plus the total time spent
//! paused.
//!
//! Uses `tokio::time::Instant` throughout so tests can drive the clock.

use tokio::time::{Duration, Instant};

/// One buffered track-change notification.
#[derive(Debug, Clone)]
pub struct DeferredTrack {
    /// Earliest instant at which the title may be delivered
    pub due_at: Instant,
    /// Track title as reported by the stream metadata
    pub title: String,
}

/// Collection of deferred track entries, in arrival order.
///
/// An entry leaves the queue exactly once: either delivered by
/// [`take_due`](Self::take_due) or discarded by [`clear`](Self::clear) on
/// power-off / channel restart.
#[derive(Debug, Default)]
pub struct DeferralQueue {
    entries: Vec<DeferredTrack>,
}

impl DeferralQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a title for delivery no earlier than `due_at`.
    pub fn push(&mut self, due_at: Instant, title: String) {
        self.entries.push(DeferredTrack { due_at, title });
    }

    /// Shift every buffered delivery instant forward by `delay`.
    ///
    /// Called on resume with the elapsed pause duration. Instants only ever
    /// move forward; pause compensation never reschedules a track earlier.
    pub fn shift_forward(&mut self, delay: Duration) {
        for entry in &mut self.entries {
            entry.due_at += delay;
        }
    }

    /// Remove and return all entries due at `now`, preserving arrival order.
    pub fn take_due(&mut self, now: Instant) -> Vec<DeferredTrack> {
        let (due, rest): (Vec<_>, Vec<_>) =
            self.entries.drain(..).partition(|e| e.due_at <= now);
        self.entries = rest;
        due
    }

    /// Discard all entries without delivering them.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
