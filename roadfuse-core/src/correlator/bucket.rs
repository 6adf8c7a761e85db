//! Pending Buckets of Unmatched Events
//!
//! A bucket is a bounded FIFO of events from one sensor that have not yet
//! found a cross-sensor partner. Each entry carries the ingest sequence
//! number (for deterministic tie-breaks) and its expiry deadline.
//!
//! Buckets are owned exclusively by the window manager; nothing else reads
//! or mutates them. Within a bucket, entries are in ingest order only:
//! retention tolerates up to one window of timestamp jitter, so scans never
//! assume timestamp order.

use heapless::Vec;

use crate::events::RawEvent;
use crate::time::{delta_ms, Timestamp};

/// One unmatched event waiting for a partner
#[derive(Debug, Clone, Copy)]
pub struct PendingSlot {
    /// The buffered observation
    pub event: RawEvent,
    /// Global ingest sequence number (tie-break key)
    pub seq: u64,
    /// Deadline after which the event expires unmatched
    pub expires_at: Timestamp,
}

/// Ordered collection of per-sensor unmatched events
///
/// Capacity `N` bounds how many detections one sensor can hold in flight;
/// sized for one correlation window at peak event rate.
#[derive(Debug, Default)]
pub struct PendingBucket<const N: usize> {
    slots: Vec<PendingSlot, N>,
}

impl<const N: usize> PendingBucket<N> {
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Buffer an unmatched event
    ///
    /// If the bucket is full the oldest pending entry is evicted and
    /// returned so the caller can force-expire it - an event is never
    /// silently lost.
    pub fn insert(
        &mut self,
        event: RawEvent,
        seq: u64,
        expires_at: Timestamp,
    ) -> Option<PendingSlot> {
        let evicted = if self.slots.is_full() {
            Some(self.slots.remove(0))
        } else {
            None
        };

        let slot = PendingSlot { event, seq, expires_at };
        // Cannot fail: a slot was just freed if the bucket was full
        let _ = self.slots.push(slot);

        evicted
    }

    /// Find the best match candidate for `timestamp`
    ///
    /// Returns the index of the entry with the smallest `|Δt| <= window`,
    /// breaking exact ties toward the earlier-arriving entry (lower ingest
    /// sequence) so matching is deterministic and replayable.
    pub fn best_candidate(&self, timestamp: Timestamp, window_ms: u64) -> Option<usize> {
        let mut best: Option<(usize, u64, u64)> = None; // (index, delta, seq)

        for (idx, slot) in self.slots.iter().enumerate() {
            let delta = delta_ms(slot.event.timestamp(), timestamp);
            if delta > window_ms {
                continue;
            }

            let better = match best {
                None => true,
                Some((_, best_delta, best_seq)) => {
                    delta < best_delta || (delta == best_delta && slot.seq < best_seq)
                }
            };

            if better {
                best = Some((idx, delta, slot.seq));
            }
        }

        best.map(|(idx, _, _)| idx)
    }

    /// Remove and return the entry at `idx`
    pub fn remove(&mut self, idx: usize) -> PendingSlot {
        self.slots.remove(idx)
    }

    /// Move every entry whose deadline has elapsed into `out`
    pub fn take_expired(&mut self, now: Timestamp, out: &mut Vec<PendingSlot, N>) {
        while let Some(pos) = self.slots.iter().position(|s| s.expires_at <= now) {
            let _ = out.push(self.slots.remove(pos));
        }
    }

    /// Move every remaining entry into `out` (shutdown drain)
    pub fn take_all(&mut self, out: &mut Vec<PendingSlot, N>) {
        while !self.slots.is_empty() {
            let _ = out.push(self.slots.remove(0));
        }
    }

    /// Earliest expiry deadline among pending entries
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.slots.iter().map(|s| s.expires_at).min()
    }

    /// Capture timestamp of the oldest retained entry (retention horizon)
    pub fn oldest_timestamp(&self) -> Option<Timestamp> {
        self.slots.iter().map(|s| s.event.timestamp()).min()
    }

    /// Number of pending entries
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the bucket is empty
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
