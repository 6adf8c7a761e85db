//! Emission & Backpressure Gate
//!
//! ## Overview
//!
//! The gate is the only component that talks to the outside world. Fused
//! records land here after resolution and are handed to registered
//! subscribers (API layer, persistence layer) strictly after the
//! correlation stage has finished its decisions - no external call ever
//! happens inside the worker's decision path.
//!
//! ## Delivery Semantics
//!
//! - **At-most-once per fusion id**: a recently-seen ring guards against
//!   any upstream retry re-emitting the same record.
//! - **Bounded buffering, drop-oldest**: when consumers fall behind, the
//!   newest records win and every displaced record is counted. The
//!   pipeline never blocks on a slow consumer; correctness of the
//!   correlation stage outranks guaranteed delivery to any one subscriber.
//!
//! ## Consumption Modes
//!
//! Push: register [`Subscriber`]s and call [`EmissionGate::flush`] from the
//! worker loop. Pull: register nothing and drain with
//! [`EmissionGate::pop_ready`]. Either way the buffer bound and the drop
//! policy are the same.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::boxed::Box;

#[cfg(feature = "std")]
use std::boxed::Box;

use core::sync::atomic::{AtomicU32, Ordering};

use heapless::{Deque, Vec};

use crate::fusion::FusedDetection;

/// Maximum number of registered subscribers
pub const MAX_SUBSCRIBERS: usize = 4;

/// Downstream consumer of fused records
///
/// Implementations must return quickly; a subscriber that stalls the flush
/// path delays delivery for everyone else and eventually costs records via
/// the drop policy (never correctness of the correlation stage).
pub trait Subscriber {
    fn deliver(&mut self, detection: &FusedDetection);
}

/// Owned trait object form used at registration sites
///
/// `Send` so the engine that holds it can move to a dedicated worker thread.
pub type BoxedSubscriber = Box<dyn Subscriber + Send>;

/// Gate delivery statistics
#[derive(Debug, Default)]
pub struct GateStats {
    /// Records accepted into the out-buffer
    pub published: AtomicU32,
    /// Records refused as duplicate fusion ids
    pub duplicates: AtomicU32,
    /// Records dropped oldest-first under overload
    pub dropped: AtomicU32,
    /// Records delivered to subscribers (counted once per record)
    pub delivered: AtomicU32,
}

/// Serializes fused records toward external consumers
///
/// `N` bounds the out-buffer; `D` bounds the recently-seen dedup ring.
/// Owned by the engine; the dedup ring is owned exclusively here.
pub struct EmissionGate<const N: usize, const D: usize> {
    buffer: Deque<FusedDetection, N>,
    seen: Deque<u64, D>,
    subscribers: Vec<BoxedSubscriber, MAX_SUBSCRIBERS>,
    stats: GateStats,
}

impl<const N: usize, const D: usize> EmissionGate<N, D> {
    pub fn new() -> Self {
        Self {
            buffer: Deque::new(),
            seen: Deque::new(),
            subscribers: Vec::new(),
            stats: GateStats::default(),
        }
    }

    /// Register a subscriber; returns false if the table is full
    pub fn subscribe(&mut self, subscriber: BoxedSubscriber) -> bool {
        self.subscribers.push(subscriber).is_ok()
    }

    /// Accept a fused record for delivery
    ///
    /// Returns false if the fusion id was already seen (at-most-once).
    /// A full buffer sheds its oldest record and counts the drop.
    pub fn publish(&mut self, detection: FusedDetection) -> bool {
        let id = detection.fusion_id.0;

        if self.seen.iter().any(|&s| s == id) {
            self.stats.duplicates.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.remember(id);

        if self.buffer.is_full() {
            let _ = self.buffer.pop_front();
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            #[cfg(feature = "log")]
            log::debug!("emission buffer full, dropped oldest fused record");
        }
        // Cannot fail: a slot was just freed if the buffer was full
        let _ = self.buffer.push_back(detection);

        self.stats.published.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Deliver buffered records to all subscribers
    ///
    /// No-op in pull mode (no subscribers registered) so records stay
    /// available to [`EmissionGate::pop_ready`]. Returns the number of
    /// records delivered.
    pub fn flush(&mut self) -> usize {
        if self.subscribers.is_empty() {
            return 0;
        }

        let mut delivered = 0;
        while let Some(detection) = self.buffer.pop_front() {
            for subscriber in self.subscribers.iter_mut() {
                subscriber.deliver(&detection);
            }
            delivered += 1;
        }

        self.stats
            .delivered
            .fetch_add(delivered as u32, Ordering::Relaxed);
        delivered
    }

    /// Pull the next ready record (pull-mode consumers)
    pub fn pop_ready(&mut self) -> Option<FusedDetection> {
        let detection = self.buffer.pop_front();
        if detection.is_some() {
            self.stats.delivered.fetch_add(1, Ordering::Relaxed);
        }
        detection
    }

    /// Current out-buffer depth
    pub fn depth(&self) -> usize {
        self.buffer.len()
    }

    /// Delivery statistics
    pub fn stats(&self) -> &GateStats {
        &self.stats
    }

    fn remember(&mut self, id: u64) {
        if self.seen.is_full() {
            let _ = self.seen.pop_front();
        }
        let _ = self.seen.push_back(id);
    }
}

impl<const N: usize, const D: usize> Default for EmissionGate<N, D> {
    fn default() -> Self {
        Self::new()
    }
}
