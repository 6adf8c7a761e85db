//! Correlation Window Manager
//!
//! ## Overview
//!
//! The hardest part of the engine: reconciling two detection streams with
//! different arrival jitter into match decisions. Radar and vision events
//! describing the same physical vehicle arrive up to one correlation window
//! apart, in either order; everything else is noise to be expired.
//!
//! ```text
//! radar events  ──→ [radar bucket]  ──┐  best |Δt| ≤ window
//!                                     ├──→ Matched(radar, vision)
//! vision events ──→ [vision bucket] ──┘
//!                        │
//!                        └── deadline elapsed ──→ Expired(event)
//! ```
//!
//! ## Matching Algorithm
//!
//! On each ingest the *opposite* bucket is scanned for the candidate with
//! the smallest `|Δt| <= window`. Exact ties break toward the earlier
//! ingest sequence, so a replay of the same event order reproduces the same
//! pairings. On a match both events leave their buckets atomically (single
//! owner, one mutation path - there is no interleaving that can match one
//! event twice).
//!
//! Matching is purely timestamp-based. The clock only drives expiry sweeps,
//! which makes the whole decision sequence deterministic under a fixed
//! clock and fixed ingest order.
//!
//! ## Ownership
//!
//! Buckets are owned exclusively by this manager and mutated only through
//! its methods, which the engine calls from one serialized worker path.
//! Decisions are handed to a caller-supplied sink; the manager performs no
//! I/O and never blocks.

pub mod bucket;

pub use bucket::{PendingBucket, PendingSlot};

use heapless::Vec;

use crate::errors::{IngestError, IngestResult};
use crate::events::{RadarEvent, RawEvent, SensorKind, VisionEvent};
use crate::time::Timestamp;

/// Outcome of the correlation stage for one or two raw events
#[derive(Debug, Clone, Copy)]
pub enum Decision {
    /// A radar/vision pair plausibly describing the same vehicle
    Matched {
        radar: RadarEvent,
        vision: VisionEvent,
    },
    /// An event that left its bucket without finding a partner
    Expired(RawEvent),
}

/// Matches cross-sensor events within a bounded time window
///
/// `N` is the per-sensor bucket capacity. Every mutation happens through
/// `&mut self` from the engine's single worker path.
pub struct CorrelationWindowManager<const N: usize> {
    radar_bucket: PendingBucket<N>,
    vision_bucket: PendingBucket<N>,
    window_ms: u64,
    /// Next global ingest sequence number
    next_seq: u64,
}

impl<const N: usize> CorrelationWindowManager<N> {
    pub fn new(window_ms: u64) -> Self {
        Self {
            radar_bucket: PendingBucket::new(),
            vision_bucket: PendingBucket::new(),
            window_ms,
            next_seq: 0,
        }
    }

    /// Update the correlation window (hot reload)
    ///
    /// Applies to events ingested from now on; entries already buffered
    /// keep the deadline they were given.
    pub fn set_window(&mut self, window_ms: u64) {
        self.window_ms = window_ms;
    }

    /// Current correlation window
    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Ingest one raw event, producing zero or more decisions
    ///
    /// Malformed events are rejected and never buffered. A matched pair
    /// produces `Matched`; an event evicted by a full bucket produces
    /// `Expired` (force-expiry, never silent loss).
    pub fn ingest(
        &mut self,
        event: RawEvent,
        sink: &mut impl FnMut(Decision),
    ) -> IngestResult<()> {
        event.check_well_formed()?;
        self.check_retention(&event)?;

        let seq = self.next_seq;
        self.next_seq += 1;

        let timestamp = event.timestamp();
        let window = self.window_ms;

        // Scan the opposite bucket for the closest candidate
        match event {
            RawEvent::Radar(radar) => {
                if let Some(idx) = self.vision_bucket.best_candidate(timestamp, window) {
                    let partner = self.vision_bucket.remove(idx);
                    let vision = match partner.event {
                        RawEvent::Vision(v) => v,
                        // Vision bucket holds vision events only
                        RawEvent::Radar(_) => unreachable!("radar event in vision bucket"),
                    };
                    sink(Decision::Matched { radar, vision });
                } else if let Some(evicted) =
                    self.radar_bucket.insert(event, seq, timestamp + window)
                {
                    sink(Decision::Expired(evicted.event));
                }
            }
            RawEvent::Vision(vision) => {
                if let Some(idx) = self.radar_bucket.best_candidate(timestamp, window) {
                    let partner = self.radar_bucket.remove(idx);
                    let radar = match partner.event {
                        RawEvent::Radar(r) => r,
                        RawEvent::Vision(_) => unreachable!("vision event in radar bucket"),
                    };
                    sink(Decision::Matched { radar, vision });
                } else if let Some(evicted) =
                    self.vision_bucket.insert(event, seq, timestamp + window)
                {
                    sink(Decision::Expired(evicted.event));
                }
            }
        }

        Ok(())
    }

    /// Expire everything whose deadline has elapsed
    ///
    /// Each expired event is reported exactly once; once removed, an id can
    /// never be matched or expired again.
    pub fn sweep(&mut self, now: Timestamp, sink: &mut impl FnMut(Decision)) {
        let mut expired = Vec::<PendingSlot, N>::new();

        self.radar_bucket.take_expired(now, &mut expired);
        for slot in &expired {
            sink(Decision::Expired(slot.event));
        }

        expired.clear();
        self.vision_bucket.take_expired(now, &mut expired);
        for slot in &expired {
            sink(Decision::Expired(slot.event));
        }
    }

    /// Force-expire all pending events (graceful shutdown)
    pub fn drain(&mut self, sink: &mut impl FnMut(Decision)) {
        let mut pending = Vec::<PendingSlot, N>::new();

        self.radar_bucket.take_all(&mut pending);
        for slot in &pending {
            sink(Decision::Expired(slot.event));
        }

        pending.clear();
        self.vision_bucket.take_all(&mut pending);
        for slot in &pending {
            sink(Decision::Expired(slot.event));
        }
    }

    /// Earliest expiry deadline across both buckets
    ///
    /// The host loop parks until this deadline or the next queued event,
    /// whichever comes first.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        match (
            self.radar_bucket.next_deadline(),
            self.vision_bucket.next_deadline(),
        ) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }

    /// Current bucket depths (radar, vision)
    pub fn depths(&self) -> (usize, usize) {
        (self.radar_bucket.len(), self.vision_bucket.len())
    }

    /// Reject timestamps behind the retention horizon
    ///
    /// An event older than the oldest retained entry of its own stream by
    /// more than one window can never match anything still buffered; it is
    /// an adapter clock fault, not data. The horizon only exists on this
    /// worker path, after the adapter's ingest call has already returned,
    /// so the rejection reaches the adapter through the `stale` telemetry
    /// counter rather than a return value.
    fn check_retention(&self, event: &RawEvent) -> IngestResult<()> {
        let bucket_oldest = match event.kind() {
            SensorKind::Radar => self.radar_bucket.oldest_timestamp(),
            SensorKind::Vision => self.vision_bucket.oldest_timestamp(),
        };

        if let Some(oldest) = bucket_oldest {
            let ts = event.timestamp();
            if ts < oldest {
                let age = oldest - ts;
                if age > self.window_ms {
                    return Err(IngestError::StaleTimestamp {
                        age_ms: age,
                        limit_ms: self.window_ms,
                    });
                }
            }
        }

        Ok(())
    }
}
