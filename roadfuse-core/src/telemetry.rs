//! Telemetry Counters and Snapshots
//!
//! Internal observability with zero data-path cost: counters are relaxed
//! atomics bumped in place, and an external health/metrics component polls
//! [`TelemetrySnapshot`]s on its own interval. Ownership follows the data
//! path - the ingest-boundary counters live with the `SensorIngress`, the
//! decision counters here with the engine's worker path - and nothing
//! outside the owner ever mutates them.
//!
//! Drops (queue overflow, emission shedding) are deliberately *not* logged
//! per event - at the rates where they happen, logging would itself be the
//! overload. They only surface here, in aggregate.

use core::sync::atomic::{AtomicU32, Ordering};

/// Decision counters owned by the engine's worker path
#[derive(Debug, Default)]
pub struct TelemetryCounters {
    /// Cross-sensor matches made
    pub matched: AtomicU32,
    /// Radar events expired unmatched
    pub expired_radar: AtomicU32,
    /// Vision events expired unmatched
    pub expired_vision: AtomicU32,
    /// Events rejected for falling behind the retention horizon
    pub stale: AtomicU32,
    /// Unmatched expiries suppressed by policy (emit_unmatched = false)
    pub suppressed: AtomicU32,
}

impl TelemetryCounters {
    pub const fn new() -> Self {
        Self {
            matched: AtomicU32::new(0),
            expired_radar: AtomicU32::new(0),
            expired_vision: AtomicU32::new(0),
            stale: AtomicU32::new(0),
            suppressed: AtomicU32::new(0),
        }
    }

    pub fn bump(counter: &AtomicU32) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn read(counter: &AtomicU32) -> u32 {
        counter.load(Ordering::Relaxed)
    }
}

/// Point-in-time view of all engine counters
///
/// Plain `Copy` data, safe to hand to a metrics endpoint or health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TelemetrySnapshot {
    // Ingest boundary
    pub ingested_radar: u32,
    pub ingested_vision: u32,
    pub malformed: u32,

    // Correlation path
    pub matched: u32,
    pub expired_radar: u32,
    pub expired_vision: u32,
    pub stale: u32,
    pub suppressed: u32,

    // Ingest rings
    pub radar_queue_depth: u32,
    pub vision_queue_depth: u32,
    pub radar_queue_displaced: u32,
    pub vision_queue_displaced: u32,

    // Pending buckets
    pub radar_bucket_depth: u32,
    pub vision_bucket_depth: u32,

    // Emission gate
    pub emission_depth: u32,
    pub emission_dropped: u32,
    pub emission_duplicates: u32,
    pub emission_delivered: u32,
}

impl TelemetrySnapshot {
    /// Total raw events accepted across both sensors
    pub fn total_ingested(&self) -> u32 {
        self.ingested_radar + self.ingested_vision
    }

    /// Total raw events shed at the ingest boundary
    pub fn total_displaced(&self) -> u32 {
        self.radar_queue_displaced + self.vision_queue_displaced
    }
}
