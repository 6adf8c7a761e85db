//! Time handling for the fusion engine
//!
//! Correlation is purely timestamp-based, so the engine never reads a clock
//! directly. Hosts hand it a `TimeSource` (or explicit `now` values), which
//! keeps expiry sweeps deterministic under test:
//! - System clock for deployments with an RTC/NTP
//! - Monotonic counter for boards without wall time
//! - `FixedTime` for replayable tests

/// Timestamp in milliseconds since epoch (or device boot for monotonic)
pub type Timestamp = u64;

/// Source of time for the engine
pub trait TimeSource {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;

    /// Check if this source provides wall clock time (vs monotonic)
    fn is_wall_clock(&self) -> bool;
}

/// Monotonic time source backed by an external counter
///
/// The host is responsible for ticking it from a hardware timer.
#[derive(Debug, Clone, Default)]
pub struct MonotonicClock {
    elapsed_ms: Timestamp,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { elapsed_ms: 0 }
    }

    /// Advance the counter by `ms` (called from the host timer tick)
    pub fn tick(&mut self, ms: u64) {
        self.elapsed_ms += ms;
    }
}

impl TimeSource for MonotonicClock {
    fn now(&self) -> Timestamp {
        self.elapsed_ms
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}

/// System time source (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct SystemClock;

#[cfg(feature = "std")]
impl TimeSource for SystemClock {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime, UNIX_EPOCH};

        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }

    fn is_wall_clock(&self) -> bool {
        true
    }
}

/// Fixed time source for testing
///
/// Expiry sweeps are deterministic given a fixed clock; every integration
/// test drives the engine with one of these.
#[derive(Debug, Clone)]
pub struct FixedTime {
    timestamp: Timestamp,
}

impl FixedTime {
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    pub fn advance(&mut self, ms: u64) {
        self.timestamp += ms;
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}

/// Absolute delta between two timestamps
pub fn delta_ms(a: Timestamp, b: Timestamp) -> u64 {
    if a > b {
        a - b
    } else {
        b - a
    }
}
