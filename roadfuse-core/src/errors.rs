//! Error Types for Ingest Validation and Engine Configuration
//!
//! ## Design Philosophy
//!
//! Errors here follow the same constraints as the event types they travel
//! with:
//!
//! 1. **Small Size**: every variant is kept minimal (12-16 bytes) since
//!    rejections happen on the ingest hot path.
//!
//! 2. **No Heap Allocation**: all error data is inline - no String, only
//!    numeric payloads and `&'static str`. Deterministic memory usage.
//!
//! 3. **Copy Semantics**: errors implement Copy so adapters can stash or
//!    forward them without move gymnastics.
//!
//! ## Error Categories
//!
//! ### Ingest rejections (`IngestError`)
//!
//! Malformed events are rejected at the ingest boundary and never enter a
//! pending bucket. Rejections are non-fatal; the calling adapter owns
//! upstream correction. Every rejection increments the `malformed` counter.
//!
//! ### Configuration faults (`ConfigError`)
//!
//! Invalid configuration is fatal at startup: the engine refuses to
//! construct rather than run with a nonsensical correlation window.
//!
//! Note that queue-overflow and emission drops are *not* errors - they are
//! accounted load-shedding, surfaced through telemetry counters only.

use thiserror_no_std::Error;

/// Result type for ingest operations
pub type IngestResult<T> = Result<T, IngestError>;

/// Rejection reasons at the ingest boundary - kept small for the hot path
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum IngestError {
    /// Event carries no capture timestamp (adapter bug)
    #[error("Event has no capture timestamp")]
    MissingTimestamp,

    /// Timestamp is older than the oldest retained bucket entry by more
    /// than one correlation window
    #[error("Timestamp {age_ms}ms behind retention horizon ({limit_ms}ms)")]
    StaleTimestamp {
        /// How far behind the oldest retained entry the event is
        age_ms: u64,
        /// The retention limit (one correlation window)
        limit_ms: u64,
    },

    /// Classification confidence outside [0, 1] or NaN
    #[error("Classification confidence {value} outside [0, 1]")]
    InvalidConfidence {
        value: f32,
    },

    /// Speed or motion magnitude is NaN/infinite
    #[error("Radar reading is not a finite number")]
    InvalidReading,
}

/// Result type for configuration validation
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration faults - fatal, detected before the engine starts
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// Correlation window must be positive
    #[error("Correlation window must be positive")]
    ZeroWindow,

    /// Correlation window exceeds the retention the buckets can hold
    #[error("Correlation window {window_ms}ms exceeds maximum {max_ms}ms")]
    WindowTooLarge {
        window_ms: u64,
        max_ms: u64,
    },

    /// Penalty and weight factors must lie in [0, 1]
    #[error("Factor {value} outside [0, 1]: {name}")]
    InvalidFactor {
        name: &'static str,
        value: f32,
    },

    /// Magnitude full-scale must be positive and finite
    #[error("Magnitude full-scale must be positive and finite")]
    InvalidFullScale,

    /// Ingest soft capacity must be at least one
    #[error("Ingest soft capacity must be positive")]
    ZeroSoftCapacity,
}

#[cfg(feature = "defmt")]
impl defmt::Format for IngestError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::MissingTimestamp =>
                defmt::write!(fmt, "missing timestamp"),
            Self::StaleTimestamp { age_ms, limit_ms } =>
                defmt::write!(fmt, "stale by {}ms (limit {}ms)", age_ms, limit_ms),
            Self::InvalidConfidence { value } =>
                defmt::write!(fmt, "confidence {} outside [0,1]", value),
            Self::InvalidReading =>
                defmt::write!(fmt, "non-finite radar reading"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::ZeroWindow =>
                defmt::write!(fmt, "zero correlation window"),
            Self::WindowTooLarge { window_ms, max_ms } =>
                defmt::write!(fmt, "window {}ms exceeds {}ms", window_ms, max_ms),
            Self::InvalidFactor { name, value } =>
                defmt::write!(fmt, "factor {}={} outside [0,1]", name, value),
            Self::InvalidFullScale =>
                defmt::write!(fmt, "bad magnitude full-scale"),
            Self::ZeroSoftCapacity =>
                defmt::write!(fmt, "zero ingest soft capacity"),
        }
    }
}
