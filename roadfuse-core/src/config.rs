//! Engine Configuration Surface
//!
//! ## Overview
//!
//! The engine owns no configuration source of its own: an external component
//! loads settings (file, environment, remote) and hands the core this typed
//! struct. Validation happens once, up front - an engine is never constructed
//! from a config that fails [`EngineConfig::validate`].
//!
//! Everything here is hot-reloadable through `FusionEngine::apply_config`
//! except queue/bucket capacities, which are const-generic and fixed at
//! construction time (compile-time sizing, same trade as the ingest rings).
//!
//! ## Tuning Notes
//!
//! The correlation window and the blending weights are deployment-tuned:
//! a highway install with the camera far from the radar head wants a wider
//! window than a residential street. Defaults below are the residential
//! starting point.

use crate::errors::{ConfigError, ConfigResult};

/// Upper bound on the correlation window
///
/// Past this, "correlation" stops meaning anything: two sensors ten seconds
/// apart are not looking at the same vehicle.
pub const MAX_WINDOW_MS: u64 = 10_000;

/// What to shed when an ingest ring reaches its capacity bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DropPolicy {
    /// Displace the oldest unprocessed raw event to make room for the new
    /// one (newest data wins)
    #[default]
    DisplaceOldest,
    /// Shed the incoming event and keep what is already buffered (oldest
    /// data wins)
    RejectNewest,
}

/// Typed configuration for the fusion engine
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Maximum timestamp delta (ms) for two cross-sensor events to be
    /// considered the same physical vehicle
    pub correlation_window_ms: u64,

    /// Whether unmatched events are emitted as partial detections after
    /// window expiry, or suppressed (counted either way)
    pub emit_unmatched: bool,

    /// Confidence multiplier applied to detections that expired without
    /// cross-sensor corroboration, in [0, 1]
    pub unmatched_penalty: f32,

    /// Weight given to vision classification confidence in the blend, in
    /// [0, 1]; the radar signal quality gets the remainder
    pub vision_weight: f32,

    /// Slope of the temporal penalty applied when the match delta falls in
    /// the upper half of the window (0 disables the penalty)
    pub temporal_penalty_slope: f32,

    /// Radar magnitude treated as full signal quality; readings at or above
    /// this map to quality 1.0
    pub magnitude_full_scale: f32,

    /// Runtime bound on per-sensor ingest ring depth; the const-generic ring
    /// capacity stays the hard ceiling. `usize::MAX` means hard bound only
    pub ingest_soft_capacity: usize,

    /// What to shed when an ingest ring reaches its bound
    pub drop_policy: DropPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            correlation_window_ms: 500,
            emit_unmatched: true,
            unmatched_penalty: 0.8,
            vision_weight: 0.7,
            temporal_penalty_slope: 2.0,
            magnitude_full_scale: 100.0,
            ingest_soft_capacity: usize::MAX,
            drop_policy: DropPolicy::DisplaceOldest,
        }
    }
}

impl EngineConfig {
    /// Set correlation window
    pub fn with_window_ms(mut self, window_ms: u64) -> Self {
        self.correlation_window_ms = window_ms;
        self
    }

    /// Set unmatched emission policy
    pub fn with_emit_unmatched(mut self, emit: bool) -> Self {
        self.emit_unmatched = emit;
        self
    }

    /// Set unmatched confidence penalty
    pub fn with_unmatched_penalty(mut self, penalty: f32) -> Self {
        self.unmatched_penalty = penalty;
        self
    }

    /// Set vision weight in the confidence blend
    pub fn with_vision_weight(mut self, weight: f32) -> Self {
        self.vision_weight = weight;
        self
    }

    /// Set the runtime ingest ring depth bound
    pub fn with_ingest_soft_capacity(mut self, capacity: usize) -> Self {
        self.ingest_soft_capacity = capacity;
        self
    }

    /// Set the ingest overflow shedding policy
    pub fn with_drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Check the configuration; the engine refuses to start on any error
    pub fn validate(&self) -> ConfigResult<()> {
        if self.correlation_window_ms == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.correlation_window_ms > MAX_WINDOW_MS {
            return Err(ConfigError::WindowTooLarge {
                window_ms: self.correlation_window_ms,
                max_ms: MAX_WINDOW_MS,
            });
        }

        for (name, value) in [
            ("unmatched_penalty", self.unmatched_penalty),
            ("vision_weight", self.vision_weight),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidFactor { name, value });
            }
        }

        if !self.temporal_penalty_slope.is_finite() || self.temporal_penalty_slope < 0.0 {
            return Err(ConfigError::InvalidFactor {
                name: "temporal_penalty_slope",
                value: self.temporal_penalty_slope,
            });
        }

        if !self.magnitude_full_scale.is_finite() || self.magnitude_full_scale <= 0.0 {
            return Err(ConfigError::InvalidFullScale);
        }

        if self.ingest_soft_capacity == 0 {
            return Err(ConfigError::ZeroSoftCapacity);
        }

        Ok(())
    }
}
