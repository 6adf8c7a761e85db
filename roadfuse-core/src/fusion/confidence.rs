//! Confidence Scoring for Fused Detections
//!
//! ## Overview
//!
//! Every fused record carries a confidence score that downstream consumers
//! use to rank, filter, or discard detections. The score is where the
//! engine's false-positive suppression lives: isolated detections are
//! demoted rather than discarded, so "low confidence" is informative
//! instead of invisible.
//!
//! ## Scoring Model
//!
//! Two independent sensors agreeing on the same physical event is stronger
//! evidence than either alone. Cross-validated detections therefore use a
//! weighted corroboration product:
//!
//! ```text
//! confidence = 1 - (1 - c_vision)^(2w) · (1 - q_radar)^(2(1-w))
//! ```
//!
//! where `w` is the configurable vision weight. At `w = 0.5` this is the
//! classic independent-corroboration form (always >= either input); raising
//! `w` pulls the result toward the vision classifier, which has the richer
//! semantics of the two.
//!
//! A temporal penalty demotes matches whose delta falls in the upper half
//! of the window - the further apart the observations, the weaker the
//! claim that they are the same vehicle:
//!
//! ```text
//! penalty(Δt) = exp(-k · max(0, Δt/window - 0.5))
//! ```
//!
//! ## Representation
//!
//! Stored as u16 fixed-point (0-65535 maps to 0.0-1.0): deterministic
//! comparisons, byte-identical replay output, and half the size of an f32.

use libm::{expf, powf};

/// Confidence score in [0, 1]
///
/// Fixed-point internally; 0.0 = no confidence, 1.0 = full confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Confidence {
    /// Fixed-point representation (0-65535 maps to 0.0-1.0)
    value: u16,
}

impl Confidence {
    /// No confidence (0%)
    pub const ZERO: Self = Self { value: 0 };

    /// Full confidence (100%)
    pub const FULL: Self = Self { value: 65535 };

    /// Threshold below which a detection is considered noise (1%)
    pub const FLOOR: Self = Self { value: 655 };

    /// Create from floating point value, clamped to [0, 1]
    pub fn from_float(confidence: f32) -> Self {
        let clamped = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            value: (clamped * 65535.0) as u16,
        }
    }

    /// Convert to floating point [0, 1]
    pub fn as_float(&self) -> f32 {
        self.value as f32 / 65535.0
    }

    /// Raw fixed-point value
    pub fn value(&self) -> u16 {
        self.value
    }

    /// Check if the score is below the noise floor
    pub fn is_floor(&self) -> bool {
        *self < Self::FLOOR
    }

    /// Scale by a factor in [0, 1] (penalty application)
    pub fn scaled(&self, factor: f32) -> Self {
        Self::from_float(self.as_float() * factor)
    }
}

/// Weighted corroboration of vision confidence and radar signal quality
///
/// `vision_weight` in [0, 1]; see the module docs for the formula. Inputs
/// are clamped, so the result is always a valid score.
pub fn corroborate(vision_confidence: f32, radar_quality: f32, vision_weight: f32) -> Confidence {
    let cv = vision_confidence.clamp(0.0, 1.0);
    let q = radar_quality.clamp(0.0, 1.0);
    let w = vision_weight.clamp(0.0, 1.0);

    let vision_deficit = powf(1.0 - cv, 2.0 * w);
    let radar_deficit = powf(1.0 - q, 2.0 * (1.0 - w));

    Confidence::from_float(1.0 - vision_deficit * radar_deficit)
}

/// Temporal penalty for matches in the upper half of the window
///
/// Returns a factor in (0, 1]: 1.0 for deltas up to half the window,
/// decaying exponentially beyond that.
pub fn temporal_penalty(delta_ms: u64, window_ms: u64, slope: f32) -> f32 {
    if window_ms == 0 {
        return 1.0;
    }

    let ratio = delta_ms as f32 / window_ms as f32;
    let excess = (ratio - 0.5).max(0.0);
    expf(-slope * excess)
}

/// Normalize a raw radar magnitude into a [0, 1] signal quality
pub fn radar_quality(magnitude: f32, full_scale: f32) -> f32 {
    if !magnitude.is_finite() || magnitude <= 0.0 || full_scale <= 0.0 {
        return 0.0;
    }
    (magnitude / full_scale).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_roundtrip() {
        let score = Confidence::from_float(0.75);
        assert!((score.as_float() - 0.75).abs() < 0.01);

        assert_eq!(Confidence::ZERO.as_float(), 0.0);
        assert!((Confidence::FULL.as_float() - 1.0).abs() < 0.01);
        assert!(Confidence::from_float(0.005).is_floor());
    }

    #[test]
    fn clamping() {
        assert_eq!(Confidence::from_float(1.5), Confidence::FULL);
        assert_eq!(Confidence::from_float(-0.2), Confidence::ZERO);
        assert_eq!(Confidence::from_float(f32::NAN), Confidence::ZERO);
    }

    #[test]
    fn corroboration_exceeds_inputs_at_even_weight() {
        // Plain noisy-or form: agreement lifts above either input
        let fused = corroborate(0.92, 0.5, 0.5);
        assert!(fused.as_float() > 0.92);
        assert!(fused.as_float() < 1.0);
    }

    #[test]
    fn corroboration_favors_vision() {
        let strong_vision = corroborate(0.9, 0.3, 0.7);
        let strong_radar = corroborate(0.3, 0.9, 0.7);
        assert!(
            strong_vision > strong_radar,
            "same inputs swapped: vision-heavy weighting must prefer vision"
        );
    }

    #[test]
    fn penalty_free_in_lower_half_of_window() {
        assert_eq!(temporal_penalty(0, 500, 2.0), 1.0);
        assert_eq!(temporal_penalty(250, 500, 2.0), 1.0);
    }

    #[test]
    fn penalty_decays_in_upper_half() {
        let near = temporal_penalty(300, 500, 2.0);
        let far = temporal_penalty(500, 500, 2.0);

        assert!(near < 1.0);
        assert!(far < near);
        assert!(far > 0.0, "penalty demotes, never zeroes");
    }

    #[test]
    fn quality_normalization() {
        assert_eq!(radar_quality(50.0, 100.0), 0.5);
        assert_eq!(radar_quality(250.0, 100.0), 1.0);
        assert_eq!(radar_quality(-5.0, 100.0), 0.0);
        assert_eq!(radar_quality(f32::NAN, 100.0), 0.0);
    }

    #[test]
    fn scaled_penalty() {
        let score = Confidence::from_float(0.4);
        let penalized = score.scaled(0.8);
        assert!((penalized.as_float() - 0.32).abs() < 0.01);
    }
}
