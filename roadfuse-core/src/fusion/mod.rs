//! Fusion Resolver - Match Decisions to Fused Detection Records
//!
//! ## Overview
//!
//! The resolver is the second core stage: it turns each correlation
//! decision into the engine's output record, attributing speed to the
//! radar, classification to the vision stream, and blending the two
//! confidence semantics into one score.
//!
//! ```text
//! Matched(radar, vision) ──→ CrossValidated  (corroborated confidence)
//! Expired(vision)        ──→ VisionOnly      (penalized confidence)
//! Expired(radar)         ──→ RadarOnly       (class = Unknown, penalized)
//! ```
//!
//! ## False-Positive Suppression
//!
//! Suppression is confidence-shaped, not binary: an isolated vision
//! detection with no corroborating motion keeps flowing downstream, but
//! demoted below its classifier score, so consumers can distinguish "no
//! vehicle" from "partial sensor data". Whether unmatched events are
//! emitted at all is a policy toggle (`emit_unmatched`); suppressed
//! expiries are still counted.
//!
//! The resolver is pure computation: no I/O, no clock, no allocation.
//! Fusion ids are sequential within a run, so a replay of the same
//! decision sequence produces identical records modulo nothing at all.

pub mod confidence;

pub use confidence::Confidence;

use crate::config::EngineConfig;
use crate::correlator::Decision;
use crate::events::{Direction, EventId, RawEvent, VehicleClass};
use crate::fusion::confidence::{corroborate, radar_quality, temporal_penalty};
use crate::time::{delta_ms, Timestamp};

/// Identity of a fused record, independent of input ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FusionId(pub u64);

/// How a detection was validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValidationState {
    /// Both sensors agreed within the correlation window
    CrossValidated,
    /// Radar motion with no vision corroboration
    RadarOnly,
    /// Vision classification with no radar corroboration
    VisionOnly,
}

impl ValidationState {
    /// Get human-readable name
    pub const fn name(&self) -> &'static str {
        match self {
            ValidationState::CrossValidated => "cross_validated",
            ValidationState::RadarOnly => "radar_only",
            ValidationState::VisionOnly => "vision_only",
        }
    }
}

/// The 1-2 raw observations behind a fused record (replay/audit trail)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceIds {
    pub primary: EventId,
    pub secondary: Option<EventId>,
}

impl SourceIds {
    pub fn single(id: EventId) -> Self {
        Self { primary: id, secondary: None }
    }

    pub fn pair(a: EventId, b: EventId) -> Self {
        Self { primary: a, secondary: Some(b) }
    }

    /// Check whether `id` contributed to this record
    pub fn contains(&self, id: EventId) -> bool {
        self.primary == id || self.secondary == Some(id)
    }
}

/// The engine's reconciled output record
///
/// Created once, immutable thereafter; owned by the emission gate until
/// handed to external consumers.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FusedDetection {
    /// New identity, independent of input ids
    pub fusion_id: FusionId,
    /// Earlier of the two matched capture timestamps, or the single
    /// event's timestamp if unmatched
    pub timestamp: Timestamp,
    /// Classification (Unknown for radar-only records)
    pub vehicle_class: VehicleClass,
    /// Classifier confidence, when vision contributed
    pub class_confidence: Option<Confidence>,
    /// Measured speed, when radar contributed
    pub speed_mph: Option<f32>,
    /// Travel direction, when radar contributed
    pub direction: Option<Direction>,
    /// How this detection was validated
    pub validation: ValidationState,
    /// Blended cross-sensor confidence
    pub fusion_confidence: Confidence,
    /// Contributing raw event ids
    pub sources: SourceIds,
}

/// Turns correlation decisions into fused detection records
///
/// Holds only the tunable blend parameters and the fusion id counter;
/// reconfigurable at runtime via [`FusionResolver::apply_config`].
pub struct FusionResolver {
    window_ms: u64,
    emit_unmatched: bool,
    unmatched_penalty: f32,
    vision_weight: f32,
    temporal_penalty_slope: f32,
    magnitude_full_scale: f32,
    next_fusion_id: u64,
}

impl FusionResolver {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            window_ms: config.correlation_window_ms,
            emit_unmatched: config.emit_unmatched,
            unmatched_penalty: config.unmatched_penalty,
            vision_weight: config.vision_weight,
            temporal_penalty_slope: config.temporal_penalty_slope,
            magnitude_full_scale: config.magnitude_full_scale,
            next_fusion_id: 0,
        }
    }

    /// Adopt new tuning parameters (hot reload); the id counter survives
    pub fn apply_config(&mut self, config: &EngineConfig) {
        self.window_ms = config.correlation_window_ms;
        self.emit_unmatched = config.emit_unmatched;
        self.unmatched_penalty = config.unmatched_penalty;
        self.vision_weight = config.vision_weight;
        self.temporal_penalty_slope = config.temporal_penalty_slope;
        self.magnitude_full_scale = config.magnitude_full_scale;
    }

    /// Resolve one decision into a fused record
    ///
    /// Returns None when the unmatched-emission policy suppresses an
    /// expiry; the caller counts those.
    pub fn resolve(&mut self, decision: Decision) -> Option<FusedDetection> {
        match decision {
            Decision::Matched { radar, vision } => {
                let delta = delta_ms(radar.timestamp, vision.timestamp);
                let quality = radar_quality(radar.magnitude, self.magnitude_full_scale);

                let blended =
                    corroborate(vision.class_confidence, quality, self.vision_weight);
                let penalty =
                    temporal_penalty(delta, self.window_ms, self.temporal_penalty_slope);

                Some(FusedDetection {
                    fusion_id: self.next_id(),
                    timestamp: radar.timestamp.min(vision.timestamp),
                    vehicle_class: vision.class,
                    class_confidence: Some(Confidence::from_float(vision.class_confidence)),
                    speed_mph: Some(radar.speed_mph),
                    direction: Some(radar.direction),
                    validation: ValidationState::CrossValidated,
                    fusion_confidence: blended.scaled(penalty),
                    sources: SourceIds::pair(radar.id, vision.id),
                })
            }

            Decision::Expired(event) => {
                if !self.emit_unmatched {
                    return None;
                }

                Some(match event {
                    RawEvent::Vision(vision) => FusedDetection {
                        fusion_id: self.next_id(),
                        timestamp: vision.timestamp,
                        vehicle_class: vision.class,
                        class_confidence: Some(Confidence::from_float(
                            vision.class_confidence,
                        )),
                        speed_mph: None,
                        direction: None,
                        validation: ValidationState::VisionOnly,
                        // No radar corroboration available this cycle
                        fusion_confidence: Confidence::from_float(vision.class_confidence)
                            .scaled(self.unmatched_penalty),
                        sources: SourceIds::single(vision.id),
                    },
                    RawEvent::Radar(radar) => {
                        let quality =
                            radar_quality(radar.magnitude, self.magnitude_full_scale);
                        FusedDetection {
                            fusion_id: self.next_id(),
                            timestamp: radar.timestamp,
                            vehicle_class: VehicleClass::Unknown,
                            class_confidence: None,
                            speed_mph: Some(radar.speed_mph),
                            direction: Some(radar.direction),
                            validation: ValidationState::RadarOnly,
                            fusion_confidence: Confidence::from_float(quality)
                                .scaled(self.unmatched_penalty),
                            sources: SourceIds::single(radar.id),
                        }
                    }
                })
            }
        }
    }

    fn next_id(&mut self) -> FusionId {
        let id = FusionId(self.next_fusion_id);
        self.next_fusion_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{RadarEventBuilder, RawEvent, VisionEventBuilder};

    fn resolver() -> FusionResolver {
        FusionResolver::new(&EngineConfig::default())
    }

    fn matched(radar_ts: u64, vision_ts: u64, conf: f32, magnitude: f32) -> Decision {
        let radar = match RadarEventBuilder::new(1, radar_ts)
            .magnitude(magnitude)
            .speed(35.0)
        {
            RawEvent::Radar(r) => r,
            _ => unreachable!(),
        };
        let vision = match VisionEventBuilder::new(2, vision_ts)
            .detection(VehicleClass::Car, conf)
        {
            RawEvent::Vision(v) => v,
            _ => unreachable!(),
        };
        Decision::Matched { radar, vision }
    }

    #[test]
    fn matched_pair_is_cross_validated() {
        let mut resolver = resolver();
        let fused = resolver.resolve(matched(1000, 1200, 0.92, 80.0)).unwrap();

        assert_eq!(fused.validation, ValidationState::CrossValidated);
        assert_eq!(fused.timestamp, 1000, "earlier of the two timestamps");
        assert_eq!(fused.vehicle_class, VehicleClass::Car);
        assert_eq!(fused.speed_mph, Some(35.0));
        assert_eq!(fused.direction, Some(Direction::Approaching));
        assert!(fused.sources.contains(EventId(1)));
        assert!(fused.sources.contains(EventId(2)));
    }

    #[test]
    fn corroboration_raises_confidence() {
        let mut resolver = resolver();
        // Delta 200ms of a 500ms window: lower half, no temporal penalty
        let fused = resolver.resolve(matched(1000, 1200, 0.92, 80.0)).unwrap();

        assert!(
            fused.fusion_confidence.as_float() > 0.92,
            "agreement must lift confidence above the vision input, got {}",
            fused.fusion_confidence.as_float()
        );
    }

    #[test]
    fn upper_half_window_match_is_demoted() {
        let mut resolver = resolver();

        let near = resolver.resolve(matched(1000, 1100, 0.9, 80.0)).unwrap();
        let far = resolver.resolve(matched(1000, 1480, 0.9, 80.0)).unwrap();

        assert!(far.fusion_confidence < near.fusion_confidence);
    }

    #[test]
    fn expired_vision_is_discounted() {
        let mut resolver = resolver();
        let event = VisionEventBuilder::new(7, 5000).detection(VehicleClass::Truck, 0.40);
        let fused = resolver.resolve(Decision::Expired(event)).unwrap();

        assert_eq!(fused.validation, ValidationState::VisionOnly);
        assert_eq!(fused.vehicle_class, VehicleClass::Truck);
        assert!(fused.speed_mph.is_none());
        assert!(
            fused.fusion_confidence.as_float() < 0.40,
            "no corroboration: confidence discounted below the input"
        );
    }

    #[test]
    fn expired_radar_has_unknown_class() {
        let mut resolver = resolver();
        let event = RadarEventBuilder::new(9, 3000).magnitude(60.0).speed(28.0);
        let fused = resolver.resolve(Decision::Expired(event)).unwrap();

        assert_eq!(fused.validation, ValidationState::RadarOnly);
        assert_eq!(fused.vehicle_class, VehicleClass::Unknown);
        assert!(fused.class_confidence.is_none());
        assert_eq!(fused.speed_mph, Some(28.0));
    }

    #[test]
    fn suppression_policy_drops_unmatched() {
        let config = EngineConfig::default().with_emit_unmatched(false);
        let mut resolver = FusionResolver::new(&config);

        let event = RadarEventBuilder::new(1, 1000).speed(30.0);
        assert!(resolver.resolve(Decision::Expired(event)).is_none());

        // Matched pairs are unaffected by the policy
        assert!(resolver.resolve(matched(1000, 1100, 0.9, 50.0)).is_some());
    }

    #[test]
    fn fusion_ids_are_sequential() {
        let mut resolver = resolver();

        let a = resolver.resolve(matched(1000, 1100, 0.9, 50.0)).unwrap();
        let b = resolver.resolve(matched(2000, 2100, 0.9, 50.0)).unwrap();

        assert_eq!(a.fusion_id, FusionId(0));
        assert_eq!(b.fusion_id, FusionId(1));
    }

    #[test]
    fn hot_reload_keeps_id_counter() {
        let mut resolver = resolver();
        resolver.resolve(matched(1000, 1100, 0.9, 50.0)).unwrap();

        resolver.apply_config(&EngineConfig::default().with_window_ms(800));
        let next = resolver.resolve(matched(2000, 2100, 0.9, 50.0)).unwrap();
        assert_eq!(next.fusion_id, FusionId(1));
    }
}
