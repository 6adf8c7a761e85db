//! Raw Detection Events from the Radar and Vision Sensors
//!
//! ## Overview
//!
//! This module defines the canonical event types that enter the fusion
//! engine. Each physical sensor has its own adapter (out of tree) that
//! normalizes the sensor's native output into one of these variants before
//! calling the ingest boundary.
//!
//! ## Design Philosophy
//!
//! The two upstream sources could not be more different:
//!
//! ```text
//! Radar (serial)        Vision (NN classifier)
//!   speed, direction      class, confidence
//!   ~20ms jitter          ~150ms jitter
//!   no classification     no speed
//! ```
//!
//! The original glue passed these around as untyped dictionaries. Here they
//! are a closed tagged union validated once at the ingest boundary and never
//! inspected dynamically again: downstream code exhaustively matches on the
//! variant and the compiler keeps it honest when a field changes.
//!
//! ### Memory Model
//!
//! Events are immutable `Copy` value objects sized to move through the
//! lock-free ingest rings without touching the heap:
//! - `sensor_timestamp` is capture time, assigned by the adapter, immutable
//! - `event_id` is unique per physical observation
//! - worst-case variant stays under 64 bytes (one cache line with headroom)

use crate::errors::{IngestError, IngestResult};
use crate::time::Timestamp;

/// Unique identity of a raw sensor observation
///
/// Assigned by the ingest adapter; never reused. Fused records carry the
/// contributing ids so replay/audit can trace every output back to inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventId(pub u64);

/// Travel direction relative to the radar head
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Direction {
    Approaching = 0,
    Receding = 1,
}

impl Direction {
    /// Get human-readable name
    pub const fn name(&self) -> &'static str {
        match self {
            Direction::Approaching => "approaching",
            Direction::Receding => "receding",
        }
    }
}

/// Vehicle classification from the on-device neural classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum VehicleClass {
    Car = 0,
    Truck = 1,
    Bus = 2,
    Motorcycle = 3,
    Bicycle = 4,
    Pedestrian = 5,
    /// No classification available (radar-only detections)
    Unknown = 6,
}

impl VehicleClass {
    /// Get human-readable name
    pub const fn name(&self) -> &'static str {
        match self {
            VehicleClass::Car => "car",
            VehicleClass::Truck => "truck",
            VehicleClass::Bus => "bus",
            VehicleClass::Motorcycle => "motorcycle",
            VehicleClass::Bicycle => "bicycle",
            VehicleClass::Pedestrian => "pedestrian",
            VehicleClass::Unknown => "unknown",
        }
    }
}

/// Bounding region of a vision detection, in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingRegion {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

/// Motion/speed observation from the radar head
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RadarEvent {
    /// Unique observation id
    pub id: EventId,
    /// Capture timestamp (ms), assigned by the adapter
    pub timestamp: Timestamp,
    /// Measured speed in mph
    pub speed_mph: f32,
    /// Travel direction
    pub direction: Direction,
    /// Raw motion magnitude (sensor units, signal-quality proxy)
    pub magnitude: f32,
}

/// Classification observation from the vision pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VisionEvent {
    /// Unique observation id
    pub id: EventId,
    /// Capture timestamp (ms) of the source frame
    pub timestamp: Timestamp,
    /// Predicted vehicle class
    pub class: VehicleClass,
    /// Classifier confidence in [0, 1]
    pub class_confidence: f32,
    /// Where in the frame the detection landed
    pub region: BoundingRegion,
    /// Source frame for audit/replay
    pub frame_id: u32,
}

/// A single sensor observation, not yet correlated
///
/// Closed union: the engine only ever sees these two shapes, and both are
/// checked by [`RawEvent::check_well_formed`] before they touch a bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RawEvent {
    Radar(RadarEvent),
    Vision(VisionEvent),
}

/// Which sensor stream an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SensorKind {
    Radar = 0,
    Vision = 1,
}

impl SensorKind {
    /// Get human-readable name
    pub const fn name(&self) -> &'static str {
        match self {
            SensorKind::Radar => "radar",
            SensorKind::Vision => "vision",
        }
    }

    /// The other stream (match candidates live in the opposite bucket)
    pub const fn opposite(&self) -> Self {
        match self {
            SensorKind::Radar => SensorKind::Vision,
            SensorKind::Vision => SensorKind::Radar,
        }
    }
}

impl RawEvent {
    /// Get the observation id
    pub fn id(&self) -> EventId {
        match self {
            RawEvent::Radar(e) => e.id,
            RawEvent::Vision(e) => e.id,
        }
    }

    /// Get the capture timestamp
    pub fn timestamp(&self) -> Timestamp {
        match self {
            RawEvent::Radar(e) => e.timestamp,
            RawEvent::Vision(e) => e.timestamp,
        }
    }

    /// Which sensor produced this event
    pub fn kind(&self) -> SensorKind {
        match self {
            RawEvent::Radar(_) => SensorKind::Radar,
            RawEvent::Vision(_) => SensorKind::Vision,
        }
    }

    /// Shape validation applied at the ingest boundary
    ///
    /// Adapters that fail to stamp capture time leave the timestamp at zero,
    /// which is rejected as missing. Staleness relative to the retention
    /// horizon is checked by the window manager, which owns that horizon.
    pub fn check_well_formed(&self) -> IngestResult<()> {
        if self.timestamp() == 0 {
            return Err(IngestError::MissingTimestamp);
        }

        match self {
            RawEvent::Radar(e) => {
                if !e.speed_mph.is_finite() || !e.magnitude.is_finite() || e.magnitude < 0.0 {
                    return Err(IngestError::InvalidReading);
                }
            }
            RawEvent::Vision(e) => {
                if !e.class_confidence.is_finite()
                    || e.class_confidence < 0.0
                    || e.class_confidence > 1.0
                {
                    return Err(IngestError::InvalidConfidence {
                        value: e.class_confidence,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Builder for radar events, used by adapters and tests
pub struct RadarEventBuilder {
    id: EventId,
    timestamp: Timestamp,
    direction: Direction,
    magnitude: f32,
}

impl RadarEventBuilder {
    pub fn new(id: u64, timestamp: Timestamp) -> Self {
        Self {
            id: EventId(id),
            timestamp,
            direction: Direction::Approaching,
            magnitude: 1.0,
        }
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn magnitude(mut self, magnitude: f32) -> Self {
        self.magnitude = magnitude;
        self
    }

    pub fn speed(self, speed_mph: f32) -> RawEvent {
        RawEvent::Radar(RadarEvent {
            id: self.id,
            timestamp: self.timestamp,
            speed_mph,
            direction: self.direction,
            magnitude: self.magnitude,
        })
    }
}

/// Builder for vision events, used by adapters and tests
pub struct VisionEventBuilder {
    id: EventId,
    timestamp: Timestamp,
    region: BoundingRegion,
    frame_id: u32,
}

impl VisionEventBuilder {
    pub fn new(id: u64, timestamp: Timestamp) -> Self {
        Self {
            id: EventId(id),
            timestamp,
            region: BoundingRegion::default(),
            frame_id: 0,
        }
    }

    pub fn region(mut self, region: BoundingRegion) -> Self {
        self.region = region;
        self
    }

    pub fn frame(mut self, frame_id: u32) -> Self {
        self.frame_id = frame_id;
        self
    }

    pub fn detection(self, class: VehicleClass, class_confidence: f32) -> RawEvent {
        RawEvent::Vision(VisionEvent {
            id: self.id,
            timestamp: self.timestamp,
            class,
            class_confidence,
            region: self.region,
            frame_id: self.frame_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_size() {
        // Events move through the ingest rings by value
        assert!(core::mem::size_of::<RawEvent>() <= 64);
    }

    #[test]
    fn builders() {
        let radar = RadarEventBuilder::new(1, 1000)
            .direction(Direction::Receding)
            .magnitude(180.0)
            .speed(35.0);

        assert_eq!(radar.id(), EventId(1));
        assert_eq!(radar.timestamp(), 1000);
        assert_eq!(radar.kind(), SensorKind::Radar);

        let vision = VisionEventBuilder::new(2, 1200)
            .frame(42)
            .detection(VehicleClass::Car, 0.92);

        assert_eq!(vision.kind(), SensorKind::Vision);
        assert_eq!(vision.kind().opposite(), SensorKind::Radar);
    }

    #[test]
    fn missing_timestamp_rejected() {
        let event = RadarEventBuilder::new(1, 0).speed(35.0);
        assert_eq!(
            event.check_well_formed(),
            Err(IngestError::MissingTimestamp)
        );
    }

    #[test]
    fn confidence_bounds_rejected() {
        let event = VisionEventBuilder::new(1, 1000).detection(VehicleClass::Car, 1.5);
        assert!(matches!(
            event.check_well_formed(),
            Err(IngestError::InvalidConfidence { .. })
        ));

        let nan = VisionEventBuilder::new(2, 1000).detection(VehicleClass::Car, f32::NAN);
        assert!(nan.check_well_formed().is_err());
    }

    #[test]
    fn non_finite_radar_rejected() {
        let event = RadarEventBuilder::new(1, 1000).speed(f32::INFINITY);
        assert_eq!(event.check_well_formed(), Err(IngestError::InvalidReading));
    }

    #[test]
    fn class_names() {
        assert_eq!(VehicleClass::Car.name(), "car");
        assert_eq!(VehicleClass::Unknown.name(), "unknown");
        assert_eq!(Direction::Approaching.name(), "approaching");
    }
}
