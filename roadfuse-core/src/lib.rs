//! Core correlation and fusion engine for RoadFuse
//!
//! Reconciles a Doppler radar stream and an AI-vision detection stream into
//! one fused record per physical vehicle. Designed for roadside units with
//! limited resources.
//!
//! Key constraints:
//! - No heap allocation in the correlation path
//! - Bounded memory everywhere; overload sheds oldest, never blocks
//! - Deterministic decisions under a fixed clock and ingest order
//!
//! ```no_run
//! use roadfuse_core::{DefaultFusionEngine, EngineConfig, SensorIngress};
//! use roadfuse_core::events::{RadarEventBuilder, VehicleClass, VisionEventBuilder};
//!
//! // Adapters on other threads share `&INGRESS`; the worker owns the engine
//! static INGRESS: SensorIngress<64> = SensorIngress::new();
//!
//! let mut engine = DefaultFusionEngine::new(EngineConfig::default(), &INGRESS).unwrap();
//!
//! INGRESS.ingest(RadarEventBuilder::new(1, 1000).speed(35.0)).unwrap();
//! INGRESS.ingest(
//!     VisionEventBuilder::new(2, 1180).detection(VehicleClass::Car, 0.92),
//! ).unwrap();
//!
//! engine.step(1180);
//! if let Some(fused) = engine.pop_ready() {
//!     // One vehicle, cross-validated
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod config;
pub mod correlator;
pub mod engine;
pub mod errors;
pub mod events;
pub mod fusion;
pub mod gate;
pub mod ingress;
pub mod queue;
pub mod telemetry;
pub mod time;

// Public API
pub use config::{DropPolicy, EngineConfig};
pub use engine::{DefaultFusionEngine, FusionEngine, StepReport};
pub use errors::{ConfigError, IngestError};
pub use fusion::{Confidence, FusedDetection, FusionId, ValidationState};
pub use gate::Subscriber;
pub use ingress::SensorIngress;
pub use telemetry::TelemetrySnapshot;

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
