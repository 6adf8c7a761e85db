//! Shared Ingest Boundary Between Sensor Adapters and the Engine
//!
//! ## Overview
//!
//! Adapter threads and the correlation worker meet here. The ingress owns
//! the per-sensor lock-free rings and is `Sync`, so each adapter holds a
//! plain shared reference while the worker exclusively owns the
//! `FusionEngine` that drains it:
//!
//! ```text
//! radar adapter thread  ──→ &ingress ──┐
//!                                      ├──→ FusionEngine::step (worker)
//! vision adapter thread ──→ &ingress ──┘
//! ```
//!
//! Construction is `const`, so the canonical deployment is a `static`:
//!
//! ```no_run
//! use roadfuse_core::ingress::SensorIngress;
//!
//! static INGRESS: SensorIngress<64> = SensorIngress::new();
//! ```
//!
//! ## Overflow Policy
//!
//! The const-generic ring capacity is the hard ceiling; on top of it the
//! ingress enforces a runtime soft bound and shedding policy, both
//! hot-reloadable through `FusionEngine::apply_config` (plain atomics, so
//! reconfiguration never stalls a producer). Shed events are counted in the
//! ring statistics, never individually logged.

use core::sync::atomic::{AtomicU32, AtomicU8, AtomicUsize, Ordering};

use crate::config::{DropPolicy, EngineConfig};
use crate::errors::IngestResult;
use crate::events::{RawEvent, SensorKind};
use crate::queue::IngestQueue;

const POLICY_DISPLACE_OLDEST: u8 = 0;
const POLICY_REJECT_NEWEST: u8 = 1;

const fn policy_code(policy: DropPolicy) -> u8 {
    match policy {
        DropPolicy::DisplaceOldest => POLICY_DISPLACE_OLDEST,
        DropPolicy::RejectNewest => POLICY_REJECT_NEWEST,
    }
}

/// Validating front door to the per-sensor ingest rings
///
/// `Q` is the hard per-sensor ring capacity (power of two). Shareable across
/// threads; all state is atomics and the lock-free rings.
pub struct SensorIngress<const Q: usize> {
    pub(crate) radar: IngestQueue<RawEvent, Q>,
    pub(crate) vision: IngestQueue<RawEvent, Q>,

    /// Radar events accepted and enqueued
    pub(crate) ingested_radar: AtomicU32,
    /// Vision events accepted and enqueued
    pub(crate) ingested_vision: AtomicU32,
    /// Events rejected as malformed at this boundary
    pub(crate) malformed: AtomicU32,

    soft_capacity: AtomicUsize,
    drop_policy: AtomicU8,
}

impl<const Q: usize> SensorIngress<Q> {
    /// Create an ingress with the hard ring bound and drop-oldest shedding
    ///
    /// Can be used in static context.
    pub const fn new() -> Self {
        Self {
            radar: IngestQueue::new(),
            vision: IngestQueue::new(),
            ingested_radar: AtomicU32::new(0),
            ingested_vision: AtomicU32::new(0),
            malformed: AtomicU32::new(0),
            soft_capacity: AtomicUsize::new(usize::MAX),
            drop_policy: AtomicU8::new(POLICY_DISPLACE_OLDEST),
        }
    }

    /// Accept one raw event from a sensor adapter
    ///
    /// Lock-free, never blocks: malformed events are rejected here, before
    /// they cost a ring slot, and a ring at its bound sheds per the
    /// configured [`DropPolicy`] (counted, not an error - load shedding is
    /// the adapter's signal to slow down, not to retry).
    pub fn ingest(&self, event: RawEvent) -> IngestResult<()> {
        if let Err(err) = event.check_well_formed() {
            self.malformed.fetch_add(1, Ordering::Relaxed);
            return Err(err);
        }

        let (queue, ingested) = match event.kind() {
            SensorKind::Radar => (&self.radar, &self.ingested_radar),
            SensorKind::Vision => (&self.vision, &self.ingested_vision),
        };

        let soft = self.soft_capacity.load(Ordering::Relaxed);
        match self.drop_policy() {
            DropPolicy::DisplaceOldest => {
                queue.push_bounded(event, soft);
                ingested.fetch_add(1, Ordering::Relaxed);
            }
            DropPolicy::RejectNewest => {
                if queue.len() >= soft || !queue.push(event) {
                    // Shed the newcomer; buffered events keep their slots
                    queue.stats().displaced.fetch_add(1, Ordering::Relaxed);
                } else {
                    ingested.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        Ok(())
    }

    /// Adopt the overflow knobs from a validated configuration
    ///
    /// Called by `FusionEngine::apply_config`; safe to call while producers
    /// are pushing.
    pub fn apply_config(&self, config: &EngineConfig) {
        self.soft_capacity
            .store(config.ingest_soft_capacity, Ordering::Relaxed);
        self.drop_policy
            .store(policy_code(config.drop_policy), Ordering::Relaxed);
    }

    /// Currently configured shedding policy
    pub fn drop_policy(&self) -> DropPolicy {
        match self.drop_policy.load(Ordering::Relaxed) {
            POLICY_REJECT_NEWEST => DropPolicy::RejectNewest,
            _ => DropPolicy::DisplaceOldest,
        }
    }

    /// Current ring depths (radar, vision)
    pub fn depths(&self) -> (usize, usize) {
        (self.radar.len(), self.vision.len())
    }
}

impl<const Q: usize> Default for SensorIngress<Q> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{RadarEventBuilder, VehicleClass, VisionEventBuilder};

    fn radar(id: u64, ts: u64) -> RawEvent {
        RadarEventBuilder::new(id, ts).speed(30.0)
    }

    #[test]
    fn routes_by_sensor_kind() {
        let ingress = SensorIngress::<16>::new();

        ingress.ingest(radar(1, 1000)).unwrap();
        ingress
            .ingest(VisionEventBuilder::new(2, 1100).detection(VehicleClass::Car, 0.9))
            .unwrap();

        assert_eq!(ingress.depths(), (1, 1));
        assert_eq!(ingress.ingested_radar.load(Ordering::Relaxed), 1);
        assert_eq!(ingress.ingested_vision.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn malformed_costs_no_slot() {
        let ingress = SensorIngress::<16>::new();

        assert!(ingress.ingest(radar(1, 0)).is_err());
        assert_eq!(ingress.depths(), (0, 0));
        assert_eq!(ingress.malformed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn soft_capacity_bounds_depth() {
        let ingress = SensorIngress::<16>::new();
        let config = EngineConfig::default().with_ingest_soft_capacity(4);
        ingress.apply_config(&config);

        for i in 0..10 {
            ingress.ingest(radar(i, 1000 + i)).unwrap();
        }

        assert_eq!(ingress.depths().0, 4);
        assert_eq!(ingress.radar.stats().displaced.load(Ordering::Relaxed), 6);
        // Newest survived
        assert_eq!(ingress.radar.pop().unwrap().timestamp(), 1006);
    }

    #[test]
    fn reject_newest_keeps_buffered_events() {
        let ingress = SensorIngress::<16>::new();
        let config = EngineConfig::default()
            .with_ingest_soft_capacity(3)
            .with_drop_policy(crate::config::DropPolicy::RejectNewest);
        ingress.apply_config(&config);

        for i in 0..6 {
            ingress.ingest(radar(i, 1000 + i)).unwrap();
        }

        assert_eq!(ingress.depths().0, 3);
        assert_eq!(ingress.radar.stats().displaced.load(Ordering::Relaxed), 3);
        // Oldest survived this time
        assert_eq!(ingress.radar.pop().unwrap().timestamp(), 1000);
    }

    #[test]
    fn shareable_across_threads() {
        static INGRESS: SensorIngress<64> = SensorIngress::new();

        let producer = std::thread::spawn(|| {
            for i in 0..20u64 {
                INGRESS.ingest(radar(i, 1000 + i)).unwrap();
            }
        });
        for i in 20..40u64 {
            INGRESS
                .ingest(VisionEventBuilder::new(i, 1000 + i).detection(VehicleClass::Car, 0.9))
                .unwrap();
        }
        producer.join().unwrap();

        assert_eq!(INGRESS.depths(), (20, 20));
    }
}
