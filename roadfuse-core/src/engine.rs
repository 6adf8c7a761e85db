//! Fusion Engine - Serialized Worker Over the Whole Pipeline
//!
//! ## Overview
//!
//! The engine borrows a shared [`SensorIngress`] and exclusively owns every
//! stage after it:
//!
//! ```text
//! SensorIngress (any thread)     FusionEngine::step (worker thread)
//! ┌─────────────────┐     ┌─────────────────────────────────────┐
//! │ validate        │     │ drain rings → correlate → resolve   │
//! │ bounded push    │ ──→ │ sweep deadlines → publish → flush   │
//! └─────────────────┘     └─────────────────────────────────────┘
//! ```
//!
//! Adapters hold `&ingress` (typically a `static`) and push from their own
//! threads; the worker owns the engine and calls [`FusionEngine::step`].
//! The host loop parks until [`FusionEngine::next_deadline`] or the next
//! arrival, whichever is sooner, then steps again. No timers, no threads of
//! our own - the engine composes into whatever scheduling the host already
//! has.
//!
//! ## Fault Containment
//!
//! Malformed events are refused at the ingress; an event that falls behind
//! the retention horizon costs one counter increment and a warning inside
//! the step. Neither ever stops the worker - the loop cannot be wedged by
//! bad input.
//!
//! ## Const-Generic Sizing
//!
//! - `Q`: per-sensor ingest ring hard capacity (power of two); a runtime
//!   soft bound below it lives in [`EngineConfig`]
//! - `B`: per-sensor pending bucket capacity
//! - `E`: emission out-buffer capacity
//! - `D`: fusion-id dedup ring capacity
//!
//! [`DefaultFusionEngine`] picks sizes suited to a single roadside install.

use crate::config::EngineConfig;
use crate::correlator::{CorrelationWindowManager, Decision};
use crate::errors::{ConfigResult, IngestResult};
use crate::events::{RawEvent, SensorKind};
use crate::fusion::FusionResolver;
use crate::gate::EmissionGate;
use crate::ingress::SensorIngress;
use crate::telemetry::{TelemetryCounters, TelemetrySnapshot};
use crate::time::Timestamp;

use core::sync::atomic::Ordering;

/// Engine sized for a single roadside install
pub type DefaultFusionEngine<'a> = FusionEngine<'a, 64, 32, 32, 64>;

/// What one call to [`FusionEngine::step`] did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Raw events drained from the ingest rings
    pub processed: usize,
    /// Correlation decisions made (matches and expiries)
    pub decisions: usize,
    /// Fused records delivered to subscribers
    pub delivered: usize,
}

/// Sensor correlation and fusion engine
///
/// See the module docs for the const parameters. All post-ingress state is
/// owned here and mutated only via `&mut self` on the worker thread; the
/// borrowed ingress stays shareable with producer threads.
pub struct FusionEngine<'a, const Q: usize, const B: usize, const E: usize, const D: usize> {
    ingress: &'a SensorIngress<Q>,
    correlator: CorrelationWindowManager<B>,
    resolver: FusionResolver,
    gate: EmissionGate<E, D>,
    counters: TelemetryCounters,
}

impl<'a, const Q: usize, const B: usize, const E: usize, const D: usize>
    FusionEngine<'a, Q, B, E, D>
{
    /// Build an engine over an ingress from a validated configuration
    ///
    /// The ingress adopts the configuration's overflow knobs.
    pub fn new(config: EngineConfig, ingress: &'a SensorIngress<Q>) -> ConfigResult<Self> {
        config.validate()?;
        ingress.apply_config(&config);

        Ok(Self {
            ingress,
            correlator: CorrelationWindowManager::new(config.correlation_window_ms),
            resolver: FusionResolver::new(&config),
            gate: EmissionGate::new(),
            counters: TelemetryCounters::new(),
        })
    }

    /// Accept one raw event (single-threaded hosts)
    ///
    /// Convenience delegating to [`SensorIngress::ingest`]; adapters running
    /// on their own threads share the ingress handle directly instead.
    pub fn ingest(&self, event: RawEvent) -> IngestResult<()> {
        self.ingress.ingest(event)
    }

    /// Run one pipeline step at the given instant
    ///
    /// Drains both ingest rings through correlation and resolution, sweeps
    /// expiry deadlines that have elapsed by `now`, then flushes the
    /// emission gate. Call from exactly one thread.
    pub fn step(&mut self, now: Timestamp) -> StepReport {
        let Self {
            ingress,
            correlator,
            resolver,
            gate,
            counters,
        } = self;

        let mut report = StepReport::default();

        // Alternate the rings so neither sensor can starve the other
        loop {
            let mut drained_any = false;

            for queue in [&ingress.radar, &ingress.vision] {
                if let Some(event) = queue.pop() {
                    drained_any = true;
                    report.processed += 1;

                    let result = correlator.ingest(event, &mut |decision| {
                        report.decisions += 1;
                        Self::dispatch(resolver, gate, counters, decision);
                    });

                    // Well-formedness was enforced at the ingress; only
                    // retention faults can surface here
                    if let Err(_err) = result {
                        TelemetryCounters::bump(&counters.stale);
                        #[cfg(feature = "log")]
                        {
                            let (radar_depth, vision_depth) = correlator.depths();
                            log::warn!(
                                "event {} rejected: {} (buckets radar={} vision={})",
                                event.id().0,
                                _err,
                                radar_depth,
                                vision_depth,
                            );
                        }
                    }
                }
            }

            if !drained_any {
                break;
            }
        }

        correlator.sweep(now, &mut |decision| {
            report.decisions += 1;
            Self::dispatch(resolver, gate, counters, decision);
        });

        report.delivered = gate.flush();
        report
    }

    /// Force-expire all pending events and flush (graceful shutdown)
    ///
    /// Steps once at `now` to drain the rings first, so nothing accepted
    /// before shutdown is silently lost.
    pub fn shutdown(&mut self, now: Timestamp) -> StepReport {
        let mut report = self.step(now);

        let Self {
            correlator,
            resolver,
            gate,
            counters,
            ..
        } = self;

        correlator.drain(&mut |decision| {
            report.decisions += 1;
            Self::dispatch(resolver, gate, counters, decision);
        });

        report.delivered += gate.flush();
        report
    }

    /// Earliest pending expiry deadline, if any
    ///
    /// The host parks until this instant or the next ingest wakeup.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.correlator.next_deadline()
    }

    /// Adopt new tuning parameters at runtime
    ///
    /// Covers the window, blend knobs, and the ingress overflow bound and
    /// policy; validation failure leaves the running configuration
    /// untouched. Already-buffered events keep the deadlines they were
    /// given.
    pub fn apply_config(&mut self, config: EngineConfig) -> ConfigResult<()> {
        config.validate()?;

        self.ingress.apply_config(&config);
        self.correlator.set_window(config.correlation_window_ms);
        self.resolver.apply_config(&config);
        Ok(())
    }

    /// Register an emission subscriber; returns false if the table is full
    pub fn subscribe(&mut self, subscriber: crate::gate::BoxedSubscriber) -> bool {
        self.gate.subscribe(subscriber)
    }

    /// Pull the next ready fused record (pull-mode consumers)
    pub fn pop_ready(&mut self) -> Option<crate::fusion::FusedDetection> {
        self.gate.pop_ready()
    }

    /// Point-in-time view of all engine counters
    pub fn snapshot(&self) -> TelemetrySnapshot {
        let (radar_depth, vision_depth) = self.correlator.depths();
        let gate_stats = self.gate.stats();

        TelemetrySnapshot {
            ingested_radar: self.ingress.ingested_radar.load(Ordering::Relaxed),
            ingested_vision: self.ingress.ingested_vision.load(Ordering::Relaxed),
            malformed: self.ingress.malformed.load(Ordering::Relaxed),

            matched: TelemetryCounters::read(&self.counters.matched),
            expired_radar: TelemetryCounters::read(&self.counters.expired_radar),
            expired_vision: TelemetryCounters::read(&self.counters.expired_vision),
            stale: TelemetryCounters::read(&self.counters.stale),
            suppressed: TelemetryCounters::read(&self.counters.suppressed),

            radar_queue_depth: self.ingress.radar.len() as u32,
            vision_queue_depth: self.ingress.vision.len() as u32,
            radar_queue_displaced: self
                .ingress
                .radar
                .stats()
                .displaced
                .load(Ordering::Relaxed),
            vision_queue_displaced: self
                .ingress
                .vision
                .stats()
                .displaced
                .load(Ordering::Relaxed),

            radar_bucket_depth: radar_depth as u32,
            vision_bucket_depth: vision_depth as u32,

            emission_depth: self.gate.depth() as u32,
            emission_dropped: gate_stats.dropped.load(Ordering::Relaxed),
            emission_duplicates: gate_stats.duplicates.load(Ordering::Relaxed),
            emission_delivered: gate_stats.delivered.load(Ordering::Relaxed),
        }
    }

    /// One decision through resolution, policy, and the gate
    fn dispatch(
        resolver: &mut FusionResolver,
        gate: &mut EmissionGate<E, D>,
        counters: &TelemetryCounters,
        decision: Decision,
    ) {
        match &decision {
            Decision::Matched { .. } => TelemetryCounters::bump(&counters.matched),
            Decision::Expired(event) => match event.kind() {
                SensorKind::Radar => TelemetryCounters::bump(&counters.expired_radar),
                SensorKind::Vision => TelemetryCounters::bump(&counters.expired_vision),
            },
        }

        match resolver.resolve(decision) {
            Some(detection) => {
                gate.publish(detection);
            }
            None => TelemetryCounters::bump(&counters.suppressed),
        }
    }
}
