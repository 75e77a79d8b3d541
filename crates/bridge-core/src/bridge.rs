//! Bridge context: the explicit owner of the interrupt registry, the sample
//! queue and the sensor source for one interpreter instance.
//!
//! The interpreter cycle is:
//! 1. Fire every due interrupt word
//! 2. Drain the sample queue
//! 3. Hand the drained records to the interpreter
//! 4. Wait for the next cycle deadline
//!
//! Host threads never see the bridge itself. They get a [`TickHandle`] or a
//! [`SampleSink`], both of which stay valid across teardown and re-init.

use crate::interpreter::Interpreter;
use crate::isr::{fire_all, InterruptRegistry, TickOutcome};
use crate::queue::{SampleQueue, SampleSink};
use crate::sample::{SampleEncoder, SampleRecord};
use crate::sensor::{SensorEventSource, SensorHost, SensorInfo};
use bridge_common::{
    BridgeConfig, BridgeError, BridgeResult, BridgeState, BridgeStats, OverflowPolicy,
    SensorType, StateMachine, StatsSnapshot, WordId,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Tick entry point handed to the host's periodic driver.
#[derive(Debug, Clone)]
pub struct TickHandle {
    registry: Arc<InterruptRegistry>,
    stats: Arc<BridgeStats>,
}

impl TickHandle {
    /// Deliver one base tick. Never blocks.
    #[inline]
    pub fn tick(&self) -> TickOutcome {
        let outcome = self.registry.tick();
        self.stats.record_tick(outcome == TickOutcome::Deferred);
        outcome
    }
}

/// Result of a single interpreter cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Cycle number since the last `init`.
    pub cycle: u64,
    /// Interrupt words fired this cycle.
    pub fired: usize,
    /// Sample records handed to the interpreter this cycle.
    pub samples: usize,
    /// Time spent in the cycle.
    pub execution_time: Duration,
}

/// Event-to-interpreter bridge for one interpreter instance.
pub struct Bridge<I: Interpreter, H: SensorHost> {
    registry: Arc<InterruptRegistry>,
    queue: Arc<SampleQueue>,
    encoder: SampleEncoder,
    sensors: SensorEventSource<H>,
    interpreter: I,
    state: StateMachine,
    stats: Arc<BridgeStats>,
    config: BridgeConfig,
    /// Reused across cycles.
    due: Vec<WordId>,
    /// Reused across cycles.
    drained: Vec<SampleRecord>,
    next_deadline: Option<Instant>,
}

impl<I: Interpreter, H: SensorHost> Bridge<I, H> {
    /// Create a bridge in the UNINIT state.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] if `config` fails validation.
    pub fn new(interpreter: I, host: H, config: &BridgeConfig) -> BridgeResult<Self> {
        config
            .validate()
            .map_err(|e| BridgeError::Config(e.to_string()))?;

        let registry = InterruptRegistry::new(config.interrupts.base_period)?;
        let queue = SampleQueue::from_config(&config.samples)?;

        Ok(Self {
            registry: Arc::new(registry),
            queue: Arc::new(queue),
            encoder: SampleEncoder::new(config.samples.scale),
            sensors: SensorEventSource::new(host),
            interpreter,
            state: StateMachine::new(),
            stats: Arc::new(BridgeStats::new()),
            config: config.clone(),
            due: Vec::new(),
            drained: Vec::with_capacity(config.samples.capacity),
            next_deadline: None,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BridgeState {
        self.state.state()
    }

    /// Snapshot of the bridge counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Configuration the bridge was built with.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Handle for the host's tick source.
    pub fn tick_handle(&self) -> TickHandle {
        TickHandle {
            registry: Arc::clone(&self.registry),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Producer handle for host sensor callbacks.
    pub fn sample_sink(&self) -> SampleSink {
        SampleSink::new(Arc::clone(&self.queue), self.encoder, Arc::clone(&self.stats))
    }

    /// The interrupt registry.
    pub fn registry(&self) -> &InterruptRegistry {
        &self.registry
    }

    /// The interpreter.
    pub fn interpreter(&self) -> &I {
        &self.interpreter
    }

    /// The interpreter, mutably.
    pub fn interpreter_mut(&mut self) -> &mut I {
        &mut self.interpreter
    }

    /// The host sensor framework.
    pub fn sensor_host(&self) -> &H {
        self.sensors.host()
    }

    /// Initialize the bridge.
    ///
    /// Resets the counters, discards anything queued since the last
    /// teardown, attaches the sample sink to the host and applies the
    /// boot-time registrations and sensor enables from the configuration.
    /// Boot sensors the host does not support are skipped.
    ///
    /// Transitions UNINIT/TORN_DOWN → READY.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::InvalidStateTransition`] if already READY.
    /// - Any host failure while enabling a boot sensor. The bridge is left
    ///   in its previous state with nothing registered or enabled.
    pub fn init(&mut self) -> BridgeResult<()> {
        let from = self.state.state();
        if !from.can_transition_to(BridgeState::Ready) {
            return Err(BridgeError::InvalidStateTransition {
                from: from.to_string(),
                to: BridgeState::Ready.to_string(),
            });
        }

        info!(from = %from, "Initializing bridge");

        self.stats.reset();
        self.queue.clear();
        self.registry.clear();
        self.registry
            .set_base_period(self.config.interrupts.base_period)?;
        self.next_deadline = None;

        let sink = self.sample_sink();
        self.sensors.attach(sink);

        if let Err(e) = self.apply_boot_config() {
            self.registry.clear();
            if let Err(cleanup) = self.sensors.disable_all() {
                warn!(error = %cleanup, "Failed to disable sensors after init failure");
            }
            return Err(e);
        }

        self.state.transition(BridgeState::Ready)?;

        info!(
            base_period_ms = self.config.interrupts.base_period.as_millis(),
            cycle_period_ms = self.config.interpreter.cycle_period.as_millis(),
            interrupts = self.registry.len(),
            sensors = self.sensors.enabled().len(),
            "Bridge initialized, state: READY"
        );
        Ok(())
    }

    fn apply_boot_config(&mut self) -> BridgeResult<()> {
        for reg in &self.config.interrupts.register {
            self.registry.set_period(reg.word, reg.period);
        }

        let default_rate = self.config.sensors.default_rate;
        for boot in &self.config.sensors.enable {
            let rate = boot.rate.unwrap_or(default_rate);
            match self.sensors.enable(boot.sensor, rate) {
                Ok(()) => {}
                Err(BridgeError::UnsupportedSensor(sensor)) => {
                    info!(%sensor, "Skipping boot sensor not provided by host");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Tear the bridge down.
    ///
    /// Clears the registry, disables every sensor and discards queued
    /// records. Handles stay valid; ticks and pushes arriving afterwards
    /// have no visible effect until the next `init`.
    ///
    /// Transitions READY/UNINIT → TORN_DOWN.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::InvalidStateTransition`] if already torn down.
    /// - The first host failure while disabling sensors. Teardown still
    ///   completes.
    pub fn teardown(&mut self) -> BridgeResult<()> {
        self.state.transition(BridgeState::TornDown)?;

        self.registry.clear();
        let disabled = self.sensors.disable_all();
        let discarded = self.queue.clear();
        self.stats.record_discarded(discarded);
        self.next_deadline = None;

        info!(
            discarded,
            cycles = self.stats.cycles(),
            "Bridge torn down, state: TORN_DOWN"
        );
        disabled
    }

    /// Register, re-register or remove an interrupt word.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotReady`] unless READY.
    pub fn set_period(&mut self, word: WordId, period: Duration) -> BridgeResult<()> {
        self.state.require_ready("set_period")?;
        self.registry.set_period(word, period);
        Ok(())
    }

    /// Change the base tick period. Existing registrations are not rescaled.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotReady`] unless READY, or
    /// [`BridgeError::InvalidPeriod`] for a zero period.
    pub fn set_base_period(&mut self, base_period: Duration) -> BridgeResult<()> {
        self.state.require_ready("set_base_period")?;
        self.registry.set_base_period(base_period)
    }

    /// Fire every due interrupt word; returns how many fired.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotReady`] unless READY.
    pub fn service(&mut self) -> BridgeResult<usize> {
        self.state.require_ready("service")?;
        Ok(self.fire_due())
    }

    fn fire_due(&mut self) -> usize {
        if self.registry.collect_due(&mut self.due) == 0 {
            return 0;
        }
        let fired = fire_all(&self.due, &mut self.interpreter);
        self.stats.record_fired(fired);
        fired
    }

    /// Remove and return every queued record, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotReady`] unless READY.
    pub fn drain_all(&mut self) -> BridgeResult<Vec<SampleRecord>> {
        self.state.require_ready("drain_all")?;
        let records = self.queue.drain_all();
        self.stats.record_drained(records.len());
        Ok(records)
    }

    /// Request delivery of `sensor` at approximately `rate`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotReady`] unless READY,
    /// [`BridgeError::UnsupportedSensor`] if the host lacks the sensor, or
    /// [`BridgeError::InvalidPeriod`] for a zero rate.
    pub fn enable(&mut self, sensor: SensorType, rate: Duration) -> BridgeResult<()> {
        self.state.require_ready("enable")?;
        self.sensors.enable(sensor, rate)
    }

    /// Stop delivery of `sensor`; a no-op if it is not enabled.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotReady`] unless READY, or a host failure.
    pub fn disable(&mut self, sensor: SensorType) -> BridgeResult<()> {
        self.state.require_ready("disable")?;
        self.sensors.disable(sensor)
    }

    /// The host's sensor catalogue.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotReady`] unless READY.
    pub fn sensors(&self) -> BridgeResult<Vec<SensorInfo>> {
        self.state.require_ready("sensors")?;
        Ok(self.sensors.sensors())
    }

    /// Currently enabled sensors and their rates.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotReady`] unless READY.
    pub fn enabled_sensors(&self) -> BridgeResult<Vec<(SensorType, Duration)>> {
        self.state.require_ready("enabled_sensors")?;
        Ok(self.sensors.enabled())
    }

    /// Run one interpreter cycle: service interrupts, then drain the queue
    /// and hand any records to the interpreter.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotReady`] unless READY.
    pub fn run_cycle(&mut self) -> BridgeResult<CycleReport> {
        self.state.require_ready("run_cycle")?;
        let cycle_start = Instant::now();

        let fired = self.fire_due();

        self.drained.clear();
        let samples = self.queue.drain_into(&mut self.drained);
        if samples > 0 {
            self.interpreter.on_samples_ready(&self.drained);
            self.stats.record_drained(samples);
        }

        let execution_time = cycle_start.elapsed();
        self.stats.record_cycle(execution_time);
        let cycle = self.stats.cycles();

        trace!(
            cycle,
            fired,
            samples,
            execution_us = execution_time.as_micros(),
            "Cycle complete"
        );

        Ok(CycleReport {
            cycle,
            fired,
            samples,
            execution_time,
        })
    }

    /// Sleep until the next cycle deadline.
    ///
    /// Deadlines advance by the configured cycle period. A caller that
    /// falls more than a full period behind is resynchronized to now
    /// instead of running a burst of catch-up cycles.
    pub fn wait_next_cycle(&mut self) {
        let period = self.config.interpreter.cycle_period;
        let now = Instant::now();
        let deadline = self.next_deadline.unwrap_or(now + period);

        if deadline > now {
            std::thread::sleep(deadline - now);
        }

        let mut next = deadline + period;
        let after = Instant::now();
        if next <= after {
            debug!(
                behind_us = (after - next).as_micros(),
                "Interpreter cycle fell behind, resynchronizing"
            );
            next = after + period;
        }
        self.next_deadline = Some(next);
    }
}

/// Builder for configuring a bridge.
pub struct BridgeBuilder<I: Interpreter, H: SensorHost> {
    interpreter: I,
    host: H,
    config: BridgeConfig,
}

impl<I: Interpreter, H: SensorHost> BridgeBuilder<I, H> {
    /// Create a builder with default configuration.
    pub fn new(interpreter: I, host: H) -> Self {
        Self {
            interpreter,
            host,
            config: BridgeConfig::default(),
        }
    }

    /// Replace the full configuration.
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the base tick period.
    pub fn base_period(mut self, period: Duration) -> Self {
        self.config.interrupts.base_period = period;
        self
    }

    /// Set the interpreter cycle period.
    pub fn cycle_period(mut self, period: Duration) -> Self {
        self.config.interpreter.cycle_period = period;
        self
    }

    /// Set the sample queue capacity.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.samples.capacity = capacity;
        self
    }

    /// Set the sample queue overflow policy.
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.config.samples.overflow = policy;
        self
    }

    /// Set the reading scale factor.
    pub fn scale(mut self, scale: f32) -> Self {
        self.config.samples.scale = scale;
        self
    }

    /// Register an interrupt word at init.
    pub fn register(mut self, word: WordId, period: Duration) -> Self {
        self.config
            .interrupts
            .register
            .push(bridge_common::IsrRegistration { word, period });
        self
    }

    /// Enable a sensor at init.
    pub fn enable_sensor(mut self, sensor: SensorType, rate: Option<Duration>) -> Self {
        self.config
            .sensors
            .enable
            .push(bridge_common::SensorEnable { sensor, rate });
        self
    }

    /// Build the bridge (UNINIT).
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] if the configuration is invalid.
    pub fn build(self) -> BridgeResult<Bridge<I, H>> {
        Bridge::new(self.interpreter, self.host, &self.config)
    }
}
