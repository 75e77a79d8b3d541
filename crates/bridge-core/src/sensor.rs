//! Sensor event source.
//!
//! The host's sensor framework delivers readings on callback threads the
//! bridge neither owns nor controls. The bridge only asks the host to start
//! and stop streams (through [`SensorHost`]) and gives it a [`SampleSink`]
//! to push readings into.

use crate::queue::{PushOutcome, SampleSink};
use bridge_common::{BridgeError, BridgeResult, SensorType};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// One entry of the host's sensor catalogue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorInfo {
    /// Sensor-type tag.
    pub sensor: SensorType,
    /// Vendor name of the sensor.
    pub name: String,
    /// Shortest supported delivery interval.
    pub min_delay: Duration,
    /// Maximum reading magnitude in the sensor's native unit.
    pub max_range: f32,
}

impl fmt::Display for SensorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}> {} [{} ms, R={}]",
            self.sensor.tag(),
            self.name,
            self.min_delay.as_millis(),
            self.max_range
        )
    }
}

/// Render a sensor catalogue, one sensor per line.
#[must_use]
pub fn describe_sensors(sensors: &[SensorInfo]) -> String {
    sensors.iter().map(|s| format!("{s}\n")).collect()
}

/// Sensor framework abstraction implemented by the host adapter.
///
/// The bridge never looks anything up in the host runtime itself; the
/// adapter injects this capability at construction.
pub trait SensorHost: Send {
    /// Hand over the sink that delivered readings must be pushed into.
    ///
    /// Called once per bridge initialization, before any `enable`.
    fn attach(&mut self, sink: SampleSink);

    /// Sensors the host can deliver.
    fn sensors(&self) -> Vec<SensorInfo>;

    /// Start (or re-rate) delivery of `sensor` at roughly `rate`.
    fn enable(&mut self, sensor: SensorType, rate: Duration) -> BridgeResult<()>;

    /// Stop delivery of `sensor`.
    fn disable(&mut self, sensor: SensorType) -> BridgeResult<()>;

    /// Whether the host lists `sensor` in its catalogue.
    fn supports(&self, sensor: SensorType) -> bool {
        self.sensors().iter().any(|s| s.sensor == sensor)
    }
}

/// Tracks which sensors are enabled and at what rate.
#[derive(Debug)]
pub struct SensorEventSource<H: SensorHost> {
    host: H,
    enabled: BTreeMap<SensorType, Duration>,
}

impl<H: SensorHost> SensorEventSource<H> {
    /// Wrap a host sensor framework.
    pub fn new(host: H) -> Self {
        Self {
            host,
            enabled: BTreeMap::new(),
        }
    }

    /// Give the host the sink its callbacks push into.
    pub fn attach(&mut self, sink: SampleSink) {
        self.host.attach(sink);
    }

    /// Request delivery of `sensor` at approximately `rate`.
    ///
    /// Re-enabling with a different rate updates the rate; the same rate is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::InvalidPeriod`] for a zero rate.
    /// - [`BridgeError::UnsupportedSensor`] if the host does not list the
    ///   sensor. Nothing is enabled in that case.
    /// - Whatever the host reports when starting the stream.
    pub fn enable(&mut self, sensor: SensorType, rate: Duration) -> BridgeResult<()> {
        if rate.is_zero() {
            return Err(BridgeError::InvalidPeriod(format!(
                "sensor rate for {sensor} must be non-zero"
            )));
        }
        if !self.host.supports(sensor) {
            warn!(%sensor, "Sensor not available on this host");
            return Err(BridgeError::UnsupportedSensor(sensor));
        }
        if self.enabled.get(&sensor) == Some(&rate) {
            trace!(%sensor, "Sensor already enabled at requested rate");
            return Ok(());
        }

        self.host.enable(sensor, rate)?;
        let previous = self.enabled.insert(sensor, rate);
        match previous {
            Some(old) => debug!(
                %sensor,
                old_ms = old.as_millis(),
                new_ms = rate.as_millis(),
                "Sensor rate updated"
            ),
            None => info!(%sensor, rate_ms = rate.as_millis(), "Sensor enabled"),
        }
        Ok(())
    }

    /// Stop delivery of `sensor`; a no-op if it is not enabled.
    ///
    /// # Errors
    ///
    /// Returns whatever the host reports when stopping the stream; the
    /// sensor stays marked enabled in that case.
    pub fn disable(&mut self, sensor: SensorType) -> BridgeResult<()> {
        if !self.enabled.contains_key(&sensor) {
            trace!(%sensor, "Disable of inactive sensor ignored");
            return Ok(());
        }
        self.host.disable(sensor)?;
        self.enabled.remove(&sensor);
        info!(%sensor, "Sensor disabled");
        Ok(())
    }

    /// Disable every enabled sensor.
    ///
    /// Keeps going after a host failure and reports the first one.
    ///
    /// # Errors
    ///
    /// Returns the first host error encountered.
    pub fn disable_all(&mut self) -> BridgeResult<()> {
        let sensors: Vec<SensorType> = self.enabled.keys().copied().collect();
        let mut first_err = None;
        for sensor in sensors {
            if let Err(e) = self.disable(sensor) {
                warn!(%sensor, error = %e, "Failed to disable sensor");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Currently enabled sensors and their rates.
    #[must_use]
    pub fn enabled(&self) -> Vec<(SensorType, Duration)> {
        self.enabled.iter().map(|(s, r)| (*s, *r)).collect()
    }

    /// Whether `sensor` is enabled.
    #[must_use]
    pub fn is_enabled(&self, sensor: SensorType) -> bool {
        self.enabled.contains_key(&sensor)
    }

    /// The host's sensor catalogue.
    #[must_use]
    pub fn sensors(&self) -> Vec<SensorInfo> {
        self.host.sensors()
    }

    /// The wrapped host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The wrapped host, mutably.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

/// A running generator thread for one simulated sensor.
#[derive(Debug)]
struct Generator {
    rate: Duration,
    stop: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Generator {
    fn spawn(sensor: SensorType, rate: Duration, sink: SampleSink) -> BridgeResult<Self> {
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name(format!("sim-sensor-{}", sensor.tag()))
            .spawn(move || {
                debug!(%sensor, "Simulated sensor thread started");
                let mut n: u64 = 0;
                loop {
                    match stopped.recv_timeout(rate) {
                        Err(RecvTimeoutError::Timeout) => {
                            sink.deliver(sensor, simulated_reading(sensor, n));
                            n = n.wrapping_add(1);
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!(%sensor, samples = n, "Simulated sensor thread stopped");
            })
            .map_err(|e| BridgeError::Host(format!("failed to spawn sensor thread: {e}")))?;

        Ok(Self {
            rate,
            stop,
            handle: Some(handle),
        })
    }

    fn stop(mut self) {
        // The thread may already have exited; a closed channel is fine
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Simulated sensor thread panicked");
            }
        }
    }
}

/// Deterministic waveform around a plausible resting value.
fn simulated_reading(sensor: SensorType, n: u64) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    let phase = (n % 16) as f32 / 16.0;
    let wave = (phase * std::f32::consts::TAU).sin();
    match sensor {
        SensorType::ACCELEROMETER => 9.81 + wave,
        SensorType::AMBIENT_TEMPERATURE => 21.0 + wave * 0.5,
        SensorType::PRESSURE => 1013.25 + wave * 2.0,
        SensorType::RELATIVE_HUMIDITY => 45.0 + wave * 5.0,
        _ => wave,
    }
}

/// In-memory sensor host for tests and the daemon's simulated mode.
///
/// With generators enabled, every enabled sensor gets its own thread that
/// delivers a waveform at the requested rate, mimicking a host that calls
/// back on threads of its own. [`emit`](Self::emit) delivers single samples
/// from the caller's thread.
#[derive(Debug)]
pub struct SimulatedSensorHost {
    catalogue: Vec<SensorInfo>,
    sink: Option<SampleSink>,
    rates: BTreeMap<SensorType, Duration>,
    generators: BTreeMap<SensorType, Generator>,
    spawn_generators: bool,
}

impl Default for SimulatedSensorHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSensorHost {
    /// Host with the default catalogue and generator threads.
    #[must_use]
    pub fn new() -> Self {
        Self::with_catalogue(default_catalogue())
    }

    /// Host with the default catalogue and no generator threads; samples
    /// only arrive through [`emit`](Self::emit).
    #[must_use]
    pub fn manual() -> Self {
        let mut host = Self::new();
        host.spawn_generators = false;
        host
    }

    /// Host with a custom catalogue and generator threads.
    #[must_use]
    pub fn with_catalogue(catalogue: Vec<SensorInfo>) -> Self {
        Self {
            catalogue,
            sink: None,
            rates: BTreeMap::new(),
            generators: BTreeMap::new(),
            spawn_generators: true,
        }
    }

    /// Deliver one reading as if a host callback fired.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Host`] if no sink has been attached yet.
    pub fn emit(&self, sensor: SensorType, raw: f32) -> BridgeResult<PushOutcome> {
        let sink = self
            .sink
            .as_ref()
            .ok_or_else(|| BridgeError::Host("no sample sink attached".into()))?;
        Ok(sink.deliver(sensor, raw))
    }

    /// Rate the host was last asked to deliver `sensor` at.
    #[must_use]
    pub fn rate(&self, sensor: SensorType) -> Option<Duration> {
        self.rates.get(&sensor).copied()
    }

    /// Number of live generator threads.
    #[must_use]
    pub fn running_generators(&self) -> usize {
        self.generators.len()
    }

    fn stop_generator(&mut self, sensor: SensorType) {
        if let Some(generator) = self.generators.remove(&sensor) {
            trace!(%sensor, rate_ms = generator.rate.as_millis(), "Stopping generator");
            generator.stop();
        }
    }
}

impl SensorHost for SimulatedSensorHost {
    fn attach(&mut self, sink: SampleSink) {
        self.sink = Some(sink);
    }

    fn sensors(&self) -> Vec<SensorInfo> {
        self.catalogue.clone()
    }

    fn enable(&mut self, sensor: SensorType, rate: Duration) -> BridgeResult<()> {
        if self.spawn_generators {
            let sink = self
                .sink
                .clone()
                .ok_or_else(|| BridgeError::Host("no sample sink attached".into()))?;
            // The old stream keeps running until its replacement is up
            let generator = Generator::spawn(sensor, rate, sink)?;
            if let Some(previous) = self.generators.insert(sensor, generator) {
                previous.stop();
            }
        }
        self.rates.insert(sensor, rate);
        Ok(())
    }

    fn disable(&mut self, sensor: SensorType) -> BridgeResult<()> {
        self.rates.remove(&sensor);
        self.stop_generator(sensor);
        Ok(())
    }
}

impl Drop for SimulatedSensorHost {
    fn drop(&mut self) {
        let sensors: Vec<SensorType> = self.generators.keys().copied().collect();
        for sensor in sensors {
            self.stop_generator(sensor);
        }
    }
}

/// The four environment sensors a typical handset exposes.
#[must_use]
pub fn default_catalogue() -> Vec<SensorInfo> {
    vec![
        SensorInfo {
            sensor: SensorType::ACCELEROMETER,
            name: "Simulated Accelerometer".into(),
            min_delay: Duration::from_millis(10),
            max_range: 78.45,
        },
        SensorInfo {
            sensor: SensorType::PRESSURE,
            name: "Simulated Barometer".into(),
            min_delay: Duration::from_millis(40),
            max_range: 1100.0,
        },
        SensorInfo {
            sensor: SensorType::RELATIVE_HUMIDITY,
            name: "Simulated Hygrometer".into(),
            min_delay: Duration::from_millis(200),
            max_range: 100.0,
        },
        SensorInfo {
            sensor: SensorType::AMBIENT_TEMPERATURE,
            name: "Simulated Thermometer".into(),
            min_delay: Duration::from_millis(200),
            max_range: 85.0,
        },
    ]
}
