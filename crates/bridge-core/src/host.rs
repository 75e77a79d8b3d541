//! Integer-typed entry points for a foreign host runtime.
//!
//! A host runtime calls in with plain integers: word ids, sensor tags and
//! periods in its own time units. Everything is range-checked here before
//! it reaches the bridge.

use crate::bridge::Bridge;
use crate::interpreter::Interpreter;
use crate::sensor::{describe_sensors, SensorHost};
use bridge_common::{BridgeError, BridgeResult, SensorType, WordId};
use std::time::Duration;

/// Borrowing adapter translating host calls into bridge operations.
pub struct HostAdapter<'a, I: Interpreter, H: SensorHost> {
    bridge: &'a mut Bridge<I, H>,
}

impl<'a, I: Interpreter, H: SensorHost> HostAdapter<'a, I, H> {
    /// Wrap a bridge for the duration of a host call.
    pub fn new(bridge: &'a mut Bridge<I, H>) -> Self {
        Self { bridge }
    }

    /// Register `word` to fire every `ms` milliseconds; zero removes it.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::Config`] if `word` does not fit a word id.
    /// - [`BridgeError::InvalidPeriod`] for a negative period.
    /// - [`BridgeError::NotReady`] unless the bridge is READY.
    pub fn set_period_ms(&mut self, word: i64, ms: i64) -> BridgeResult<()> {
        let word = word_id(word)?;
        let period = Duration::from_millis(non_negative(ms, "ms")?);
        self.bridge.set_period(word, period)
    }

    /// Enable the sensor with type tag `tag` at `period_us` microseconds.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::InvalidSensorType`] for a tag outside `0..=255`.
    /// - [`BridgeError::InvalidPeriod`] for a negative or zero period.
    /// - [`BridgeError::UnsupportedSensor`] if the host lacks the sensor.
    pub fn enable_sensor(&mut self, tag: i64, period_us: i64) -> BridgeResult<()> {
        let sensor = SensorType::try_from(tag)?;
        let rate = Duration::from_micros(non_negative(period_us, "us")?);
        self.bridge.enable(sensor, rate)
    }

    /// Disable the sensor with type tag `tag`.
    ///
    /// # Errors
    ///
    /// [`BridgeError::InvalidSensorType`] for a tag outside `0..=255`, or
    /// [`BridgeError::NotReady`] unless the bridge is READY.
    pub fn disable_sensor(&mut self, tag: i64) -> BridgeResult<()> {
        let sensor = SensorType::try_from(tag)?;
        self.bridge.disable(sensor)
    }

    /// Change the base tick period to `us` microseconds.
    ///
    /// # Errors
    ///
    /// [`BridgeError::InvalidPeriod`] for a negative or zero period.
    pub fn set_base_period_us(&mut self, us: i64) -> BridgeResult<()> {
        let period = Duration::from_micros(non_negative(us, "us")?);
        self.bridge.set_base_period(period)
    }

    /// Deliver one base tick.
    pub fn tick(&self) {
        self.bridge.tick_handle().tick();
    }

    /// Sensor catalogue as text, one sensor per line.
    ///
    /// # Errors
    ///
    /// [`BridgeError::NotReady`] unless the bridge is READY.
    pub fn sensor_list(&self) -> BridgeResult<String> {
        Ok(describe_sensors(&self.bridge.sensors()?))
    }
}

fn word_id(word: i64) -> BridgeResult<WordId> {
    u32::try_from(word)
        .map(WordId)
        .map_err(|_| BridgeError::Config(format!("word id {word} out of range")))
}

fn non_negative(value: i64, unit: &str) -> BridgeResult<u64> {
    u64::try_from(value)
        .map_err(|_| BridgeError::InvalidPeriod(format!("negative period {value} {unit}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::BridgeBuilder;
    use crate::sample::SampleRecord;
    use crate::sensor::SimulatedSensorHost;

    struct Nop;

    impl Interpreter for Nop {
        fn on_interrupt_fired(&mut self, _word: WordId) {}
        fn on_samples_ready(&mut self, _records: &[SampleRecord]) {}
    }

    fn bridge() -> Bridge<Nop, SimulatedSensorHost> {
        let mut bridge = BridgeBuilder::new(Nop, SimulatedSensorHost::manual())
            .base_period(Duration::from_millis(100))
            .build()
            .unwrap();
        bridge.init().unwrap();
        bridge
    }

    #[test]
    fn test_set_period_ms() {
        let mut bridge = bridge();
        let mut host = HostAdapter::new(&mut bridge);

        host.set_period_ms(7, 350).unwrap();
        host.set_period_ms(9, 200).unwrap();
        host.set_period_ms(9, 0).unwrap();

        let entries = bridge.registry().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].word, WordId(7));
        assert_eq!(entries[0].period_ticks, 3);
    }

    #[test]
    fn test_rejects_out_of_range_arguments() {
        let mut bridge = bridge();
        let mut host = HostAdapter::new(&mut bridge);

        assert!(matches!(host.set_period_ms(-1, 100), Err(BridgeError::Config(_))));
        assert!(matches!(
            host.set_period_ms(1, -100),
            Err(BridgeError::InvalidPeriod(_))
        ));
        assert_eq!(
            host.enable_sensor(256, 1000),
            Err(BridgeError::InvalidSensorType(256))
        );
        assert!(matches!(
            host.enable_sensor(1, -5),
            Err(BridgeError::InvalidPeriod(_))
        ));
        assert!(matches!(
            host.set_base_period_us(0),
            Err(BridgeError::InvalidPeriod(_))
        ));
    }

    #[test]
    fn test_sensor_calls() {
        let mut bridge = bridge();
        let mut host = HostAdapter::new(&mut bridge);

        host.enable_sensor(1, 50_000).unwrap();
        assert_eq!(
            host.enable_sensor(4, 50_000),
            Err(BridgeError::UnsupportedSensor(SensorType::GYROSCOPE))
        );
        host.disable_sensor(13).unwrap();

        let listing = host.sensor_list().unwrap();
        assert!(listing.starts_with("1> "));

        assert_eq!(
            bridge.sensor_host().rate(SensorType::ACCELEROMETER),
            Some(Duration::from_millis(50))
        );
    }

    #[test]
    fn test_base_period_and_tick() {
        let mut bridge = bridge();
        let mut host = HostAdapter::new(&mut bridge);

        host.set_base_period_us(50_000).unwrap();
        host.set_period_ms(2, 100).unwrap();
        host.tick();
        host.tick();

        assert_eq!(bridge.service().unwrap(), 1);
        assert_eq!(bridge.stats().ticks, 2);
    }
}
