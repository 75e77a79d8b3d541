//! Sensor sample scenarios.
//!
//! # Acceptance Criteria
//!
//! - Deliveries reach the interpreter in capture order, encoded
//! - `drain_all` empties the queue and is repeatable
//! - Unsupported sensors are reported, not silently ignored

use super::common::{ms, ready_bridge};
use bridge_common::{BridgeError, SensorType};
use bridge_core::{HostAdapter, SampleRecord};

#[test]
fn test_accelerometer_scenario_preserves_order() {
    let mut bridge = ready_bridge();
    bridge.enable(SensorType::ACCELEROMETER, ms(50)).unwrap();

    let sink = bridge.sample_sink();
    sink.deliver(SensorType(1), 12.0);
    sink.deliver(SensorType(1), -4.0);
    sink.deliver(SensorType(3), 100.0);

    let drained = bridge.drain_all().unwrap();
    assert_eq!(
        drained,
        vec![
            SampleRecord::encode(SensorType(1), 12),
            SampleRecord::encode(SensorType(1), -4),
            SampleRecord::encode(SensorType(3), 100),
        ]
    );

    let decoded: Vec<(u8, i32)> = drained
        .iter()
        .map(|r| ((r.raw() & 0xFF) as u8, r.raw() >> 8))
        .collect();
    assert_eq!(decoded, vec![(1, 12), (1, -4), (3, 100)]);
}

#[test]
fn test_drain_twice_is_empty() {
    let mut bridge = ready_bridge();
    bridge.sample_sink().deliver(SensorType::PRESSURE, 1013.0);

    assert_eq!(bridge.drain_all().unwrap().len(), 1);
    assert!(bridge.drain_all().unwrap().is_empty());
    assert!(bridge.drain_all().unwrap().is_empty());
}

#[test]
fn test_cycle_hands_samples_to_interpreter() {
    let mut bridge = ready_bridge();
    bridge.enable(SensorType::ACCELEROMETER, ms(50)).unwrap();
    let host = bridge.sensor_host();
    host.emit(SensorType::ACCELEROMETER, 12.0).unwrap();
    host.emit(SensorType::ACCELEROMETER, -4.0).unwrap();

    let report = bridge.run_cycle().unwrap();
    assert_eq!(report.samples, 2);

    let records = bridge.interpreter().records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].magnitude(), 12);
    assert_eq!(records[1].magnitude(), -4);
}

#[test]
fn test_unsupported_sensor_is_reported() {
    let mut bridge = ready_bridge();

    assert_eq!(
        bridge.enable(SensorType::PROXIMITY, ms(50)),
        Err(BridgeError::UnsupportedSensor(SensorType::PROXIMITY))
    );
    assert!(bridge.enabled_sensors().unwrap().is_empty());

    let mut host = HostAdapter::new(&mut bridge);
    assert_eq!(
        host.enable_sensor(8, 50_000),
        Err(BridgeError::UnsupportedSensor(SensorType::PROXIMITY))
    );
}

#[test]
fn test_rerate_and_disable() {
    let mut bridge = ready_bridge();

    bridge.enable(SensorType::AMBIENT_TEMPERATURE, ms(1000)).unwrap();
    bridge.enable(SensorType::AMBIENT_TEMPERATURE, ms(200)).unwrap();
    assert_eq!(
        bridge.enabled_sensors().unwrap(),
        vec![(SensorType::AMBIENT_TEMPERATURE, ms(200))]
    );

    bridge.disable(SensorType::AMBIENT_TEMPERATURE).unwrap();
    bridge.disable(SensorType::AMBIENT_TEMPERATURE).unwrap();
    assert!(bridge.enabled_sensors().unwrap().is_empty());
}
