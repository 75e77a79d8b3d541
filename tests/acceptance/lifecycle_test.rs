//! Lifecycle scenarios.
//!
//! # Acceptance Criteria
//!
//! - Nothing but handles and statistics works before `init`
//! - Teardown clears registrations, sensors and queued samples
//! - Two bridges in one process are fully independent

use super::common::{ms, ready_bridge, RecordingInterpreter};
use bridge_common::{BridgeError, BridgeState, SensorType, WordId};
use bridge_core::{BridgeBuilder, SimulatedSensorHost};

#[test]
fn test_uninit_bridge_rejects_operations() {
    let mut bridge = BridgeBuilder::new(RecordingInterpreter::default(), SimulatedSensorHost::manual())
        .build()
        .unwrap();

    assert_eq!(bridge.state(), BridgeState::Uninit);
    assert!(matches!(bridge.drain_all(), Err(BridgeError::NotReady(_))));
    assert!(matches!(bridge.sensors(), Err(BridgeError::NotReady(_))));

    bridge.tick_handle().tick();
    assert_eq!(bridge.stats().ticks, 1);
}

#[test]
fn test_teardown_and_reinit() {
    let mut bridge = ready_bridge();
    let ticks = bridge.tick_handle();
    let sink = bridge.sample_sink();

    bridge.set_period(WordId(4), ms(100)).unwrap();
    bridge.enable(SensorType::PRESSURE, ms(100)).unwrap();
    sink.deliver(SensorType::PRESSURE, 1000.0);
    ticks.tick();

    bridge.teardown().unwrap();
    assert_eq!(bridge.state(), BridgeState::TornDown);
    assert!(bridge.registry().is_empty());
    assert_eq!(bridge.sensor_host().rate(SensorType::PRESSURE), None);

    // Late producer activity between teardown and init
    ticks.tick();
    sink.deliver(SensorType::PRESSURE, 1001.0);

    bridge.init().unwrap();
    assert_eq!(bridge.state(), BridgeState::Ready);
    assert!(bridge.drain_all().unwrap().is_empty());
    assert_eq!(bridge.service().unwrap(), 0);
    assert!(bridge.interpreter().fired.is_empty());

    // Old handles feed the re-initialized bridge
    bridge.set_period(WordId(4), ms(100)).unwrap();
    ticks.tick();
    assert_eq!(bridge.service().unwrap(), 1);
}

#[test]
fn test_independent_instances() {
    let mut first = ready_bridge();
    let mut second = ready_bridge();

    first.set_period(WordId(1), ms(100)).unwrap();
    second.set_period(WordId(1), ms(100)).unwrap();

    first.tick_handle().tick();
    first.sample_sink().deliver(SensorType::LIGHT, 3.0);

    assert_eq!(first.service().unwrap(), 1);
    assert_eq!(second.service().unwrap(), 0);
    assert_eq!(first.drain_all().unwrap().len(), 1);
    assert!(second.drain_all().unwrap().is_empty());
}

#[test]
fn test_stats_account_for_every_sample() {
    let mut bridge = ready_bridge();
    let sink = bridge.sample_sink();

    for i in 0..10 {
        sink.deliver(SensorType::ACCELEROMETER, i as f32);
    }
    bridge.run_cycle().unwrap();
    for i in 0..5 {
        sink.deliver(SensorType::ACCELEROMETER, i as f32);
    }
    bridge.teardown().unwrap();

    let stats = bridge.stats();
    assert_eq!(stats.samples_pushed, 15);
    assert_eq!(stats.samples_drained, 10);
    assert_eq!(stats.samples_dropped, 5);
    assert_eq!(stats.samples_pending(), 0);
}
