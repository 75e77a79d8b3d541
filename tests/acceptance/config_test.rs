//! Configuration file scenarios.

use super::common::{bridge_from_config, ms};
use bridge_common::{BridgeConfig, OverflowPolicy, SensorType, WordId};
use std::io::Write;
use std::path::Path;

#[test]
fn test_shipped_config_parses() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/bridge.toml");
    let config = BridgeConfig::from_file(&path).unwrap();
    config.validate().unwrap();

    assert_eq!(config.interrupts.base_period, ms(100));
    assert_eq!(config.interrupts.register[0].word, WordId(7));
    assert_eq!(config.samples.overflow, OverflowPolicy::DropOldest);
    assert_eq!(config.sensors.enable[0].sensor, SensorType::ACCELEROMETER);
    assert_eq!(config.sensors.enable[1].rate, None);
}

#[test]
fn test_boot_registrations_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[interrupts]
base_period = "100ms"

[[interrupts.register]]
word = 7
period = "350ms"

[sensors]
default_rate = "500ms"

[[sensors.enable]]
sensor = "pressure"

[[sensors.enable]]
sensor = "gyroscope"
rate = "10ms"
"#
    )
    .unwrap();

    let config = BridgeConfig::from_file(file.path()).unwrap();
    let mut bridge = bridge_from_config(config);
    let ticks = bridge.tick_handle();

    assert_eq!(bridge.registry().entry(WordId(7)).unwrap().period_ticks, 3);
    // The simulated host has no gyroscope; it is skipped at boot
    assert_eq!(
        bridge.enabled_sensors().unwrap(),
        vec![(SensorType::PRESSURE, ms(500))]
    );

    for _ in 0..3 {
        ticks.tick();
    }
    assert_eq!(bridge.run_cycle().unwrap().fired, 1);
}
