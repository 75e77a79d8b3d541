//! Configuration structures for the event bridge.
//!
//! Supports TOML deserialization with sensible defaults so that a host
//! adapter can start with no file at all and override only what it needs.

use crate::types::{SensorType, WordId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level bridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Periodic interrupt configuration.
    pub interrupts: InterruptConfig,

    /// Interpreter cycle configuration.
    pub interpreter: InterpreterConfig,

    /// Sample queue configuration.
    pub samples: SampleConfig,

    /// Sensor configuration.
    pub sensors: SensorConfig,
}

/// Periodic interrupt configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterruptConfig {
    /// Wall-clock duration represented by one tick of the tick source.
    #[serde(with = "humantime_serde")]
    pub base_period: Duration,

    /// Interrupt words registered when the bridge is initialized.
    pub register: Vec<IsrRegistration>,
}

impl Default for InterruptConfig {
    fn default() -> Self {
        Self {
            base_period: Duration::from_millis(100),
            register: Vec::new(),
        }
    }
}

/// A boot-time interrupt registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsrRegistration {
    /// Interpreter word to fire.
    pub word: WordId,
    /// Requested firing period.
    #[serde(with = "humantime_serde")]
    pub period: Duration,
}

/// Interpreter cycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Period of the interpreter's poll-and-service cycle.
    #[serde(with = "humantime_serde")]
    pub cycle_period: Duration,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            cycle_period: Duration::from_millis(10),
        }
    }
}

/// Policy applied when a sample arrives at a full queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued record so the newest always lands.
    #[default]
    DropOldest,
    /// Keep the queued records and discard the incoming one.
    RejectNewest,
}

impl std::fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DropOldest => write!(f, "drop_oldest"),
            Self::RejectNewest => write!(f, "reject_newest"),
        }
    }
}

/// Sample queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleConfig {
    /// Maximum number of undrained records.
    pub capacity: usize,

    /// What to do when the queue is full.
    pub overflow: OverflowPolicy,

    /// Multiplier applied to raw readings before encoding.
    pub scale: f32,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            overflow: OverflowPolicy::DropOldest,
            scale: 1.0,
        }
    }
}

/// Sensor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Delivery rate used when an enable request carries no rate.
    #[serde(with = "humantime_serde")]
    pub default_rate: Duration,

    /// Sensors enabled when the bridge is initialized.
    pub enable: Vec<SensorEnable>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            default_rate: Duration::from_secs(1),
            enable: Vec::new(),
        }
    }
}

/// A boot-time sensor enable request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorEnable {
    /// Sensor to enable, by name or tag.
    pub sensor: SensorType,
    /// Requested rate; falls back to `sensors.default_rate`.
    #[serde(
        default,
        with = "humantime_serde::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub rate: Option<Duration>,
}

impl BridgeConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Serialize configuration to TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check values that would make the bridge misbehave at runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interrupts.base_period.is_zero() {
            return Err(ConfigError::Invalid(
                "interrupts.base_period must be non-zero".into(),
            ));
        }
        if self.interpreter.cycle_period.is_zero() {
            return Err(ConfigError::Invalid(
                "interpreter.cycle_period must be non-zero".into(),
            ));
        }
        if self.samples.capacity == 0 {
            return Err(ConfigError::Invalid("samples.capacity must be non-zero".into()));
        }
        if !self.samples.scale.is_finite() || self.samples.scale == 0.0 {
            return Err(ConfigError::Invalid(format!(
                "samples.scale must be finite and non-zero, got {}",
                self.samples.scale
            )));
        }
        if self.sensors.default_rate.is_zero() {
            return Err(ConfigError::Invalid(
                "sensors.default_rate must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Semantically invalid value.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Serde helper module for `Duration` using humantime format.
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => super::serialize(d, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
