//! Identifiers exchanged between the host, the bridge, and the interpreter.
//!
//! Both identifiers are plain integers on the wire: the interpreter hands
//! out word handles, the host sensor framework numbers its sensor types.

use crate::error::BridgeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Handle of an interpreter-defined word used as an interrupt service routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WordId(pub u32);

impl fmt::Display for WordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w#{}", self.0)
    }
}

impl From<u32> for WordId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Sensor-type tag as numbered by the host sensor framework.
///
/// The tag occupies the low byte of an encoded sample record, so only
/// values in `0..=255` are representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SensorType(pub u8);

impl SensorType {
    pub const ACCELEROMETER: Self = Self(1);
    pub const MAGNETIC_FIELD: Self = Self(2);
    pub const ORIENTATION: Self = Self(3);
    pub const GYROSCOPE: Self = Self(4);
    pub const LIGHT: Self = Self(5);
    pub const PRESSURE: Self = Self(6);
    pub const PROXIMITY: Self = Self(8);
    pub const GRAVITY: Self = Self(9);
    pub const LINEAR_ACCELERATION: Self = Self(10);
    pub const ROTATION_VECTOR: Self = Self(11);
    pub const RELATIVE_HUMIDITY: Self = Self(12);
    pub const AMBIENT_TEMPERATURE: Self = Self(13);

    const NAMES: [(Self, &'static str); 12] = [
        (Self::ACCELEROMETER, "accelerometer"),
        (Self::MAGNETIC_FIELD, "magnetic_field"),
        (Self::ORIENTATION, "orientation"),
        (Self::GYROSCOPE, "gyroscope"),
        (Self::LIGHT, "light"),
        (Self::PRESSURE, "pressure"),
        (Self::PROXIMITY, "proximity"),
        (Self::GRAVITY, "gravity"),
        (Self::LINEAR_ACCELERATION, "linear_acceleration"),
        (Self::ROTATION_VECTOR, "rotation_vector"),
        (Self::RELATIVE_HUMIDITY, "relative_humidity"),
        (Self::AMBIENT_TEMPERATURE, "ambient_temperature"),
    ];

    /// Raw tag value.
    #[must_use]
    pub fn tag(self) -> u8 {
        self.0
    }

    /// Canonical lowercase name, if the tag is a well-known type.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        Self::NAMES
            .iter()
            .find(|(ty, _)| *ty == self)
            .map(|(_, name)| *name)
    }

    /// Look up a well-known type by its canonical name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(ty, _)| *ty)
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}({})", self.0),
            None => write!(f, "sensor({})", self.0),
        }
    }
}

impl From<u8> for SensorType {
    fn from(tag: u8) -> Self {
        Self(tag)
    }
}

impl TryFrom<i64> for SensorType {
    type Error = BridgeError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map(Self)
            .map_err(|_| BridgeError::InvalidSensorType(value))
    }
}

impl FromStr for SensorType {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(ty) = Self::from_name(s) {
            return Ok(ty);
        }
        match s.parse::<i64>() {
            Ok(tag) => Self::try_from(tag),
            Err(_) => Err(BridgeError::Config(format!("unknown sensor type '{s}'"))),
        }
    }
}

impl Serialize for SensorType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self.name() {
            Some(name) => serializer.serialize_str(name),
            None => serializer.serialize_u8(self.0),
        }
    }
}

impl<'de> Deserialize<'de> for SensorType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct SensorTypeVisitor;

        impl<'de> Visitor<'de> for SensorTypeVisitor {
            type Value = SensorType;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a sensor name or an integer tag in 0..=255")
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u8::try_from(value)
                    .map(SensorType)
                    .map_err(|_| de::Error::custom(format!("sensor tag {value} out of range")))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                SensorType::try_from(value).map_err(de::Error::custom)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                value.parse().map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(SensorTypeVisitor)
    }
}
