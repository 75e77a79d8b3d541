//! Fixed-width sensor sample records.
//!
//! A record is one 32-bit interpreter cell:
//!
//! ```text
//!  31                                  8 7          0
//! ┌─────────────────────────────────────┬────────────┐
//! │ scaled magnitude (signed, 24 bits)  │ sensor tag │
//! └─────────────────────────────────────┴────────────┘
//! ```
//!
//! The interpreter recovers the tag with `0xFF AND` and the magnitude with
//! an arithmetic right shift by 8.

use bridge_common::SensorType;
use static_assertions::const_assert_eq;
use std::fmt;

/// Bits reserved for the sensor tag.
pub const TAG_BITS: u32 = 8;

/// Bits available for the signed magnitude.
pub const MAGNITUDE_BITS: u32 = 24;

const_assert_eq!(TAG_BITS + MAGNITUDE_BITS, i32::BITS);

/// Largest encodable magnitude.
pub const MAGNITUDE_MAX: i32 = (1 << (MAGNITUDE_BITS - 1)) - 1;

/// Smallest encodable magnitude.
pub const MAGNITUDE_MIN: i32 = -(1 << (MAGNITUDE_BITS - 1));

const TAG_MASK: i32 = (1 << TAG_BITS) - 1;

/// One encoded sensor sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleRecord(i32);

impl SampleRecord {
    /// Encode a tag and magnitude, saturating the magnitude into
    /// [`MAGNITUDE_MIN`]`..=`[`MAGNITUDE_MAX`].
    #[must_use]
    pub fn encode(sensor: SensorType, magnitude: i32) -> Self {
        let magnitude = magnitude.clamp(MAGNITUDE_MIN, MAGNITUDE_MAX);
        Self((magnitude << TAG_BITS) | i32::from(sensor.tag()))
    }

    /// Reinterpret a raw cell produced by [`raw`](Self::raw).
    #[must_use]
    pub fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// The encoded cell.
    #[must_use]
    pub fn raw(self) -> i32 {
        self.0
    }

    /// Sensor tag from the low-order bits.
    #[must_use]
    pub fn sensor(self) -> SensorType {
        // Masked to 8 bits, so the cast is lossless
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let tag = (self.0 & TAG_MASK) as u8;
        SensorType(tag)
    }

    /// Scaled magnitude from the high-order bits.
    #[must_use]
    pub fn magnitude(self) -> i32 {
        self.0 >> TAG_BITS
    }
}

impl fmt::Display for SampleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.sensor(), self.magnitude())
    }
}

/// Converts raw host readings into sample records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleEncoder {
    scale: f32,
}

impl Default for SampleEncoder {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

impl SampleEncoder {
    /// Create an encoder that multiplies readings by `scale`.
    #[must_use]
    pub fn new(scale: f32) -> Self {
        Self { scale }
    }

    /// Multiplier applied before rounding.
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Scale and round a raw reading. NaN encodes as zero; out-of-range
    /// values saturate.
    #[must_use]
    pub fn magnitude(&self, raw: f32) -> i32 {
        // `as` saturates at the i32 bounds and maps NaN to 0
        #[allow(clippy::cast_possible_truncation)]
        let scaled = (raw * self.scale).round() as i32;
        scaled.clamp(MAGNITUDE_MIN, MAGNITUDE_MAX)
    }

    /// Encode a raw reading from `sensor`.
    #[must_use]
    pub fn encode(&self, sensor: SensorType, raw: f32) -> SampleRecord {
        SampleRecord::encode(sensor, self.magnitude(raw))
    }
}
