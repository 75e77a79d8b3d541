use crate::types::SensorType;
use thiserror::Error;

/// Bridge error types covering configuration, lifecycle, and host failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BridgeError {
    /// Configuration or initialization error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The host does not provide the requested sensor.
    #[error("unsupported sensor: {0}")]
    UnsupportedSensor(SensorType),

    /// A raw sensor tag outside the encodable range.
    #[error("invalid sensor type {0} (expected 0..=255)")]
    InvalidSensorType(i64),

    /// A period that cannot be represented (negative, zero where forbidden).
    #[error("invalid period: {0}")]
    InvalidPeriod(String),

    /// Invalid lifecycle transition attempted.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Source state.
        from: String,
        /// Attempted target state.
        to: String,
    },

    /// Operation requires an initialized bridge.
    #[error("bridge not ready: {0}")]
    NotReady(String),

    /// Host sensor framework reported a failure.
    #[error("host error: {0}")]
    Host(String),
}

/// Convenience type alias for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
