//! Error types for protocol parsing and command synthesis

use thiserror::Error;

/// Errors that can occur when parsing radar packets
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Packet is too short to contain required data
    #[error("Packet too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    /// Packet header doesn't match expected format
    #[error("Invalid header: expected {expected:02X?}, got {actual:02X?}")]
    InvalidHeader {
        expected: Vec<u8>,
        actual: Vec<u8>,
    },

    /// Report id not in the documented set
    #[error("Unknown report id {0:#06X}")]
    UnknownReport(u16),

    /// Invalid packet data
    #[error("Invalid packet: {0}")]
    InvalidPacket(String),

    /// Failed to deserialize packet structure
    #[error("Deserialization failed: {0}")]
    Deserialization(String),
}

impl From<bincode::Error> for ParseError {
    fn from(e: bincode::Error) -> Self {
        ParseError::Deserialization(e.to_string())
    }
}

/// Errors returned when a control command cannot be synthesised.
///
/// These are programmer errors and are surfaced to the caller; nothing is
/// sent on the wire when one occurs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    /// Control name not in the command table
    #[error("Unknown control {0:?}")]
    UnknownControl(String),

    /// Numeric value outside the control's documented range
    #[error("{name}: value {value} is outside [{min}, {max}]")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Value isn't a valid number or enum option for this control
    #[error("{name}: invalid value {value:?}")]
    InvalidValue { name: String, value: String },
}
