//! Error types for the broute library.

use std::time::Duration;

use thiserror::Error;

/// The main error type for broute operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Serial port error.
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No complete line arrived before the read deadline.
    #[error("read timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The modem answered a command with a failure status.
    #[error("command {command} rejected: {status}")]
    CommandRejected {
        command: &'static str,
        status: String,
    },

    /// The modem sent a line that does not fit the current exchange.
    #[error("unexpected line (expected {expected}): {line:?}")]
    UnexpectedLine {
        expected: &'static str,
        line: String,
    },

    /// No network found after every scan attempt.
    #[error("no smart meter found after {attempts} scan attempts")]
    ScanExhausted { attempts: u8 },

    /// A scan result lacks an attribute needed to register the PAN.
    #[error("scan result missing {field}")]
    ScanIncomplete { field: &'static str },

    /// The meter refused the PANA authentication.
    #[error("PANA connection rejected by the meter")]
    JoinRejected,

    /// No PANA outcome event arrived.
    #[error("timed out waiting for PANA connection")]
    JoinTimeout,

    /// Credentials cannot be sent to the modem.
    #[error("invalid credentials: {reason}")]
    InvalidCredentials { reason: String },

    /// Raw request payload does not fit the length field.
    #[error("payload too large: {size} bytes exceeds maximum {max}")]
    PayloadTooLarge { size: usize, max: usize },

    /// No joined session.
    #[error("not connected")]
    NotConnected,

    /// ECHONET Lite decoding error.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

impl Error {
    pub(crate) fn timeout(timeout: Duration) -> Self {
        Self::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Errors raised while decoding hex-ASCII ECHONET Lite messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Fewer characters remain than the field needs.
    #[error("truncated {field} at offset {offset}: need {needed} chars, got {available}")]
    Truncated {
        field: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A field is not valid hexadecimal.
    #[error("invalid hex in {field}: {value:?}")]
    InvalidHex { field: &'static str, value: String },

    /// Instantaneous current data is not two 2-byte halves.
    #[error("instantaneous current must be 8 hex chars, got {len}")]
    CurrentWidth { len: usize },
}

/// Result type alias for broute operations.
pub type Result<T> = std::result::Result<T, Error>;
