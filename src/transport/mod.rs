//! Transport layer for modem communication.
//!
//! This module provides the line-oriented abstraction over the modem's byte
//! stream. [`SerialTransport`] talks to real hardware; [`MockTransport`] plays
//! back scripted lines for tests.

pub mod mock;
pub mod serial;

use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;

use crate::error::Result;
use crate::protocol::encode_line;

/// Trait for transport implementations.
///
/// Implementations perform no retries: timeouts and I/O errors are returned
/// to the caller unchanged.
pub trait Transport: Send {
    /// Connects to the device.
    fn connect(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Disconnects from the device.
    fn disconnect(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Writes raw bytes to the device.
    fn send(&mut self, data: Bytes) -> BoxFuture<'_, Result<()>>;

    /// Reads the next complete line, without its terminator.
    ///
    /// Fails with [`Error::Timeout`](crate::Error::Timeout) if no full line
    /// arrives within `timeout`.
    fn read_line(&mut self, timeout: Duration) -> BoxFuture<'_, Result<String>>;

    /// Returns true if connected.
    fn is_connected(&self) -> bool;

    /// Writes `line` followed by the line terminator.
    fn send_line(&mut self, line: &str) -> BoxFuture<'_, Result<()>> {
        self.send(encode_line(line))
    }
}

/// Logs outgoing bytes, rendering binary payloads escaped.
pub(crate) fn log_sent(data: &[u8]) {
    tracing::debug!("write {}", data.escape_ascii());
}

/// Logs a received line.
pub(crate) fn log_received(line: &str) {
    tracing::debug!("read {}", line.escape_debug());
}

pub use mock::MockTransport;
pub use serial::SerialTransport;
