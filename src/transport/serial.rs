//! Serial/USB transport implementation.
//!
//! This module provides serial port communication with a Wi-SUN modem
//! (e.g. RL7023 Stick-D/IPS) connected via USB.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use crate::error::{Error, Result};
use crate::protocol::LineDecoder;
use crate::transport::{Transport, log_received, log_sent};

/// Default serial device.
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Default baud rate for the modem.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default connection delay.
pub const DEFAULT_CONNECTION_DELAY: Duration = Duration::from_millis(300);

/// Configuration for serial transport.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0" or "COM3").
    pub port: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Delay after connection before sending commands.
    pub connection_delay: Duration,
}

impl SerialConfig {
    /// Creates a new serial configuration with default settings.
    #[must_use]
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            connection_delay: DEFAULT_CONNECTION_DELAY,
        }
    }

    /// Sets the baud rate.
    #[must_use]
    pub const fn baud_rate(mut self, rate: u32) -> Self {
        self.baud_rate = rate;
        self
    }

    /// Sets the connection delay.
    #[must_use]
    pub const fn connection_delay(mut self, delay: Duration) -> Self {
        self.connection_delay = delay;
        self
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PORT)
    }
}

/// Serial transport for modem communication.
pub struct SerialTransport {
    config: SerialConfig,
    stream: Option<SerialStream>,
    decoder: LineDecoder,
}

impl SerialTransport {
    /// Creates a new serial transport with the given configuration.
    #[must_use]
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            stream: None,
            decoder: LineDecoder::new(),
        }
    }

    /// Creates a new serial transport for the given port with default settings.
    #[must_use]
    pub fn with_port(port: impl Into<String>) -> Self {
        Self::new(SerialConfig::new(port))
    }

    /// Returns the transport configuration.
    #[must_use]
    pub const fn config(&self) -> &SerialConfig {
        &self.config
    }
}

impl Transport for SerialTransport {
    fn connect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.stream.is_some() {
                return Ok(());
            }

            tracing::info!("connecting to serial port: {}", self.config.port);

            let mut stream = tokio_serial::new(&self.config.port, self.config.baud_rate)
                .open_native_async()
                .map_err(Error::Serial)?;

            // Wait for device to be ready
            tokio::time::sleep(self.config.connection_delay).await;

            // Drain any stale data left over from a previous session
            let mut buf = [0u8; 1024];
            let mut total_drained = 0usize;

            let drain_deadline = tokio::time::Instant::now() + Duration::from_millis(500);
            while tokio::time::Instant::now() < drain_deadline {
                match tokio::time::timeout(Duration::from_millis(20), stream.read(&mut buf)).await {
                    Ok(Ok(n)) if n > 0 => {
                        total_drained += n;
                    }
                    _ => {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }

            if total_drained > 0 {
                tracing::debug!("drained {} stale bytes from buffer", total_drained);
            }

            self.stream = Some(stream);
            self.decoder.clear();

            tracing::info!("connected to serial port");
            Ok(())
        })
    }

    fn disconnect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.stream.take().is_some() {
                tracing::info!("disconnected from serial port");
            }
            self.decoder.clear();
            Ok(())
        })
    }

    fn send(&mut self, data: Bytes) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

            log_sent(&data);
            stream.write_all(&data).await.map_err(Error::Io)?;
            stream.flush().await.map_err(Error::Io)?;

            Ok(())
        })
    }

    fn read_line(&mut self, timeout: Duration) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let deadline = tokio::time::Instant::now() + timeout;
            let mut buf = [0u8; 1024];

            loop {
                if let Some(line) = self.decoder.next_line() {
                    log_received(&line);
                    return Ok(line);
                }

                let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
                let n = match tokio::time::timeout_at(deadline, stream.read(&mut buf)).await {
                    Ok(Ok(0)) => {
                        tracing::debug!("serial port closed");
                        return Err(Error::Io(io::Error::new(
                            io::ErrorKind::ConnectionReset,
                            "serial port closed",
                        )));
                    }
                    Ok(Ok(n)) => n,
                    Ok(Err(e)) => {
                        tracing::error!("serial read error: {}", e);
                        return Err(Error::Io(e));
                    }
                    Err(_) => {
                        tracing::debug!(
                            "read timed out with {} bytes buffered",
                            self.decoder.buffered()
                        );
                        return Err(Error::timeout(timeout));
                    }
                };

                tracing::trace!("received {} bytes", n);
                self.decoder.feed(&buf[..n]);
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

/// Lists available serial ports.
///
/// # Errors
///
/// Returns an error if the port list cannot be retrieved.
pub fn list_ports() -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports().map_err(Error::Serial)?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_config_defaults() {
        let config = SerialConfig::default();
        assert_eq!(config.port, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.baud_rate, 115_200);
    }

    #[test]
    fn test_serial_config_builder() {
        let config = SerialConfig::new("/dev/ttyAMA0")
            .baud_rate(9600)
            .connection_delay(Duration::from_secs(1));
        assert_eq!(config.port, "/dev/ttyAMA0");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.connection_delay, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_send_requires_connection() {
        let mut transport = SerialTransport::with_port("/dev/null-modem");
        assert!(!transport.is_connected());

        let err = transport.send_line("SKVER").await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));

        let err = transport
            .read_line(Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[test]
    #[ignore = "Requires /sys/class/tty - not available in sandboxed builds"]
    fn test_list_ports() {
        // Just verify it doesn't panic
        let _ = list_ports();
    }
}
