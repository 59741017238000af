//! Command handler for modem operations.
//!
//! This module provides the request/response primitives used by the join and
//! the meter client. Every synchronous modem command follows the same
//! convention: the modem echoes the command line, then answers with a single
//! status line (`OK` or `FAIL ER<nn>`).

use std::time::Duration;

use bytes::{BufMut, BytesMut};
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::event::{Notification, UdpDatagram};
use crate::protocol::{Command, send_to_header};
use crate::transport::Transport;

/// Default command timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Command handler for modem operations.
///
/// The handler owns the transport exclusively. All operations take
/// `&mut self`, so a command can never be written while the echo and status
/// of the previous one are still unread.
pub struct CommandHandler<T> {
    transport: T,
    timeout: Duration,
}

impl<T: Transport> CommandHandler<T> {
    /// Creates a new command handler.
    #[must_use]
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the read timeout used by every subsequent operation.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Returns the current read timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the underlying transport mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consumes the handler and returns its transport.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Writes a command line without reading anything back.
    pub async fn write_command(&mut self, command: &Command<'_>) -> Result<()> {
        self.transport.send_line(&command.to_string()).await
    }

    /// Sends a command and waits for its status line.
    ///
    /// Returns whatever follows `OK` on the status line (usually empty).
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandRejected`] on `FAIL`, [`Error::UnexpectedLine`]
    /// if the status line is neither, and [`Error::Timeout`] if either read
    /// times out.
    pub async fn send_command(&mut self, command: &Command<'_>) -> Result<String> {
        self.write_command(command).await?;

        let echo = self.read_line().await?;
        tracing::trace!("echo {echo}");

        let status = self.read_line().await?;
        match Notification::parse(&status) {
            Notification::Ok(payload) => Ok(payload),
            Notification::Fail(code) => Err(Error::CommandRejected {
                command: command.name(),
                status: code,
            }),
            _ => Err(Error::UnexpectedLine {
                expected: "OK or FAIL",
                line: status,
            }),
        }
    }

    /// Sends a command whose answer is a bare reply line instead of a status.
    ///
    /// Used for `SKLL64`, which answers with the converted address.
    pub async fn query(&mut self, command: &Command<'_>) -> Result<String> {
        self.write_command(command).await?;

        let echo = self.read_line().await?;
        tracing::trace!("echo {echo}");

        let reply = self.read_line().await?;
        match Notification::parse(&reply) {
            Notification::Fail(code) => Err(Error::CommandRejected {
                command: command.name(),
                status: code,
            }),
            _ => Ok(reply.trim().to_owned()),
        }
    }

    /// Sends a UDP payload to the ECHONET Lite port of `address`.
    ///
    /// The `SKSENDTO` header and the binary payload go out in one write. No
    /// reply is awaited; use [`wait_for_udp`](Self::wait_for_udp) for the
    /// response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PayloadTooLarge`] if the payload length does not fit
    /// the 16-bit length field.
    pub async fn send_raw_request(&mut self, address: &str, payload: &[u8]) -> Result<()> {
        let len = u16::try_from(payload.len()).map_err(|_| Error::PayloadTooLarge {
            size: payload.len(),
            max: usize::from(u16::MAX),
        })?;

        let header = send_to_header(address, len);
        let mut buf = BytesMut::with_capacity(header.len() + payload.len());
        buf.put_slice(header.as_bytes());
        buf.put_slice(payload);
        self.transport.send(buf.freeze()).await
    }

    /// Reads the next line using the current timeout.
    pub async fn read_line(&mut self) -> Result<String> {
        self.transport.read_line(self.timeout).await
    }

    /// Reads the next line using an explicit timeout.
    pub async fn read_line_with(&mut self, timeout: Duration) -> Result<String> {
        self.transport.read_line(timeout).await
    }

    /// Skips lines until an `ERXUDP` notification arrives.
    ///
    /// The deadline covers the whole wait, not each line.
    pub async fn wait_for_udp(&mut self) -> Result<UdpDatagram> {
        let timeout = self.timeout;
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::timeout(timeout));
            }

            let line = self.transport.read_line(remaining).await?;
            match Notification::parse(&line) {
                Notification::UdpReceived(raw) => return Ok(UdpDatagram::parse(&raw)?),
                other => tracing::debug!("skipping {other:?} while waiting for ERXUDP"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Register;
    use crate::transport::MockTransport;

    fn handler(lines: &[&str]) -> CommandHandler<MockTransport> {
        CommandHandler::new(MockTransport::with_lines(lines.iter().copied()))
    }

    #[tokio::test]
    async fn test_send_command_ok() {
        let mut handler = handler(&["SKSREG S2 39", "OK"]);
        let command = Command::SetRegister {
            register: Register::Channel,
            value: "39",
        };

        let payload = handler.send_command(&command).await.unwrap();
        assert_eq!(payload, "");
        assert_eq!(handler.transport().written_lines(), ["SKSREG S2 39"]);
        assert_eq!(&handler.transport().written()[0][..], b"SKSREG S2 39\r\n");
    }

    #[tokio::test]
    async fn test_send_command_fail() {
        let mut handler = handler(&["SKSETRBID 0011", "FAIL ER04"]);

        let err = handler
            .send_command(&Command::SetRouteBId("0011"))
            .await
            .unwrap_err();
        match err {
            Error::CommandRejected { command, status } => {
                assert_eq!(command, "SKSETRBID");
                assert_eq!(status, "ER04");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_command_unexpected_status() {
        let mut handler = handler(&[
            "SKSETRBID 0011",
            "EVENT 21 FE80:0000:0000:0000:021D:1290:1234:5678 00",
        ]);

        let err = handler
            .send_command(&Command::SetRouteBId("0011"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedLine { .. }));
    }

    #[tokio::test]
    async fn test_send_command_status_timeout() {
        let mut transport = MockTransport::with_lines(["SKSETRBID 0011"]);
        transport.push_timeout();
        let mut handler = CommandHandler::new(transport);

        let err = handler
            .send_command(&Command::SetRouteBId("0011"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { timeout_ms: 5000 }));
    }

    #[tokio::test]
    async fn test_query_returns_reply() {
        let mut handler = handler(&[
            "SKLL64 001D129012345678",
            "FE80:0000:0000:0000:021D:1290:1234:5678 ",
        ]);

        let address = handler
            .query(&Command::LinkLocalAddress("001D129012345678"))
            .await
            .unwrap();
        assert_eq!(address, "FE80:0000:0000:0000:021D:1290:1234:5678");
    }

    #[tokio::test]
    async fn test_send_raw_request_single_write() {
        let mut handler = handler(&[]);
        let payload = [0x10, 0x81, 0x12, 0x34];

        handler
            .send_raw_request("FE80:0000:0000:0000:021D:1290:1234:5678", &payload)
            .await
            .unwrap();

        let written = handler.transport().written();
        assert_eq!(written.len(), 1);
        let mut expected =
            b"SKSENDTO 1 FE80:0000:0000:0000:021D:1290:1234:5678 0E1A 1 0004 ".to_vec();
        expected.extend_from_slice(&payload);
        assert_eq!(&written[0][..], &expected[..]);
    }

    #[tokio::test]
    async fn test_send_raw_request_too_large() {
        let mut handler = handler(&[]);
        let payload = vec![0u8; usize::from(u16::MAX) + 1];

        let err = handler.send_raw_request("FE80::1", &payload).await.unwrap_err();
        assert!(matches!(err, Error::PayloadTooLarge { size: 65536, max: 65535 }));
        assert!(handler.transport().written().is_empty());
    }

    #[tokio::test]
    async fn test_wait_for_udp_skips_other_lines() {
        let mut handler = handler(&[
            "EVENT 21 FE80:0000:0000:0000:021D:1290:1234:5678 00",
            "OK",
            "ERXUDP FE80:0000:0000:0000:021D:1290:1234:5678 FE80:0000:0000:0000:021D:1290:ABCD:0001 0E1A 0E1A 001D129012345678 1 0012 1081123402880105FF017201E70400000226",
        ]);

        let datagram = handler.wait_for_udp().await.unwrap();
        assert_eq!(datagram.sender, "FE80:0000:0000:0000:021D:1290:1234:5678");
        assert_eq!(datagram.data, "1081123402880105FF017201E70400000226");
    }

    #[tokio::test]
    async fn test_wait_for_udp_timeout() {
        let mut handler = handler(&["EVENT 21 FE80:0000:0000:0000:021D:1290:1234:5678 00"]);
        handler.set_timeout(Duration::from_secs(8));

        let err = handler.wait_for_udp().await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }
}
