//! Scripted in-memory transport.
//!
//! Replies are played back in order regardless of what is written, which
//! matches the modem's strictly sequential line stream. Every write is
//! recorded for inspection.

use std::collections::VecDeque;
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;

use crate::error::{Error, Result};
use crate::protocol::LINE_TERMINATOR;
use crate::transport::{Transport, log_received, log_sent};

/// One scripted reply.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Reply {
    Line(String),
    Timeout,
}

/// Transport that returns scripted lines and records writes.
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: VecDeque<Reply>,
    written: Vec<Bytes>,
    connected: bool,
}

impl MockTransport {
    /// Creates a transport with no scripted replies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport that replies with `lines` in order.
    #[must_use]
    pub fn with_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut transport = Self::new();
        transport.push_lines(lines);
        transport
    }

    /// Queues one reply line.
    pub fn push_line(&mut self, line: impl Into<String>) {
        self.replies.push_back(Reply::Line(line.into()));
    }

    /// Queues several reply lines.
    pub fn push_lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.replies
            .extend(lines.into_iter().map(|line| Reply::Line(line.into())));
    }

    /// Queues a read that times out.
    pub fn push_timeout(&mut self) {
        self.replies.push_back(Reply::Timeout);
    }

    /// Returns the number of replies not yet read.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.replies.len()
    }

    /// Returns every write, as sent.
    #[must_use]
    pub fn written(&self) -> &[Bytes] {
        &self.written
    }

    /// Returns every write as text, line terminators stripped.
    #[must_use]
    pub fn written_lines(&self) -> Vec<String> {
        self.written
            .iter()
            .map(|data| {
                let data = data.strip_suffix(LINE_TERMINATOR).unwrap_or(&data[..]);
                String::from_utf8_lossy(data).into_owned()
            })
            .collect()
    }
}

impl Transport for MockTransport {
    fn connect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.connected = true;
            Ok(())
        })
    }

    fn disconnect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.connected = false;
            Ok(())
        })
    }

    fn send(&mut self, data: Bytes) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            log_sent(&data);
            self.written.push(data);
            Ok(())
        })
    }

    fn read_line(&mut self, timeout: Duration) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            match self.replies.pop_front() {
                Some(Reply::Line(line)) => {
                    log_received(&line);
                    Ok(line)
                }
                Some(Reply::Timeout) | None => Err(Error::timeout(timeout)),
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_in_order() {
        let mut transport = MockTransport::with_lines(["SKVER", "EVER 1.2.10", "OK"]);
        let timeout = Duration::from_secs(1);

        assert_eq!(transport.read_line(timeout).await.unwrap(), "SKVER");
        assert_eq!(transport.read_line(timeout).await.unwrap(), "EVER 1.2.10");
        assert_eq!(transport.pending(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_script_times_out() {
        let mut transport = MockTransport::new();
        transport.push_timeout();

        let err = transport
            .read_line(Duration::from_millis(250))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { timeout_ms: 250 }));

        let err = transport
            .read_line(Duration::from_millis(250))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_records_writes() {
        let mut transport = MockTransport::new();
        transport.connect().await.unwrap();
        assert!(transport.is_connected());

        transport.send_line("SKINFO").await.unwrap();
        transport
            .send(Bytes::from_static(b"SKSENDTO \x10\x81"))
            .await
            .unwrap();

        assert_eq!(&transport.written()[0][..], b"SKINFO\r\n");
        assert_eq!(transport.written_lines()[0], "SKINFO");
        assert_eq!(&transport.written()[1][..], b"SKSENDTO \x10\x81");
    }
}
