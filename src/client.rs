//! Main [`SmartMeter`] client implementation.
//!
//! This module provides the high-level [`SmartMeter`] client that combines
//! transport, command handling, the join sequence and the ECHONET Lite codec
//! into a unified interface.

use std::time::Duration;

use crate::commands::CommandHandler;
use crate::error::{Error, Result};
use crate::join::{JoinConfig, JoinPhase, Joiner};
use crate::protocol::{METER_PROPERTIES, RequestFrame, ResponseMessage, parse_meter_reading};
use crate::transport::{SerialTransport, Transport, serial::SerialConfig};
use crate::types::{AcquisitionRecord, Credentials, MeterReading, Session};

/// Client for reading a smart meter over B-Route.
pub struct SmartMeter<T> {
    commands: CommandHandler<T>,
    joiner: Joiner,
    session: Option<Session>,
}

impl SmartMeter<SerialTransport> {
    /// Creates a new client for a serial port.
    ///
    /// # Arguments
    ///
    /// * `port` - Serial port path (e.g., "/dev/ttyUSB0")
    ///
    /// # Returns
    ///
    /// A new client (not yet connected).
    #[must_use]
    pub fn serial(port: impl Into<String>) -> Self {
        let config = SerialConfig::new(port);
        Self::with_serial_config(config)
    }

    /// Creates a new client with custom serial configuration.
    #[must_use]
    pub fn with_serial_config(config: SerialConfig) -> Self {
        let transport = SerialTransport::new(config);
        Self::new(transport)
    }
}

impl<T: Transport> SmartMeter<T> {
    /// Creates a new client with the given transport.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            commands: CommandHandler::new(transport),
            joiner: Joiner::default(),
            session: None,
        }
    }

    /// Replaces the join configuration.
    #[must_use]
    pub fn with_join_config(mut self, config: JoinConfig) -> Self {
        self.joiner = Joiner::new(config);
        self
    }

    /// Sets the timeout used while waiting for meter responses.
    pub fn set_request_timeout(&mut self, timeout: Duration) {
        self.joiner.set_request_timeout(timeout);
        if self.session.is_some() {
            self.commands.set_timeout(timeout);
        }
    }

    /// Opens the transport and joins the meter's PAN.
    ///
    /// This will:
    /// 1. Open the transport connection
    /// 2. Register the credentials and scan for the meter
    /// 3. Register the PAN and resolve the meter's address
    /// 4. Authenticate with PANA
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be opened or any join step
    /// fails. The join is not retried.
    pub async fn connect(&mut self, credentials: &Credentials) -> Result<Session> {
        self.session = None;

        if !self.commands.transport().is_connected() {
            self.commands.transport_mut().connect().await?;
        }

        let session = self.joiner.run(&mut self.commands, credentials).await?;
        self.session = Some(session.clone());
        Ok(session)
    }

    /// Returns the joined session, if any.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Returns the phase the last join ended in.
    #[must_use]
    pub fn join_phase(&self) -> JoinPhase {
        self.joiner.phase()
    }

    /// Requests one reading from the meter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] before a successful [`connect`](Self::connect).
    pub async fn read_meter(&mut self) -> Result<MeterReading> {
        let address = self
            .session
            .as_ref()
            .map(|session| session.ipv6.clone())
            .ok_or(Error::NotConnected)?;

        let frame = RequestFrame::get(&METER_PROPERTIES);
        tracing::debug!("requesting {} properties from {address}", METER_PROPERTIES.len());
        self.commands
            .send_raw_request(&address, frame.as_bytes())
            .await?;

        let datagram = self.commands.wait_for_udp().await?;
        let message = ResponseMessage::decode(&datagram.data)?;
        let reading = parse_meter_reading(&message)?;

        tracing::info!(
            "meter reading: kwh={:?} w={:?} a_t={:?} a_r={:?}",
            reading.kwh,
            reading.w,
            reading.a_t,
            reading.a_r
        );
        Ok(reading)
    }

    /// Runs one acquisition cycle: join, then read once.
    ///
    /// Never fails; errors are reported in the returned record. Nothing is
    /// retried.
    pub async fn acquire(&mut self, credentials: &Credentials) -> AcquisitionRecord {
        match self.try_acquire(credentials).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!("acquisition failed: {e}");
                AcquisitionRecord::failure(e)
            }
        }
    }

    async fn try_acquire(&mut self, credentials: &Credentials) -> Result<AcquisitionRecord> {
        let session = self.connect(credentials).await?;
        let reading = self.read_meter().await?;
        Ok(AcquisitionRecord::success(session.mac, reading))
    }

    /// Drops the session and closes the transport.
    pub async fn disconnect(&mut self) -> Result<()> {
        self.session = None;
        self.commands.transport_mut().disconnect().await
    }

    /// Returns the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        self.commands.transport()
    }
}
