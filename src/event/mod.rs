//! Classification of lines received from the modem.
//!
//! The modem multiplexes synchronous command status lines and asynchronous
//! radio events onto a single line stream. Each received line is classified
//! into a [`Notification`] so the driver and the join state machine can decide
//! which convention the current exchange follows.

use crate::error::DecodeError;

/// Asynchronous event codes reported as `EVENT <code:02X> ...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventCode {
    /// Neighbor solicitation received.
    NeighborSolicitation = 0x01,
    /// Neighbor advertisement received.
    NeighborAdvertisement = 0x02,
    /// Echo request received.
    EchoRequest = 0x05,
    /// Energy detect scan finished.
    EnergyScanDone = 0x1F,
    /// Beacon received.
    BeaconReceived = 0x20,
    /// UDP transmission finished.
    UdpSent = 0x21,
    /// Active scan finished.
    ActiveScanDone = 0x22,
    /// PANA connection failed.
    PanaFailed = 0x24,
    /// PANA connection established.
    PanaConnected = 0x25,
    /// Session termination requested by the peer.
    SessionEndRequested = 0x26,
    /// PANA session terminated.
    SessionEnded = 0x27,
    /// Session termination request timed out.
    SessionEndTimeout = 0x28,
    /// Session lifetime expired, re-authentication started.
    SessionExpired = 0x29,
    /// Transmission time limit reached.
    TransmitLimited = 0x32,
    /// Transmission time limit released.
    TransmitLimitReleased = 0x33,
}

impl EventCode {
    /// Attempts to parse an event code from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::NeighborSolicitation),
            0x02 => Some(Self::NeighborAdvertisement),
            0x05 => Some(Self::EchoRequest),
            0x1F => Some(Self::EnergyScanDone),
            0x20 => Some(Self::BeaconReceived),
            0x21 => Some(Self::UdpSent),
            0x22 => Some(Self::ActiveScanDone),
            0x24 => Some(Self::PanaFailed),
            0x25 => Some(Self::PanaConnected),
            0x26 => Some(Self::SessionEndRequested),
            0x27 => Some(Self::SessionEnded),
            0x28 => Some(Self::SessionEndTimeout),
            0x29 => Some(Self::SessionExpired),
            0x32 => Some(Self::TransmitLimited),
            0x33 => Some(Self::TransmitLimitReleased),
            _ => None,
        }
    }
}

impl From<EventCode> for u8 {
    fn from(code: EventCode) -> Self {
        code as Self
    }
}

/// An `EVENT` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModemEvent {
    /// Raw event code.
    pub code: u8,
    /// Address of the node that caused the event.
    pub sender: Option<String>,
    /// Event parameter, if any.
    pub param: Option<String>,
}

impl ModemEvent {
    /// Returns the known event kind.
    #[must_use]
    pub const fn kind(&self) -> Option<EventCode> {
        EventCode::from_byte(self.code)
    }

    /// Returns true if this event has the given kind.
    #[must_use]
    pub fn is(&self, code: EventCode) -> bool {
        self.code == u8::from(code)
    }
}

/// A received UDP datagram (`ERXUDP`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpDatagram {
    /// Sender IPv6 address.
    pub sender: String,
    /// Payload, hex-ASCII encoded.
    pub data: String,
}

/// Index of the payload column in an `ERXUDP` line.
const ERXUDP_DATA_FIELD: usize = 8;

impl UdpDatagram {
    /// Parses an `ERXUDP` line.
    ///
    /// Format (whitespace separated):
    /// ```text
    /// ERXUDP <sender> <dest> <rport> <lport> <senderlla> <secured> <datalen> <data>
    /// ```
    pub fn parse(line: &str) -> Result<Self, DecodeError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() <= ERXUDP_DATA_FIELD {
            return Err(DecodeError::Truncated {
                field: "ERXUDP",
                offset: fields.len(),
                needed: ERXUDP_DATA_FIELD + 1,
                available: fields.len(),
            });
        }

        Ok(Self {
            sender: fields[1].to_owned(),
            data: fields[ERXUDP_DATA_FIELD].to_owned(),
        })
    }
}

/// A classified modem line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Command succeeded (`OK`, with optional trailing payload).
    Ok(String),
    /// Command failed (`FAIL ER<nn>`), carrying the error code.
    Fail(String),
    /// Asynchronous event.
    Event(ModemEvent),
    /// Start of a PAN descriptor during a scan.
    PanDescriptor,
    /// One indented `key:value` attribute of a PAN descriptor.
    ScanField { key: String, value: String },
    /// Received UDP datagram; the raw line is kept for [`UdpDatagram::parse`].
    UdpReceived(String),
    /// Anything else (echoes, address replies, informational lines).
    Other(String),
}

impl Notification {
    /// Classifies a received line.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        // Scan attributes are the only indented lines
        if line.starts_with("  ") {
            if let Some((key, value)) = line.trim().split_once(':') {
                return Self::ScanField {
                    key: key.to_owned(),
                    value: value.to_owned(),
                };
            }
        }

        let trimmed = line.trim();
        let mut words = trimmed.split_whitespace();

        match words.next() {
            Some("OK") => Self::Ok(trimmed[2..].trim_start().to_owned()),
            Some("FAIL") => Self::Fail(words.next().unwrap_or_default().to_owned()),
            Some("EVENT") => match words.next().map(|c| u8::from_str_radix(c, 16)) {
                Some(Ok(code)) => Self::Event(ModemEvent {
                    code,
                    sender: words.next().map(str::to_owned),
                    param: words.next().map(str::to_owned),
                }),
                _ => Self::Other(line.to_owned()),
            },
            Some("EPANDESC") => Self::PanDescriptor,
            Some("ERXUDP") => Self::UdpReceived(line.to_owned()),
            _ => Self::Other(line.to_owned()),
        }
    }

    /// Returns the event if this is an `EVENT` line of the given kind.
    #[must_use]
    pub fn event(&self, code: EventCode) -> Option<&ModemEvent> {
        match self {
            Self::Event(event) if event.is(code) => Some(event),
            _ => None,
        }
    }
}
