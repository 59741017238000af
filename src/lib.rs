//! # broute
//!
//! A Rust client library for reading smart meters over the Wi-SUN B-Route.
//!
//! This library drives a serial-attached Wi-SUN modem through the join
//! sequence and exchanges ECHONET Lite frames with the meter.
//!
//! ## Features
//!
//! - Async/await based API using Tokio
//! - Typed join state machine with scan retries
//! - ECHONET Lite request encoding and bounds-checked response decoding
//! - Comprehensive error handling
//!
//! ## Quick Start
//!
//! ```no_run
//! use broute::{Credentials, SmartMeter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), broute::Error> {
//!     let credentials = Credentials::new("00112233445566778899AABBCCDDEEFF", "0123456789AB");
//!
//!     // Join the meter's PAN through the modem
//!     let mut meter = SmartMeter::serial("/dev/ttyUSB0");
//!     let session = meter.connect(&credentials).await?;
//!     println!("Joined meter {} at {}", session.mac, session.ipv6);
//!
//!     // Read instantaneous power and cumulative energy
//!     let reading = meter.read_meter().await?;
//!     println!("Power: {:?} W", reading.w);
//!
//!     meter.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`protocol`] - Line framing, modem commands, ECHONET Lite codec
//! - [`types`] - Data structures (credentials, sessions, readings)
//! - [`transport`] - Transport implementations (USB/Serial and a scripted mock)
//! - [`event`] - Classification of modem output lines
//! - [`commands`] - Command/response driver
//! - [`join`] - Join state machine
//! - [`client`] - High-level [`SmartMeter`] client

pub mod client;
pub mod commands;
pub mod error;
pub mod event;
pub mod join;
pub mod protocol;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::SmartMeter;
pub use commands::CommandHandler;
pub use error::{DecodeError, Error, Result};
pub use event::{EventCode, ModemEvent, Notification, UdpDatagram};
pub use join::{JoinConfig, JoinPhase, JoinState, Joiner, ScanSchedule};
pub use protocol::{PropertyCode, RequestFrame, ResponseMessage, parse_meter_reading};
pub use transport::{MockTransport, SerialTransport, Transport, serial::list_ports};
pub use types::{AcquisitionRecord, Credentials, MeterReading, Peer, ScanResult, Session};
