//! Protocol definitions for smart-meter communication.
//!
//! This module contains the low-level protocol types including:
//! - Line framing for the modem's command stream
//! - Modem command vocabulary
//! - ECHONET Lite frame encoding/decoding
//! - Meter property extraction

pub mod command;
pub mod echonet;
pub mod line;
pub mod parser;

pub use command::{Command, ECHONET_PORT, Register, send_to_header};
pub use echonet::{
    EchonetObject, Property, PropertyCode, RequestFrame, ResponseMessage, ServiceCode,
};
pub use line::{LINE_TERMINATOR, LineDecoder, encode as encode_line};
pub use parser::{METER_PROPERTIES, parse_meter_reading};
