//! ECHONET Lite frame encoding and decoding.
//!
//! Requests are built as binary frames:
//! ```text
//! ┌────────┬───────┬────────┬────────┬──────┬──────┬──────────────────────┐
//! │  EHD   │  TID  │  SEOJ  │  DEOJ  │ ESV  │ OPC  │ (EPC PDC=0) * OPC    │
//! │ 2 bytes│2 bytes│3 bytes │3 bytes │1 byte│1 byte│ 2 bytes each         │
//! └────────┴───────┴────────┴────────┴──────┴──────┴──────────────────────┘
//! ```
//! Responses arrive hex-ASCII encoded inside an `ERXUDP` notification and are
//! decoded field by field, each `(EPC, PDC, EDT)` entry carrying `PDC` bytes of
//! data.

use std::collections::HashMap;
use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::DecodeError;

/// ECHONET Lite header (EHD1 = `0x10`, EHD2 = `0x81` fixed format).
pub const EHD: u16 = 0x1081;

/// Transaction ID used when none is given.
pub const DEFAULT_TID: u16 = 0x1234;

/// Largest number of properties one frame can carry.
pub const MAX_PROPERTIES: usize = u8::MAX as usize;

/// A 3-byte ECHONET object identifier (class group, class, instance).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EchonetObject([u8; 3]);

impl EchonetObject {
    /// Controller class, instance 1 (`05FF01`).
    pub const CONTROLLER: Self = Self([0x05, 0xFF, 0x01]);

    /// Low-voltage smart electric energy meter class, instance 1 (`028801`).
    pub const SMART_METER: Self = Self([0x02, 0x88, 0x01]);

    /// Creates an object identifier from its three bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 3]) -> Self {
        Self(bytes)
    }

    /// Returns the identifier bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 3] {
        &self.0
    }

    /// Returns the identifier as upper-case hex.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl fmt::Debug for EchonetObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EchonetObject({})", self.to_hex())
    }
}

impl fmt::Display for EchonetObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// ECHONET Lite service codes (ESV) used for property reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ServiceCode {
    /// Property read not possible (error response).
    GetSna = 0x52,
    /// Property read request.
    Get = 0x62,
    /// Property read response.
    GetRes = 0x72,
}

impl ServiceCode {
    /// Attempts to parse a service code from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x52 => Some(Self::GetSna),
            0x62 => Some(Self::Get),
            0x72 => Some(Self::GetRes),
            _ => None,
        }
    }
}

impl From<ServiceCode> for u8 {
    fn from(esv: ServiceCode) -> Self {
        esv as Self
    }
}

/// Smart meter property codes (EPC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PropertyCode {
    /// Number of effective digits for cumulative energy.
    EffectiveDigits = 0xD7,
    /// Cumulative energy, normal direction.
    CumulativeEnergy = 0xE0,
    /// Unit for cumulative energy.
    CumulativeEnergyUnit = 0xE1,
    /// Instantaneous electric power (W).
    InstantaneousPower = 0xE7,
    /// Instantaneous current, R and T phase (0.1 A).
    InstantaneousCurrent = 0xE8,
    /// Cumulative energy measured at a fixed time, normal direction.
    FixedTimeCumulativeEnergy = 0xEA,
}

impl PropertyCode {
    /// Attempts to parse a property code from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0xD7 => Some(Self::EffectiveDigits),
            0xE0 => Some(Self::CumulativeEnergy),
            0xE1 => Some(Self::CumulativeEnergyUnit),
            0xE7 => Some(Self::InstantaneousPower),
            0xE8 => Some(Self::InstantaneousCurrent),
            0xEA => Some(Self::FixedTimeCumulativeEnergy),
            _ => None,
        }
    }
}

impl From<PropertyCode> for u8 {
    fn from(epc: PropertyCode) -> Self {
        epc as Self
    }
}

/// An encoded property read request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    bytes: Bytes,
}

impl RequestFrame {
    /// Builds a Get request from the controller to the smart meter.
    ///
    /// # Panics
    ///
    /// Panics if more than `MAX_PROPERTIES` codes are given.
    #[must_use]
    pub fn get(properties: &[u8]) -> Self {
        Self::get_with_tid(DEFAULT_TID, properties)
    }

    /// Builds a Get request with an explicit transaction ID.
    ///
    /// # Panics
    ///
    /// Panics if more than `MAX_PROPERTIES` codes are given.
    #[must_use]
    pub fn get_with_tid(tid: u16, properties: &[u8]) -> Self {
        assert!(
            properties.len() <= MAX_PROPERTIES,
            "too many properties for one frame"
        );

        let mut buf = BytesMut::with_capacity(12 + properties.len() * 2);
        buf.put_u16(EHD);
        buf.put_u16(tid);
        buf.put_slice(EchonetObject::CONTROLLER.as_bytes());
        buf.put_slice(EchonetObject::SMART_METER.as_bytes());
        buf.put_u8(ServiceCode::Get.into());
        buf.put_u8(properties.len() as u8);
        for &epc in properties {
            buf.put_u8(epc);
            // A read request carries no data
            buf.put_u8(0);
        }

        Self { bytes: buf.freeze() }
    }

    /// Returns the frame bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the frame length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the frame is empty (never the case for built frames).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One `(PDC, EDT)` entry of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Declared data length in bytes.
    pub pdc: u8,
    /// Raw data, hex-encoded as received.
    pub edt: String,
}

/// A decoded ECHONET Lite response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMessage {
    /// Header.
    pub ehd: u16,
    /// Transaction ID.
    pub tid: u16,
    /// Source object.
    pub seoj: EchonetObject,
    /// Destination object.
    pub deoj: EchonetObject,
    /// Service code.
    pub esv: u8,
    /// Number of properties.
    pub opc: u8,
    /// Properties keyed by EPC.
    pub properties: HashMap<u8, Property>,
}

impl ResponseMessage {
    /// Decodes a hex-ASCII message.
    ///
    /// Format (hex chars):
    /// ```text
    /// [EHD:4] [TID:4] [SEOJ:6] [DEOJ:6] [ESV:2] [OPC:2]
    /// OPC * ([EPC:2] [PDC:2] [EDT:2*PDC])
    /// ```
    /// Characters after the last declared entry are ignored.
    pub fn decode(input: &str) -> Result<Self, DecodeError> {
        let mut cursor = HexCursor::new(input);

        let ehd = cursor.take_u16("EHD")?;
        let tid = cursor.take_u16("TID")?;
        let seoj = cursor.take_object("SEOJ")?;
        let deoj = cursor.take_object("DEOJ")?;
        let esv = cursor.take_u8("ESV")?;
        let opc = cursor.take_u8("OPC")?;

        let mut properties = HashMap::with_capacity(usize::from(opc));
        for _ in 0..opc {
            let epc = cursor.take_u8("EPC")?;
            let pdc = cursor.take_u8("PDC")?;
            let edt = cursor.take_hex("EDT", usize::from(pdc) * 2)?;
            properties.insert(
                epc,
                Property {
                    pdc,
                    edt: edt.to_owned(),
                },
            );
        }

        if cursor.remaining() > 0 {
            tracing::trace!("ignoring {} trailing chars", cursor.remaining());
        }

        Ok(Self {
            ehd,
            tid,
            seoj,
            deoj,
            esv,
            opc,
            properties,
        })
    }

    /// Returns the property with the given code, if present.
    #[must_use]
    pub fn property(&self, epc: impl Into<u8>) -> Option<&Property> {
        self.properties.get(&epc.into())
    }

    /// Returns the parsed service code.
    #[must_use]
    pub const fn service(&self) -> Option<ServiceCode> {
        ServiceCode::from_byte(self.esv)
    }

    /// Returns true if this is a property read response.
    #[must_use]
    pub fn is_get_response(&self) -> bool {
        self.service() == Some(ServiceCode::GetRes)
    }

    /// Returns true if the message was sent by a smart meter object.
    #[must_use]
    pub fn is_from_smart_meter(&self) -> bool {
        self.seoj == EchonetObject::SMART_METER
    }
}

/// Fixed-width field reader over a hex-ASCII string.
struct HexCursor<'a> {
    input: &'a str,
    offset: usize,
}

impl<'a> HexCursor<'a> {
    const fn new(input: &'a str) -> Self {
        Self { input, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.input.len() - self.offset
    }

    /// Takes `width` hex digits.
    fn take_hex(&mut self, field: &'static str, width: usize) -> Result<&'a str, DecodeError> {
        let available = self.remaining();
        if available < width {
            return Err(DecodeError::Truncated {
                field,
                offset: self.offset,
                needed: width,
                available,
            });
        }

        let value = self
            .input
            .get(self.offset..self.offset + width)
            .filter(|s| s.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| DecodeError::InvalidHex {
                field,
                value: String::from_utf8_lossy(
                    &self.input.as_bytes()[self.offset..self.offset + width],
                )
                .into_owned(),
            })?;

        self.offset += width;
        Ok(value)
    }

    fn take_u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        let digits = self.take_hex(field, 2)?;
        u8::from_str_radix(digits, 16).map_err(|_| invalid(field, digits))
    }

    fn take_u16(&mut self, field: &'static str) -> Result<u16, DecodeError> {
        let digits = self.take_hex(field, 4)?;
        u16::from_str_radix(digits, 16).map_err(|_| invalid(field, digits))
    }

    fn take_object(&mut self, field: &'static str) -> Result<EchonetObject, DecodeError> {
        let digits = self.take_hex(field, 6)?;
        let mut bytes = [0u8; 3];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| invalid(field, digits))?;
        Ok(EchonetObject::from_bytes(bytes))
    }
}

fn invalid(field: &'static str, value: &str) -> DecodeError {
    DecodeError::InvalidHex {
        field,
        value: value.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const METER_PROPERTIES: [u8; 6] = [0xD7, 0xE0, 0xE1, 0xE7, 0xE8, 0xEA];

    #[test]
    fn test_get_frame_layout() {
        let frame = RequestFrame::get(&METER_PROPERTIES);

        assert_eq!(
            &frame.as_bytes()[..12],
            &[0x10, 0x81, 0x12, 0x34, 0x05, 0xFF, 0x01, 0x02, 0x88, 0x01, 0x62, 0x06]
        );
        assert_eq!(
            &frame.as_bytes()[12..],
            &[0xD7, 0x00, 0xE0, 0x00, 0xE1, 0x00, 0xE7, 0x00, 0xE8, 0x00, 0xEA, 0x00]
        );
        assert_eq!(frame.len(), 24);
    }

    #[test]
    fn test_get_frame_with_tid() {
        let frame = RequestFrame::get_with_tid(0x0001, &[0xE7]);
        assert_eq!(&frame.as_bytes()[2..4], &[0x00, 0x01]);
        assert_eq!(frame.len(), 14);
    }

    #[test]
    fn test_request_plays_back_through_decoder() {
        let frame = RequestFrame::get(&METER_PROPERTIES);
        let message = ResponseMessage::decode(&hex::encode_upper(frame.as_bytes())).unwrap();

        assert_eq!(message.ehd, EHD);
        assert_eq!(message.tid, DEFAULT_TID);
        assert_eq!(message.seoj, EchonetObject::CONTROLLER);
        assert_eq!(message.deoj, EchonetObject::SMART_METER);
        assert_eq!(message.service(), Some(ServiceCode::Get));
        assert_eq!(usize::from(message.opc), METER_PROPERTIES.len());
        assert_eq!(message.properties.len(), METER_PROPERTIES.len());
        for epc in METER_PROPERTIES {
            let property = message.property(epc).unwrap();
            assert_eq!(property.pdc, 0);
            assert!(property.edt.is_empty());
        }
    }

    #[test]
    fn test_decode_response() {
        let message =
            ResponseMessage::decode("1081123402880105FF017202E70400000226E80400D500CE").unwrap();

        assert!(message.is_from_smart_meter());
        assert!(message.is_get_response());
        assert_eq!(message.opc, 2);

        let power = message.property(PropertyCode::InstantaneousPower).unwrap();
        assert_eq!(power.pdc, 4);
        assert_eq!(power.edt, "00000226");

        let current = message.property(PropertyCode::InstantaneousCurrent).unwrap();
        assert_eq!(current.edt, "00D500CE");
    }

    #[test]
    fn test_decode_consumes_declared_count_only() {
        // OPC says 1, a second entry follows but is not part of the message
        let message =
            ResponseMessage::decode("1081123402880105FF017201E70400000226E80400D500CE").unwrap();

        assert_eq!(message.properties.len(), 1);
        assert!(message.property(0xE8).is_none());
    }

    #[test]
    fn test_decode_truncated_entry() {
        let err = ResponseMessage::decode("1081123402880105FF017202E70400000226E80400D5").unwrap_err();

        assert_eq!(
            err,
            DecodeError::Truncated {
                field: "EDT",
                offset: 40,
                needed: 8,
                available: 4,
            }
        );
    }

    #[test]
    fn test_decode_missing_entry() {
        let err = ResponseMessage::decode("1081123402880105FF017202E70400000226").unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { field: "EPC", .. }));
    }

    #[test]
    fn test_decode_truncated_header() {
        let err = ResponseMessage::decode("10811234028801").unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { field: "DEOJ", .. }));
    }

    #[test]
    fn test_decode_invalid_hex() {
        let err = ResponseMessage::decode("1081123402880105FF0172ZZ").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidHex { field: "OPC", .. }));
    }

    #[test]
    fn test_decode_rejects_sign_prefix() {
        // from_str_radix would accept "+1"
        let err = ResponseMessage::decode("1081123402880105FF0172+1").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidHex { field: "OPC", .. }));
    }

    #[test]
    fn test_service_code_from_byte() {
        assert_eq!(ServiceCode::from_byte(0x72), Some(ServiceCode::GetRes));
        assert_eq!(ServiceCode::from_byte(0x52), Some(ServiceCode::GetSna));
        assert_eq!(ServiceCode::from_byte(0x00), None);
    }

    #[test]
    fn test_object_hex() {
        assert_eq!(EchonetObject::SMART_METER.to_hex(), "028801");
        assert_eq!(EchonetObject::CONTROLLER.to_string(), "05FF01");
    }
}
