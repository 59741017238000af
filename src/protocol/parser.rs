//! Meter property extraction.
//!
//! This module maps the properties of a decoded ECHONET Lite response onto
//! the semantic fields of a [`MeterReading`].

use crate::error::DecodeError;
use crate::protocol::echonet::{PropertyCode, ResponseMessage};
use crate::types::MeterReading;

/// Properties requested from the meter on every reading.
pub const METER_PROPERTIES: [u8; 6] = [
    PropertyCode::EffectiveDigits as u8,
    PropertyCode::CumulativeEnergy as u8,
    PropertyCode::CumulativeEnergyUnit as u8,
    PropertyCode::InstantaneousPower as u8,
    PropertyCode::InstantaneousCurrent as u8,
    PropertyCode::FixedTimeCumulativeEnergy as u8,
];

/// Current scaling factor (raw value is in 0.1 A).
const CURRENT_SCALE: f64 = 10.0;

/// Hex width of the instantaneous current data (two 2-byte phases).
const CURRENT_WIDTH: usize = 8;

/// Parses big-endian unsigned hex data.
fn parse_unsigned(field: &'static str, edt: &str) -> Result<u64, DecodeError> {
    if edt.is_empty() || edt.len() > 16 {
        return Err(DecodeError::InvalidHex {
            field,
            value: edt.to_owned(),
        });
    }
    u64::from_str_radix(edt, 16).map_err(|_| DecodeError::InvalidHex {
        field,
        value: edt.to_owned(),
    })
}

/// Parses one 2-byte current phase.
fn parse_phase(edt: &str) -> Result<f64, DecodeError> {
    let raw = u16::from_str_radix(edt, 16).map_err(|_| DecodeError::InvalidHex {
        field: "E8",
        value: edt.to_owned(),
    })?;
    Ok(f64::from(raw) / CURRENT_SCALE)
}

/// Extracts a [`MeterReading`] from a decoded response.
///
/// Responses that do not come from a smart meter object or that are not
/// property read responses yield an empty reading. Unknown properties are
/// ignored.
///
/// Instantaneous power is read as unsigned, so a negative value reported by
/// the meter shows up as a large positive number.
pub fn parse_meter_reading(message: &ResponseMessage) -> Result<MeterReading, DecodeError> {
    let mut reading = MeterReading::default();

    if !message.is_from_smart_meter() || !message.is_get_response() {
        tracing::warn!(
            "ignoring response from {} with service 0x{:02X}",
            message.seoj,
            message.esv
        );
        return Ok(reading);
    }

    for (&epc, property) in &message.properties {
        let edt = property.edt.as_str();
        match PropertyCode::from_byte(epc) {
            Some(PropertyCode::CumulativeEnergy) => {
                reading.kwh = Some(parse_unsigned("E0", edt)?);
            }
            Some(PropertyCode::InstantaneousPower) => {
                reading.w = Some(parse_unsigned("E7", edt)?);
            }
            Some(PropertyCode::InstantaneousCurrent) => {
                if edt.len() != CURRENT_WIDTH {
                    return Err(DecodeError::CurrentWidth { len: edt.len() });
                }
                let (first, second) = edt.split_at(CURRENT_WIDTH / 2);
                reading.a_t = Some(parse_phase(first)?);
                reading.a_r = Some(parse_phase(second)?);
            }
            _ => {
                tracing::trace!("skipping property 0x{epc:02X}");
            }
        }
    }

    Ok(reading)
}
