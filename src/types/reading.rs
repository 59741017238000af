//! Meter readings and acquisition records.

use serde::Serialize;

/// Values extracted from one meter response.
///
/// A `None` field means the property was absent from the response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MeterReading {
    /// Cumulative energy, in the meter's own units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kwh: Option<u64>,
    /// Instantaneous power in watts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w: Option<u64>,
    /// Instantaneous current, T phase, in amperes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub a_t: Option<f64>,
    /// Instantaneous current, R phase, in amperes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub a_r: Option<f64>,
}

impl MeterReading {
    /// Returns true if no field is populated.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.kwh.is_none() && self.w.is_none() && self.a_t.is_none() && self.a_r.is_none()
    }
}

/// Outcome of one acquisition cycle, as recorded by the caller.
///
/// Serialises to `{"mac": .., "kwh": .., "w": .., "a_t": .., "a_r": .., "done": true}`
/// on success and `{"error": .., "done": false}` on failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcquisitionRecord {
    /// MAC address of the meter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    /// Reading fields.
    #[serde(flatten)]
    pub reading: MeterReading,
    /// Failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// True if the cycle completed.
    pub done: bool,
}

impl AcquisitionRecord {
    /// Creates a completed record.
    #[must_use]
    pub fn success(mac: impl Into<String>, reading: MeterReading) -> Self {
        Self {
            mac: Some(mac.into()),
            reading,
            error: None,
            done: true,
        }
    }

    /// Creates a failed record.
    #[must_use]
    pub fn failure(reason: impl std::fmt::Display) -> Self {
        Self {
            mac: None,
            reading: MeterReading::default(),
            error: Some(reason.to_string()),
            done: false,
        }
    }

    /// Serialises the record as one JSON line.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_reading() {
        assert!(MeterReading::default().is_empty());
        let reading = MeterReading {
            w: Some(550),
            ..MeterReading::default()
        };
        assert!(!reading.is_empty());
    }

    #[test]
    fn test_success_record_json() {
        let reading = MeterReading {
            kwh: Some(100_000),
            w: Some(550),
            a_t: Some(21.3),
            a_r: Some(20.6),
        };
        let record = AcquisitionRecord::success("001D129012345678", reading);
        let value: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();

        assert_eq!(value["mac"], "001D129012345678");
        assert_eq!(value["kwh"], 100_000);
        assert_eq!(value["w"], 550);
        assert_eq!(value["a_t"], 21.3);
        assert_eq!(value["a_r"], 20.6);
        assert_eq!(value["done"], true);
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_partial_record_omits_absent_fields() {
        let reading = MeterReading {
            w: Some(550),
            ..MeterReading::default()
        };
        let json = AcquisitionRecord::success("001D129012345678", reading)
            .to_json()
            .unwrap();
        assert_eq!(json, r#"{"mac":"001D129012345678","w":550,"done":true}"#);
    }

    #[test]
    fn test_failure_record_json() {
        let json = AcquisitionRecord::failure("PANA connection rejected by the meter")
            .to_json()
            .unwrap();
        assert_eq!(
            json,
            r#"{"error":"PANA connection rejected by the meter","done":false}"#
        );
    }
}
