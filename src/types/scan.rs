//! Active scan results.

use std::collections::HashMap;

/// Attribute names reported in a PAN descriptor.
pub mod attr {
    /// Logical channel number.
    pub const CHANNEL: &str = "Channel";
    /// Channel page.
    pub const CHANNEL_PAGE: &str = "Channel Page";
    /// PAN ID.
    pub const PAN_ID: &str = "Pan ID";
    /// 64-bit MAC address of the coordinator (the meter).
    pub const ADDR: &str = "Addr";
    /// Link quality indicator.
    pub const LQI: &str = "LQI";
    /// Pairing ID.
    pub const PAIR_ID: &str = "PairID";
}

/// Attributes of the network discovered by one scan attempt.
///
/// Values are kept verbatim as reported by the modem, since they are written
/// back into modem registers unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    attributes: HashMap<String, String>,
}

impl ScanResult {
    /// Creates an empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one attribute, replacing any earlier value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Returns an attribute value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Returns true if a network was found.
    #[must_use]
    pub fn has_channel(&self) -> bool {
        self.attributes.contains_key(attr::CHANNEL)
    }

    /// Returns the channel.
    #[must_use]
    pub fn channel(&self) -> Option<&str> {
        self.get(attr::CHANNEL)
    }

    /// Returns the PAN ID.
    #[must_use]
    pub fn pan_id(&self) -> Option<&str> {
        self.get(attr::PAN_ID)
    }

    /// Returns the meter's MAC address.
    #[must_use]
    pub fn addr(&self) -> Option<&str> {
        self.get(attr::ADDR)
    }

    /// Returns the link quality indicator.
    #[must_use]
    pub fn lqi(&self) -> Option<u8> {
        self.get(attr::LQI)
            .and_then(|v| u8::from_str_radix(v, 16).ok())
    }

    /// Returns the number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_result_accessors() {
        let mut scan = ScanResult::new();
        assert!(!scan.has_channel());

        scan.insert("Channel", "39");
        scan.insert("Channel Page", "09");
        scan.insert("Pan ID", "8888");
        scan.insert("Addr", "001D129012345678");
        scan.insert("LQI", "A7");

        assert!(scan.has_channel());
        assert_eq!(scan.channel(), Some("39"));
        assert_eq!(scan.pan_id(), Some("8888"));
        assert_eq!(scan.addr(), Some("001D129012345678"));
        assert_eq!(scan.lqi(), Some(0xA7));
        assert_eq!(scan.get(attr::CHANNEL_PAGE), Some("09"));
        assert_eq!(scan.len(), 5);
    }
}
