use serde::{Deserialize, Serialize};

use super::{DeviceClassifier, Dialect};
use crate::connection::ConnectionState;

/// A printer found by discovery or taken from the paired list.
///
/// `address` is the identity; everything else may change between scans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub address: String,
    pub name: Option<String>,
    /// Dialect advertised by the transport or set explicitly by the caller.
    /// Takes priority over name classification.
    #[serde(default)]
    pub dialect_hint: Option<Dialect>,
    #[serde(default)]
    pub paired: bool,
    /// Signal strength (RSSI, dBm) of the last sighting
    #[serde(default)]
    pub signal: i16,
    #[serde(default)]
    pub last_known_state: ConnectionState,
}

impl Device {
    pub fn new(address: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            address: address.into(),
            name: name.map(str::to_string),
            dialect_hint: None,
            paired: false,
            signal: 0,
            last_known_state: ConnectionState::Disconnected,
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect_hint = Some(dialect);
        self
    }

    pub fn paired(mut self, paired: bool) -> Self {
        self.paired = paired;
        self
    }

    pub fn with_signal(mut self, signal: i16) -> Self {
        self.signal = signal;
        self
    }

    /// Dialect to use for this device: the hint if any, otherwise the name classification.
    pub fn dialect(&self) -> Dialect {
        self.dialect_hint
            .unwrap_or_else(|| DeviceClassifier::classify(self.name.as_deref()))
    }

    /// Name for logs and UIs, falling back to the address.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_creation() {
        let device = Device::new("00:11:22:33:44:55", Some("Zebra ZT230"))
            .paired(true)
            .with_signal(-60);

        assert_eq!(device.address, "00:11:22:33:44:55");
        assert_eq!(device.name.as_deref(), Some("Zebra ZT230"));
        assert!(device.paired);
        assert_eq!(device.signal, -60);
        assert_eq!(device.last_known_state, ConnectionState::Disconnected);
    }

    #[test]
    fn test_dialect_from_name() {
        assert_eq!(
            Device::new("a", Some("Zebra ZT230")).dialect(),
            Dialect::Zebra
        );
        assert_eq!(
            Device::new("b", Some("BT Thermal POS")).dialect(),
            Dialect::EscPos
        );
        assert_eq!(Device::new("c", None).dialect(), Dialect::Unknown);
    }

    #[test]
    fn test_hint_overrides_classification() {
        let device = Device::new("a", Some("Zebra ZT230")).with_dialect(Dialect::Generic);
        assert_eq!(device.dialect(), Dialect::Generic);
    }

    #[test]
    fn test_display_name_falls_back_to_address() {
        assert_eq!(Device::new("AA:BB", None).display_name(), "AA:BB");
        assert_eq!(Device::new("AA:BB", Some("RPP02")).display_name(), "RPP02");
    }

    #[test]
    fn test_device_deserializes_with_defaults() {
        let device: Device =
            serde_json::from_str(r#"{"address":"/dev/rfcomm0","name":"Printer"}"#).unwrap();
        assert_eq!(device.address, "/dev/rfcomm0");
        assert!(device.dialect_hint.is_none());
        assert!(!device.paired);
    }
}
