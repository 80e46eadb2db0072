//! Common types for transport layer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Transport type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransportType {
    /// Direct USB HID connection
    HidWired,
}

impl TransportType {
    /// Map a HID bus to the transport that drives it. Only USB carries the
    /// board's HID interface.
    pub fn for_bus(bus: hidapi::BusType) -> Option<Self> {
        match bus {
            hidapi::BusType::Usb => Some(Self::HidWired),
            _ => None,
        }
    }

    /// Short label for listings
    pub fn name(&self) -> &'static str {
        match self {
            Self::HidWired => "usb",
        }
    }
}

/// Device identification information
#[derive(Debug, Clone, Serialize)]
pub struct TransportDeviceInfo {
    /// USB Vendor ID
    pub vid: u16,
    /// USB Product ID
    pub pid: u16,
    /// Transport type
    pub transport_type: TransportType,
    /// Device path (hidraw node or platform identifier)
    pub device_path: String,
    /// Serial number if available
    pub serial: Option<String>,
    /// Product name if available
    pub product_name: Option<String>,
}

/// Discovered device that can be opened
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredDevice {
    /// Device information
    pub info: TransportDeviceInfo,
}

/// Callback invoked with every raw input report, on the transport's reader thread
pub type ReportCallback = Box<dyn Fn(&[u8]) + Send + Sync + 'static>;

/// Cooperative cancellation flag shared between a waiting call and whoever
/// wants to abort it (e.g. a Ctrl-C handler).
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a previous cancellation so the flag can be reused
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let handle = flag.clone();
        assert!(!flag.is_cancelled());
        handle.cancel();
        assert!(flag.is_cancelled());
        flag.reset();
        assert!(!handle.is_cancelled());
    }

    #[test]
    fn device_info_serializes_for_listing() {
        let info = TransportDeviceInfo {
            vid: 0x2D80,
            pid: 0x8002,
            transport_type: TransportType::HidWired,
            device_path: "/dev/hidraw3".into(),
            serial: None,
            product_name: Some("Chessnut Air".into()),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["pid"], 0x8002);
        assert_eq!(json["transport_type"], "HidWired");
        assert!(json["serial"].is_null());
    }

    #[test]
    fn only_usb_bus_has_a_transport() {
        assert_eq!(
            TransportType::for_bus(hidapi::BusType::Usb),
            Some(TransportType::HidWired)
        );
        for bus in [
            hidapi::BusType::Bluetooth,
            hidapi::BusType::I2c,
            hidapi::BusType::Spi,
            hidapi::BusType::Unknown,
        ] {
            assert_eq!(TransportType::for_bus(bus), None, "{bus:?}");
        }
        assert_eq!(TransportType::HidWired.name(), "usb");
    }
}
