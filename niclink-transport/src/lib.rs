//! Transport abstraction layer for Chessnut sensor chessboards
//!
//! This crate provides the interface for talking to the board over USB HID.
//! Boards paired over Bluetooth speak plain GATT rather than HID, never show
//! up as hidraw nodes, and are not supported.
//!
//! A transport only moves bytes: it writes command payloads and delivers raw
//! input reports to a callback on its own reader thread. Decoding and session
//! state live in `niclink-board`.

pub mod device_registry;
pub mod error;
pub mod protocol;
pub mod report_reader;
pub mod types;

mod discovery;
mod hid_wired;

pub use device_registry::{is_board, model_name, BOARD_PIDS, VENDOR_ID};
pub use error::TransportError;
pub use types::{
    CancelFlag, DiscoveredDevice, ReportCallback, TransportDeviceInfo, TransportType,
};

pub use discovery::{DeviceDiscovery, HidDiscovery};
pub use hid_wired::HidWiredTransport;

use std::sync::Arc;

/// The core transport trait - all backends implement this
///
/// Implementations are shared between the caller thread (writes) and their
/// own reader thread (reports), hence `Send + Sync`.
pub trait Transport: Send + Sync {
    /// Write one command payload (without report ID framing)
    fn write(&self, payload: &[u8]) -> Result<(), TransportError>;

    /// Register the callback that receives every raw input report.
    ///
    /// The callback runs on the transport's reader thread. Only one
    /// subscriber is supported at a time.
    fn subscribe_reports(&self, on_report: ReportCallback) -> Result<(), TransportError>;

    /// Get device information
    fn device_info(&self) -> &TransportDeviceInfo;

    /// Check if transport is still connected
    fn is_connected(&self) -> bool;

    /// Stop the reader and release the handle. Further writes fail with
    /// `TransportError::Disconnected`.
    fn close(&self) -> Result<(), TransportError>;
}

/// A transport shared between a session and its reader thread
pub type BoxedTransport = Arc<dyn Transport>;

/// List all attached boards
pub fn list_boards() -> Result<Vec<DiscoveredDevice>, TransportError> {
    HidDiscovery::new().list_devices()
}
