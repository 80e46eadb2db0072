//! HID Wired transport implementation for direct USB connection

use std::time::Duration;

use hidapi::HidDevice;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::TransportError;
use crate::protocol::{self, timing, usb};
use crate::report_reader::{ReportReaderConfig, ReportSubsystem};
use crate::types::{ReportCallback, TransportDeviceInfo};
use crate::Transport;

/// HID transport for wired USB connection
///
/// Commands go out as output reports on one handle; a second handle on the
/// same interface feeds the report reader thread so that reads never contend
/// with writes for the handle lock.
pub struct HidWiredTransport {
    /// Handle for output reports (commands). `None` once closed.
    command_device: Mutex<Option<HidDevice>>,
    /// Device information
    info: TransportDeviceInfo,
    /// Delay after commands (ms)
    command_delay_ms: u64,
    /// Reader thread for board reports
    reports: ReportSubsystem,
}

impl HidWiredTransport {
    /// Create a new wired transport from HID devices
    ///
    /// # Arguments
    /// * `command_device` - HID handle for output reports
    /// * `input_device` - Optional HID handle for input reports
    /// * `info` - Device information
    pub fn new(
        command_device: HidDevice,
        input_device: Option<HidDevice>,
        info: TransportDeviceInfo,
    ) -> Result<Self, TransportError> {
        let reports = ReportSubsystem::new(input_device, ReportReaderConfig::usb())?;
        Ok(Self {
            command_device: Mutex::new(Some(command_device)),
            info,
            command_delay_ms: timing::DEFAULT_DELAY_MS,
            reports,
        })
    }

    /// Write output report and wait
    fn send_and_wait(&self, buf: &[u8]) -> Result<(), TransportError> {
        let guard = self.command_device.lock();
        let device = guard.as_ref().ok_or(TransportError::Disconnected)?;
        let written = device.write(buf)?;
        if written < buf.len() {
            return Err(TransportError::ShortWrite {
                written,
                expected: buf.len(),
            });
        }
        drop(guard);
        if self.command_delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.command_delay_ms));
        }
        Ok(())
    }
}

impl Transport for HidWiredTransport {
    fn write(&self, payload: &[u8]) -> Result<(), TransportError> {
        let buf = protocol::frame_output_report(usb::OUTPUT_REPORT_ID, payload);
        debug!(
            "Sending {} ({} bytes): {:02X?}",
            protocol::cmd::name(payload.first().copied().unwrap_or(0)),
            payload.len(),
            payload
        );

        let mut attempt = 0;
        loop {
            match self.send_and_wait(&buf) {
                Ok(()) => return Ok(()),
                Err(TransportError::Disconnected) => return Err(TransportError::Disconnected),
                Err(e) => {
                    attempt += 1;
                    debug!("Send attempt {} failed: {}", attempt, e);
                    if attempt >= timing::SEND_RETRIES {
                        return Err(e);
                    }
                    std::thread::sleep(Duration::from_millis(timing::SHORT_DELAY_MS));
                }
            }
        }
    }

    fn subscribe_reports(&self, on_report: ReportCallback) -> Result<(), TransportError> {
        self.reports.subscribe(on_report)
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        &self.info
    }

    fn is_connected(&self) -> bool {
        let guard = self.command_device.lock();
        match guard.as_ref() {
            Some(device) => self.reports.is_alive() && device.get_product_string().is_ok(),
            None => false,
        }
    }

    fn close(&self) -> Result<(), TransportError> {
        self.reports.shutdown();
        // HidDevice closes on drop
        self.command_device.lock().take();
        debug!("HidWiredTransport closed");
        Ok(())
    }
}

impl Drop for HidWiredTransport {
    fn drop(&mut self) {
        debug!("HidWiredTransport dropped, stopping report reader");
        self.reports.shutdown();
    }
}
