//! Device discovery for Chessnut boards

use std::sync::Arc;
use std::time::{Duration, Instant};

use hidapi::HidApi;
use tracing::{debug, info, warn};

use crate::device_registry;
use crate::error::TransportError;
use crate::hid_wired::HidWiredTransport;
use crate::types::{CancelFlag, DiscoveredDevice, TransportDeviceInfo, TransportType};
use crate::BoxedTransport;

/// Slice used while sleeping between enumeration attempts, so a cancel
/// request is noticed promptly
const CANCEL_CHECK_MS: u64 = 50;

/// Device discovery abstraction
pub trait DeviceDiscovery: Send + Sync {
    /// List currently attached boards
    fn list_devices(&self) -> Result<Vec<DiscoveredDevice>, TransportError>;

    /// Open a specific board
    fn open_device(&self, device: &DiscoveredDevice) -> Result<BoxedTransport, TransportError>;

    /// Open the first attached board
    ///
    /// Fails with `DeviceNotFound` if nothing is attached.
    fn open_first(&self) -> Result<BoxedTransport, TransportError> {
        let devices = self.list_devices()?;
        let device = devices
            .first()
            .ok_or_else(|| TransportError::DeviceNotFound("No supported board found".into()))?;
        self.open_device(device)
    }

    /// Block until a board is plugged in and opened.
    ///
    /// Polls `open_first()` every `poll` until it succeeds, `timeout` elapses
    /// (`DeviceNotFound`), or `cancel` is raised (`Cancelled`). Errors other
    /// than "not found" are retried too, except permission problems which
    /// will not fix themselves.
    fn wait_for_device(
        &self,
        poll: Duration,
        timeout: Option<Duration>,
        cancel: &CancelFlag,
    ) -> Result<BoxedTransport, TransportError> {
        let start = Instant::now();
        let mut announced = false;

        loop {
            if cancel.is_cancelled() {
                return Err(TransportError::Cancelled);
            }

            match self.open_first() {
                Ok(transport) => return Ok(transport),
                Err(TransportError::DeviceNotFound(_)) => {
                    if !announced {
                        info!("Waiting for a board to be plugged in");
                        announced = true;
                    }
                }
                Err(e @ TransportError::HidPermissionDenied(_)) => return Err(e),
                Err(e) => debug!("Open attempt failed, retrying: {}", e),
            }

            if let Some(limit) = timeout {
                if start.elapsed() >= limit {
                    return Err(TransportError::DeviceNotFound(format!(
                        "no board appeared within {:.1}s",
                        limit.as_secs_f64()
                    )));
                }
            }

            let wake_at = Instant::now() + poll;
            while Instant::now() < wake_at {
                if cancel.is_cancelled() {
                    return Err(TransportError::Cancelled);
                }
                let remaining = wake_at.saturating_duration_since(Instant::now());
                std::thread::sleep(remaining.min(Duration::from_millis(CANCEL_CHECK_MS)));
            }
        }
    }
}

/// HID device discovery for USB-attached boards
pub struct HidDiscovery {
    /// Known VID/PID pairs to look for
    known_devices: Vec<(u16, u16)>,
}

impl Default for HidDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl HidDiscovery {
    /// Create a new HID discovery instance
    pub fn new() -> Self {
        Self {
            known_devices: device_registry::BOARD_PIDS
                .iter()
                .map(|&pid| (device_registry::VENDOR_ID, pid))
                .collect(),
        }
    }

    /// Check if a device matches our known devices
    fn is_known_device(&self, vid: u16, pid: u16) -> bool {
        self.known_devices.contains(&(vid, pid))
    }

    /// Open the same hidraw node twice: one handle for writes, one for the
    /// report reader. The input handle is optional; without it the board can
    /// still be driven, it just cannot report positions.
    fn open_pair(
        api: &HidApi,
        info: &TransportDeviceInfo,
    ) -> Result<(hidapi::HidDevice, Option<hidapi::HidDevice>), TransportError> {
        let device_info = api
            .device_list()
            .find(|d| d.path().to_string_lossy() == info.device_path)
            .ok_or_else(|| {
                TransportError::DeviceNotFound(format!(
                    "{:04X}:{:04X} at {}",
                    info.vid, info.pid, info.device_path
                ))
            })?;

        let command_device = device_info.open_device(api)?;
        let input_device = match device_info.open_device(api) {
            Ok(device) => Some(device),
            Err(e) => {
                warn!("Could not open input handle, position reports disabled: {}", e);
                None
            }
        };
        Ok((command_device, input_device))
    }
}

impl DeviceDiscovery for HidDiscovery {
    fn list_devices(&self) -> Result<Vec<DiscoveredDevice>, TransportError> {
        let api = HidApi::new().map_err(|e| TransportError::HidError(e.to_string()))?;
        let mut devices: Vec<DiscoveredDevice> = Vec::new();

        for device_info in api.device_list() {
            let vid = device_info.vendor_id();
            let pid = device_info.product_id();

            if !self.is_known_device(vid, pid) {
                continue;
            }

            let path = device_info.path().to_string_lossy().to_string();
            let Some(transport_type) = TransportType::for_bus(device_info.bus_type()) else {
                debug!(
                    "Skipping {:04X}:{:04X} on {:?} bus at {}",
                    vid,
                    pid,
                    device_info.bus_type(),
                    path
                );
                continue;
            };
            // One board can expose several collections on the same node
            if devices.iter().any(|d| d.info.device_path == path) {
                continue;
            }

            let serial = device_info.serial_number().map(|s| s.to_string());
            let product_name = device_info
                .product_string()
                .map(|s| s.to_string())
                .or_else(|| Some(device_registry::model_name(pid).to_string()));

            debug!(
                "Found board: VID={:04X} PID={:04X} type={:?} path={}",
                vid, pid, transport_type, path
            );

            devices.push(DiscoveredDevice {
                info: TransportDeviceInfo {
                    vid,
                    pid,
                    transport_type,
                    device_path: path,
                    serial,
                    product_name,
                },
            });
        }

        debug!("Found {} boards", devices.len());
        Ok(devices)
    }

    fn open_device(&self, device: &DiscoveredDevice) -> Result<BoxedTransport, TransportError> {
        let api = HidApi::new().map_err(|e| TransportError::HidError(e.to_string()))?;
        let (command_device, input_device) = Self::open_pair(&api, &device.info)?;

        let transport: BoxedTransport = match device.info.transport_type {
            TransportType::HidWired => Arc::new(HidWiredTransport::new(
                command_device,
                input_device,
                device.info.clone(),
            )?),
        };

        info!(
            "Opened {:?} transport for {:04X}:{:04X} ({})",
            device.info.transport_type,
            device.info.vid,
            device.info.pid,
            device_registry::model_name(device.info.pid)
        );

        Ok(transport)
    }
}
