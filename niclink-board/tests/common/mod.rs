//! Scripted transport and discovery for driving a session without hardware

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use niclink_board::SessionConfig;
use niclink_transport::protocol::report;
use niclink_transport::{
    BoxedTransport, DeviceDiscovery, DiscoveredDevice, ReportCallback, Transport,
    TransportDeviceInfo, TransportError, TransportType,
};
use parking_lot::Mutex;

pub const START_POSITION: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";

pub const UPLOAD: [u8; 3] = [0x21, 0x01, 0x01];
pub const REALTIME: [u8; 3] = [0x21, 0x01, 0x00];
pub const BEEP: [u8; 6] = [0x0B, 0x04, 0x03, 0xE8, 0x00, 0xC8];

/// Transport that records every write and hands reports to the subscriber
/// on demand
pub struct MockTransport {
    info: TransportDeviceInfo,
    writes: Mutex<Vec<Vec<u8>>>,
    callback: Mutex<Option<ReportCallback>>,
    connected: AtomicBool,
    /// Writes whose command byte matches fail
    fail_command: Mutex<Option<u8>>,
    /// Writes of exactly this payload fail
    fail_payload: Mutex<Option<Vec<u8>>>,
    closes: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            info: TransportDeviceInfo {
                vid: 0x2D80,
                pid: 0x8002,
                transport_type: TransportType::HidWired,
                device_path: "/dev/hidraw-mock".into(),
                serial: None,
                product_name: Some("Chessnut Air".into()),
            },
            writes: Mutex::new(Vec::new()),
            callback: Mutex::new(None),
            connected: AtomicBool::new(true),
            fail_command: Mutex::new(None),
            fail_payload: Mutex::new(None),
            closes: AtomicUsize::new(0),
        })
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().clone()
    }

    pub fn clear_writes(&self) {
        self.writes.lock().clear();
    }

    pub fn fail_command(&self, cmd: Option<u8>) {
        *self.fail_command.lock() = cmd;
    }

    pub fn fail_payload(&self, payload: Option<&[u8]>) {
        *self.fail_payload.lock() = payload.map(<[u8]>::to_vec);
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn has_subscriber(&self) -> bool {
        self.callback.lock().is_some()
    }

    /// Deliver a report as the reader thread would
    pub fn inject(&self, raw: &[u8]) {
        if let Some(callback) = self.callback.lock().as_ref() {
            callback(raw);
        }
    }

    fn reopen(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }
}

impl Transport for MockTransport {
    fn write(&self, payload: &[u8]) -> Result<(), TransportError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }
        let failing = *self.fail_command.lock() == payload.first().copied()
            || self.fail_payload.lock().as_deref() == Some(payload);
        if failing {
            return Err(TransportError::ShortWrite {
                written: 0,
                expected: payload.len(),
            });
        }
        self.writes.lock().push(payload.to_vec());
        Ok(())
    }

    fn subscribe_reports(&self, on_report: ReportCallback) -> Result<(), TransportError> {
        let mut slot = self.callback.lock();
        if slot.is_some() {
            return Err(TransportError::AlreadySubscribed);
        }
        *slot = Some(on_report);
        Ok(())
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        &self.info
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn close(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        self.callback.lock().take();
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Discovery that offers one mock board while it is "plugged in"
pub struct MockDiscovery {
    transport: Arc<MockTransport>,
    plugged_in: AtomicBool,
    opens: AtomicUsize,
}

impl MockDiscovery {
    pub fn new(transport: Arc<MockTransport>) -> Self {
        Self {
            transport,
            plugged_in: AtomicBool::new(true),
            opens: AtomicUsize::new(0),
        }
    }

    /// Discovery with nothing attached
    pub fn unplugged(transport: Arc<MockTransport>) -> Self {
        let discovery = Self::new(transport);
        discovery.plugged_in.store(false, Ordering::SeqCst);
        discovery
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl DeviceDiscovery for MockDiscovery {
    fn list_devices(&self) -> Result<Vec<DiscoveredDevice>, TransportError> {
        if !self.plugged_in.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        Ok(vec![DiscoveredDevice {
            info: self.transport.device_info().clone(),
        }])
    }

    fn open_device(&self, _device: &DiscoveredDevice) -> Result<BoxedTransport, TransportError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.transport.reopen();
        Ok(Arc::clone(&self.transport) as BoxedTransport)
    }
}

/// Fast settings: no settle delay, quick polling, short timeout
pub fn test_config() -> SessionConfig {
    SessionConfig {
        settle_delay: Duration::ZERO,
        connect_timeout: Some(Duration::from_millis(300)),
        poll_interval: Duration::from_millis(10),
        beep_on_connect: true,
    }
}

/// Board report for the standard start position, 66 bytes
pub fn start_report() -> Vec<u8> {
    let board: [u8; 32] = [
        0x58, 0x23, 0x31, 0x85, 0x44, 0x44, 0x44, 0x44, //
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
        0x77, 0x77, 0x77, 0x77, 0xA6, 0xC9, 0x9B, 0x6A,
    ];
    let mut raw = vec![0u8; report::INPUT_REPORT_SIZE];
    raw[0] = report::BOARD_STATE;
    raw[1] = report::BOARD_STATE_LEN;
    raw[report::BOARD_OFFSET..report::BOARD_OFFSET + report::BOARD_BYTES].copy_from_slice(&board);
    raw
}

/// Start position after 1. e4: pawn gone from e2, on e4
pub fn after_e4_report() -> Vec<u8> {
    let mut raw = start_report();
    let e2 = niclink_board::Square::from_algebraic("e2").unwrap();
    let e4 = niclink_board::Square::from_algebraic("e4").unwrap();
    set_code(&mut raw, e2, 0);
    set_code(&mut raw, e4, 7);
    raw
}

/// Overwrite one square's piece code in a report
pub fn set_code(raw: &mut [u8], square: niclink_board::Square, code: u8) {
    let idx = square.x() as usize * 8 + square.y() as usize;
    let byte = &mut raw[idx / 2 + report::BOARD_OFFSET];
    if idx % 2 == 0 {
        *byte = (*byte & 0xF0) | code;
    } else {
        *byte = (*byte & 0x0F) | (code << 4);
    }
}
