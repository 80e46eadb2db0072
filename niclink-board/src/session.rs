//! Board session: connect/disconnect, mode switching and the position cache
//!
//! The board has two operating modes. In upload mode it accepts LED and beep
//! commands; in realtime mode it pushes a position report whenever a piece
//! moves. A [`ChessLink`] owns at most one live [`DeviceSession`] and keeps
//! the latest decoded position in a watch channel fed by the transport's
//! reader thread.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use niclink_transport::protocol::{self, beep, mode, timing};
use niclink_transport::{
    BoxedTransport, CancelFlag, DeviceDiscovery, HidDiscovery, ReportCallback,
    TransportDeviceInfo,
};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::BoardError;
use crate::fen::Position;
use crate::led::{LedMatrix, Signal, ROWS};
use crate::square::Square;

/// Returned by [`ChessLink::fen_or_sentinel`] when no board is connected
pub const NO_CONNECTION: &str = "ERROR: no connection.";

/// Slice used while sleeping through the settle delay
const CANCEL_CHECK_MS: u64 = 50;

/// Operating mode of the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Disconnected,
    /// Accepts LED and beep commands
    Upload,
    /// Pushes position reports
    Realtime,
}

impl SessionMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Upload => "upload",
            Self::Realtime => "realtime",
        }
    }

    /// Wire value for the mode command, `None` for `Disconnected`
    fn wire_value(&self) -> Option<u8> {
        match self {
            Self::Disconnected => None,
            Self::Upload => Some(mode::UPLOAD),
            Self::Realtime => Some(mode::REALTIME),
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Connection tuning
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Pause between opening the device and the first command. The board
    /// ignores commands sent right after it enumerates.
    pub settle_delay: Duration,
    /// Give up waiting for a board after this long (`None` waits forever)
    pub connect_timeout: Option<Duration>,
    /// How often to look for a board while waiting
    pub poll_interval: Duration,
    /// Beep once the handshake succeeds
    pub beep_on_connect: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(timing::SETTLE_DELAY_MS),
            connect_timeout: None,
            poll_interval: Duration::from_millis(timing::PLUG_POLL_MS),
            beep_on_connect: true,
        }
    }
}

/// An open board: the transport, its current mode and the LEDs last written
pub struct DeviceSession {
    transport: BoxedTransport,
    mode: SessionMode,
    leds: LedMatrix,
}

impl DeviceSession {
    fn new(transport: BoxedTransport) -> Self {
        Self {
            transport,
            mode: SessionMode::Disconnected,
            leds: LedMatrix::OFF,
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// LED state last written to the board
    pub fn leds(&self) -> LedMatrix {
        self.leds
    }

    pub fn device_info(&self) -> &TransportDeviceInfo {
        self.transport.device_info()
    }

    /// Send one raw command payload
    pub fn send(&self, payload: &[u8]) -> Result<(), BoardError> {
        debug!(
            "-> {} {:02X?}",
            protocol::cmd::name(payload.first().copied().unwrap_or(0)),
            payload
        );
        self.transport.write(payload)?;
        Ok(())
    }

    /// Switch the board's mode. The command is always sent, even if the
    /// mode is already current.
    pub fn set_mode(&mut self, target: SessionMode) -> Result<(), BoardError> {
        let Some(value) = target.wire_value() else {
            return Err(BoardError::ModeSwitchFailed(
                "cannot switch to disconnected".into(),
            ));
        };
        self.send(&protocol::mode_command(value))
            .map_err(|e| BoardError::ModeSwitchFailed(format!("{target}: {e}")))?;
        debug!("Mode {} -> {}", self.mode, target);
        self.mode = target;
        Ok(())
    }

    /// Run `op` in upload mode, then return to realtime mode whatever `op`
    /// returned. An error from `op` wins over an error switching back.
    ///
    /// If the switch to upload mode fails, `op` is skipped but the realtime
    /// command still goes out: a failed write may have reached the board.
    pub fn in_upload_mode<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, BoardError>,
    ) -> Result<T, BoardError> {
        if let Err(e) = self.set_mode(SessionMode::Upload) {
            warn!("Entering upload mode failed, restoring realtime: {}", e);
            if let Err(restore_err) = self.set_mode(SessionMode::Realtime) {
                warn!("Failed to return to realtime mode: {}", restore_err);
            }
            return Err(e);
        }
        let result = op(self);
        let restored = self.set_mode(SessionMode::Realtime);
        match (result, restored) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), restored) => {
                if let Err(restore_err) = restored {
                    warn!("Failed to return to realtime mode: {}", restore_err);
                }
                Err(e)
            }
        }
    }

    /// Write an LED matrix. Caller is responsible for the mode.
    pub fn write_leds(&mut self, matrix: LedMatrix) -> Result<(), BoardError> {
        self.send(&matrix.encode())?;
        self.leds = matrix;
        Ok(())
    }

    /// Write an LED matrix in upload mode and return to realtime
    pub fn show(&mut self, matrix: LedMatrix) -> Result<(), BoardError> {
        self.in_upload_mode(|s| s.write_leds(matrix))
    }

    pub fn beep(&self, freq_hz: u16, duration_ms: u16) -> Result<(), BoardError> {
        self.send(&protocol::beep_command(freq_hz, duration_ms))
    }

    /// Clear the lights and release the transport. Failures are logged.
    fn close(mut self) {
        if self.transport.is_connected() {
            if let Err(e) = self.set_mode(SessionMode::Upload) {
                warn!("Could not enter upload mode before closing: {}", e);
            }
            if let Err(e) = self.write_leds(LedMatrix::OFF) {
                warn!("Could not clear LEDs before closing: {}", e);
            }
        }
        if let Err(e) = self.transport.close() {
            warn!("Error closing transport: {}", e);
        }
        self.mode = SessionMode::Disconnected;
    }
}

enum Slot {
    Idle,
    Connecting,
    Live(DeviceSession),
}

/// Connection to one sensor chessboard
///
/// All methods take `&self`; the link can be shared between threads. Only one
/// session exists at a time: `connect` fails with `AlreadyConnected` while
/// another connect is in flight or a session is live.
pub struct ChessLink<D: DeviceDiscovery = HidDiscovery> {
    discovery: D,
    config: SessionConfig,
    slot: Mutex<Slot>,
    live: AtomicBool,
    position: Arc<watch::Sender<Option<Position>>>,
}

impl ChessLink<HidDiscovery> {
    /// Link that finds boards over HID with default settings
    pub fn new() -> Self {
        Self::with_discovery(HidDiscovery::new(), SessionConfig::default())
    }
}

impl Default for ChessLink<HidDiscovery> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: DeviceDiscovery> ChessLink<D> {
    pub fn with_discovery(discovery: D, config: SessionConfig) -> Self {
        let (position, _) = watch::channel(None);
        Self {
            discovery,
            config,
            slot: Mutex::new(Slot::Idle),
            live: AtomicBool::new(false),
            position: Arc::new(position),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Wait for a board and start a session
    pub fn connect(&self) -> Result<(), BoardError> {
        self.connect_with_cancel(&CancelFlag::new())
    }

    /// Wait for a board and start a session, giving up when `cancel` is raised
    pub fn connect_with_cancel(&self, cancel: &CancelFlag) -> Result<(), BoardError> {
        {
            let mut slot = self.slot.lock();
            if !matches!(*slot, Slot::Idle) {
                warn!("Connect refused: a session is already live or starting");
                return Err(BoardError::AlreadyConnected);
            }
            *slot = Slot::Connecting;
        }

        match self.establish(cancel) {
            Ok(session) => {
                let info = session.device_info().clone();
                *self.slot.lock() = Slot::Live(session);
                self.live.store(true, Ordering::SeqCst);
                self.position.send_if_modified(|current| {
                    if current.is_none() {
                        *current = Some(Position::default());
                        true
                    } else {
                        false
                    }
                });
                info!(
                    "Connected to {} ({:?}) at {}",
                    info.product_name.as_deref().unwrap_or("board"),
                    info.transport_type,
                    info.device_path
                );
                Ok(())
            }
            Err(e) => {
                *self.slot.lock() = Slot::Idle;
                self.position.send_replace(None);
                Err(e)
            }
        }
    }

    fn establish(&self, cancel: &CancelFlag) -> Result<DeviceSession, BoardError> {
        let transport = self
            .discovery
            .wait_for_device(
                self.config.poll_interval,
                self.config.connect_timeout,
                cancel,
            )
            .map_err(BoardError::from_connect)?;
        debug!("Opened {}", transport.device_info().device_path);

        let mut session = DeviceSession::new(Arc::clone(&transport));

        if !settle(self.config.settle_delay, cancel) {
            session.close();
            return Err(BoardError::Cancelled);
        }

        if let Err(e) = session.set_mode(SessionMode::Upload) {
            session.close();
            return Err(e);
        }

        if self.config.beep_on_connect {
            if let Err(e) = session.beep(beep::DEFAULT_FREQ_HZ, beep::DEFAULT_DURATION_MS) {
                warn!("Connect beep failed: {}", e);
            }
        }

        if let Err(e) = transport.subscribe_reports(self.report_handler()) {
            session.close();
            return Err(e.into());
        }

        if let Err(e) = session.set_mode(SessionMode::Realtime) {
            session.close();
            return Err(e);
        }

        Ok(session)
    }

    /// Callback run on the reader thread for every input report
    fn report_handler(&self) -> ReportCallback {
        let position = Arc::clone(&self.position);
        Box::new(move |raw: &[u8]| {
            if !protocol::is_board_report(raw) {
                debug!("Ignoring {}-byte report {:02X?}", raw.len(), raw.first());
                return;
            }
            let next = Position::from_report(raw);
            position.send_if_modified(|current| {
                if current.as_ref() == Some(&next) {
                    return false;
                }
                debug!("Position {}", next);
                *current = Some(next);
                true
            });
        })
    }

    /// End the session: lights off, transport released. Without a live
    /// session this is a no-op.
    pub fn disconnect(&self) -> Result<(), BoardError> {
        let session = {
            let mut slot = self.slot.lock();
            match std::mem::replace(&mut *slot, Slot::Idle) {
                Slot::Live(session) => session,
                other => {
                    *slot = other;
                    warn!("Disconnect requested with no live session");
                    return Ok(());
                }
            }
        };
        self.live.store(false, Ordering::SeqCst);
        session.close();
        self.position.send_replace(None);
        info!("Disconnected");
        Ok(())
    }

    /// Run `op` against the live session, holding the session lock
    pub fn with_session<T>(
        &self,
        op: impl FnOnce(&mut DeviceSession) -> Result<T, BoardError>,
    ) -> Result<T, BoardError> {
        match &mut *self.slot.lock() {
            Slot::Live(session) => op(session),
            _ => Err(BoardError::NotConnected),
        }
    }

    /// True while a session is live and its transport is still open
    pub fn is_connected(&self) -> bool {
        match &*self.slot.lock() {
            Slot::Live(session) => session.transport.is_connected(),
            _ => false,
        }
    }

    pub fn mode(&self) -> SessionMode {
        match &*self.slot.lock() {
            Slot::Live(session) => session.mode(),
            _ => SessionMode::Disconnected,
        }
    }

    pub fn device_info(&self) -> Option<TransportDeviceInfo> {
        match &*self.slot.lock() {
            Slot::Live(session) => Some(session.device_info().clone()),
            _ => None,
        }
    }

    // === LEDs ===

    /// Switch one square's LED, keeping the others as last written
    pub fn set_led(&self, x: i64, y: i64, on: bool) -> Result<(), BoardError> {
        let square = Square::new(x, y)?;
        self.with_session(|session| {
            let mut matrix = session.leds();
            matrix.set(square, on);
            session.show(matrix)
        })
    }

    /// Set all LEDs from eight bit strings, row 8 first
    pub fn set_all_leds<S: AsRef<str>>(&self, rows: [S; ROWS]) -> Result<(), BoardError> {
        let matrix = LedMatrix::from_bit_strings(rows)?;
        self.set_leds(matrix)
    }

    pub fn set_leds(&self, matrix: LedMatrix) -> Result<(), BoardError> {
        self.with_session(|session| session.show(matrix))
    }

    pub fn lights_out(&self) -> Result<(), BoardError> {
        self.set_leds(LedMatrix::OFF)
    }

    pub fn gameover_lights(&self) -> Result<(), BoardError> {
        self.set_leds(LedMatrix::GAME_OVER)
    }

    pub fn signal_lights(&self, signal: Signal) -> Result<(), BoardError> {
        self.set_leds(signal.matrix())
    }

    /// Light the two squares of a UCI move such as `"e2e4"`
    pub fn set_move_leds(&self, uci: &str) -> Result<(), BoardError> {
        let matrix = LedMatrix::for_move(uci)?;
        self.set_leds(matrix)
    }

    /// Light the squares where `current` differs from `reference`, keeping
    /// the squares of `last_move` lit alongside them. Returns whether any
    /// square outside the last move differs; if none does the LEDs are left
    /// as they were.
    pub fn show_board_diff(
        &self,
        reference: &Position,
        current: &Position,
        last_move: Option<&str>,
    ) -> Result<bool, BoardError> {
        let keep = match last_move {
            Some(uci) => LedMatrix::for_move(uci)?,
            None => LedMatrix::OFF,
        };
        self.with_session(|session| {
            let Some(diff) = LedMatrix::diff(reference, current)
                .map(|m| m.without(keep))
                .filter(|m| !m.is_empty())
            else {
                debug!("Board matches the reference position");
                return Ok(false);
            };
            info!("Board differs on {} squares", diff.lit_count());
            debug!("Differences:\n{}", diff);
            session.show(diff.union(keep))?;
            Ok(true)
        })
    }

    // === Sound ===

    pub fn beep(&self) -> Result<(), BoardError> {
        self.beep_with(beep::DEFAULT_FREQ_HZ, beep::DEFAULT_DURATION_MS)
    }

    pub fn beep_with(&self, freq_hz: u16, duration_ms: u16) -> Result<(), BoardError> {
        self.with_session(|session| session.beep(freq_hz, duration_ms))
    }

    // === Position ===

    /// Latest decoded position. Empty until the first report arrives.
    pub fn position(&self) -> Result<Position, BoardError> {
        if !self.live.load(Ordering::SeqCst) {
            return Err(BoardError::NotConnected);
        }
        self.position
            .borrow()
            .clone()
            .ok_or(BoardError::NotConnected)
    }

    /// Position string, or [`NO_CONNECTION`] without a session
    pub fn fen_or_sentinel(&self) -> String {
        match self.position() {
            Ok(position) => position.into_string(),
            Err(_) => NO_CONNECTION.to_string(),
        }
    }

    /// Receiver notified whenever the decoded position changes. `None`
    /// means no session.
    pub fn watch_position(&self) -> watch::Receiver<Option<Position>> {
        self.position.subscribe()
    }

    // === Modes ===

    /// Switch to upload mode, returning whether it worked
    pub fn upload_mode(&self) -> bool {
        self.switch_mode(SessionMode::Upload)
    }

    /// Switch to realtime mode, returning whether it worked
    pub fn realtime_mode(&self) -> bool {
        self.switch_mode(SessionMode::Realtime)
    }

    fn switch_mode(&self, target: SessionMode) -> bool {
        match self.with_session(|session| session.set_mode(target)) {
            Ok(()) => true,
            Err(e) => {
                warn!("Switch to {} mode failed: {}", target, e);
                false
            }
        }
    }
}

impl<D: DeviceDiscovery> Drop for ChessLink<D> {
    fn drop(&mut self) {
        if let Slot::Live(session) = std::mem::replace(self.slot.get_mut(), Slot::Idle) {
            session.close();
        }
    }
}

/// Sleep for `delay`, returning false early if `cancel` is raised
fn settle(delay: Duration, cancel: &CancelFlag) -> bool {
    let wake_at = Instant::now() + delay;
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let remaining = wake_at.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return true;
        }
        std::thread::sleep(remaining.min(Duration::from_millis(CANCEL_CHECK_MS)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.settle_delay, Duration::from_secs(2));
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert!(config.connect_timeout.is_none());
        assert!(config.beep_on_connect);
    }

    #[test]
    fn test_mode_wire_values() {
        assert_eq!(SessionMode::Upload.wire_value(), Some(0x01));
        assert_eq!(SessionMode::Realtime.wire_value(), Some(0x00));
        assert_eq!(SessionMode::Disconnected.wire_value(), None);
        assert_eq!(SessionMode::Realtime.to_string(), "realtime");
    }

    #[test]
    fn test_settle_zero_and_cancelled() {
        let cancel = CancelFlag::new();
        assert!(settle(Duration::ZERO, &cancel));
        cancel.cancel();
        let start = Instant::now();
        assert!(!settle(Duration::from_secs(10), &cancel));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_unconnected_link() {
        let link = ChessLink::new();
        assert_eq!(link.mode(), SessionMode::Disconnected);
        assert!(!link.is_connected());
        assert!(matches!(link.position(), Err(BoardError::NotConnected)));
        assert_eq!(link.fen_or_sentinel(), NO_CONNECTION);
        assert!(link.watch_position().borrow().is_none());
        assert!(link.disconnect().is_ok());
    }
}
