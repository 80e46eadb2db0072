//! Report reader shared by all transport backends
//!
//! The board pushes input reports on its own cadence once it is in realtime
//! mode. Each backend hands its input handle to a [`ReportSubsystem`], which
//! owns a dedicated reader thread and forwards every report to the callback
//! registered through [`crate::Transport::subscribe_reports`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use hidapi::HidDevice;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::error::TransportError;
use crate::protocol::report;
use crate::types::ReportCallback;

/// Anything the reader thread can pull input reports from
pub trait ReportSource: Send + 'static {
    /// Read one report, waiting at most `timeout_ms`. `Ok(0)` means timeout.
    fn read_report(&self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, TransportError>;
}

impl ReportSource for HidDevice {
    fn read_report(&self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, TransportError> {
        Ok(self.read_timeout(buf, timeout_ms)?)
    }
}

/// Configuration for the reader loop
#[derive(Clone, Debug)]
pub struct ReportReaderConfig {
    /// Read timeout in milliseconds (for checking shutdown flag when idle)
    pub read_timeout_ms: i32,
    /// Sleep duration on error before retrying
    pub error_sleep_ms: u64,
    /// Consecutive read errors after which the device is considered gone
    pub max_consecutive_errors: u32,
    /// Name prefix for the thread and debug logging
    pub name: &'static str,
}

impl ReportReaderConfig {
    /// Configuration for USB wired transport
    pub fn usb() -> Self {
        Self {
            read_timeout_ms: 10,
            error_sleep_ms: 100,
            max_consecutive_errors: 20,
            name: "usb",
        }
    }
}

/// State shared between the transport handle and its reader thread
struct Shared {
    callback: Mutex<Option<ReportCallback>>,
    shutdown: AtomicBool,
    alive: AtomicBool,
    reports: AtomicU64,
}

/// Reader thread plus the callback slot it delivers to.
///
/// Backends delegate `subscribe_reports()`, `is_connected()` and shutdown
/// to this struct.
pub struct ReportSubsystem {
    shared: Arc<Shared>,
    thread: Mutex<Option<JoinHandle<()>>>,
    has_input: bool,
}

impl ReportSubsystem {
    /// Create the subsystem, spawning a reader thread if `source` is `Some`.
    pub fn new<S: ReportSource>(
        source: Option<S>,
        config: ReportReaderConfig,
    ) -> Result<Self, TransportError> {
        let shared = Arc::new(Shared {
            callback: Mutex::new(None),
            shutdown: AtomicBool::new(false),
            alive: AtomicBool::new(true),
            reports: AtomicU64::new(0),
        });

        let has_input = source.is_some();
        let thread = match source {
            Some(source) => {
                let shared_clone = Arc::clone(&shared);
                let handle = std::thread::Builder::new()
                    .name(format!("{}-report-reader", config.name))
                    .spawn(move || run_report_reader_loop(source, shared_clone, config))
                    .map_err(|e| {
                        TransportError::Internal(format!("failed to spawn report reader: {e}"))
                    })?;
                Some(handle)
            }
            None => None,
        };

        Ok(Self {
            shared,
            thread: Mutex::new(thread),
            has_input,
        })
    }

    /// Register the report callback. Only one subscriber at a time.
    pub fn subscribe(&self, callback: ReportCallback) -> Result<(), TransportError> {
        if !self.has_input {
            return Err(TransportError::Internal(
                "transport has no input endpoint".into(),
            ));
        }
        let mut slot = self.shared.callback.lock();
        if slot.is_some() {
            return Err(TransportError::AlreadySubscribed);
        }
        *slot = Some(callback);
        Ok(())
    }

    /// Drop the registered callback, if any
    pub fn unsubscribe(&self) {
        self.shared.callback.lock().take();
    }

    /// False once the reader gave up on a failing device or was shut down
    pub fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::SeqCst)
    }

    /// Number of reports delivered so far
    pub fn report_count(&self) -> u64 {
        self.shared.reports.load(Ordering::Relaxed)
    }

    /// Stop the reader thread and wait for it to exit
    pub fn shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.shared.alive.store(false, Ordering::SeqCst);
        self.unsubscribe();
        if let Some(handle) = self.thread.lock().take() {
            if handle.join().is_err() {
                warn!("report reader thread panicked");
            }
        }
    }
}

impl Drop for ReportSubsystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Reader loop: read with a short timeout, hand reports to the callback,
/// and check the shutdown flag between reads.
fn run_report_reader_loop<S: ReportSource>(
    source: S,
    shared: Arc<Shared>,
    config: ReportReaderConfig,
) {
    debug!("{} report reader thread started", config.name);
    let mut buf = [0u8; report::INPUT_REPORT_SIZE];
    let mut consecutive_errors = 0u32;

    while !shared.shutdown.load(Ordering::Relaxed) {
        match source.read_report(&mut buf, config.read_timeout_ms) {
            Ok(len) if len > 0 => {
                consecutive_errors = 0;
                trace!(
                    "{} report reader got {} bytes: {:02X?}",
                    config.name,
                    len,
                    &buf[..len.min(16)]
                );
                shared.reports.fetch_add(1, Ordering::Relaxed);
                if let Some(callback) = shared.callback.lock().as_ref() {
                    callback(&buf[..len]);
                }
            }
            Ok(_) => {
                // Timeout, no data - loop continues to check shutdown
            }
            Err(e) => {
                consecutive_errors += 1;
                warn!("{} report reader error: {}", config.name, e);
                if consecutive_errors >= config.max_consecutive_errors {
                    warn!(
                        "{} report reader giving up after {} errors",
                        config.name, consecutive_errors
                    );
                    shared.alive.store(false, Ordering::SeqCst);
                    break;
                }
                std::thread::sleep(Duration::from_millis(config.error_sleep_ms));
            }
        }
    }

    debug!("{} report reader thread exiting", config.name);
}
