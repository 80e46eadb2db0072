//! Command handlers for the CLI application.
//!
//! This module organizes command handlers by category:
//! - `query`: Read-only commands (list, fen, watch)
//! - `board`: Commands that drive the board (LEDs, beep, mode)

pub mod board;
pub mod query;

use std::sync::Arc;
use std::time::{Duration, Instant};

use niclink_board::{CancelFlag, ChessLink, HidDiscovery, SessionConfig};
use tracing::info;

/// Result type for command handlers
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Link type used by the CLI
pub type Board = Arc<ChessLink<HidDiscovery>>;

/// Set up a Ctrl-C handler that raises the returned flag.
pub fn setup_interrupt_handler() -> CancelFlag {
    let cancel = CancelFlag::new();
    let handle = cancel.clone();

    ctrlc::set_handler(move || {
        handle.cancel();
    })
    .ok();

    cancel
}

/// Wait for a board and connect. The blocking handshake runs off the async
/// runtime's worker threads.
pub async fn open_board(
    config: SessionConfig,
    cancel: &CancelFlag,
) -> Result<Board, Box<dyn std::error::Error>> {
    if config.connect_timeout.is_none() {
        info!("Waiting for a board (Ctrl-C to abort)");
    }
    let link: Board = Arc::new(ChessLink::with_discovery(HidDiscovery::new(), config));
    let connecting = Arc::clone(&link);
    let cancel = cancel.clone();
    tokio::task::spawn_blocking(move || connecting.connect_with_cancel(&cancel)).await??;
    Ok(link)
}

/// Connect, run `f`, keep the session open for `hold_secs` if `f`
/// succeeded, then disconnect.
pub async fn with_board<F>(
    config: SessionConfig,
    cancel: &CancelFlag,
    hold_secs: u64,
    f: F,
) -> CommandResult
where
    F: FnOnce(&Board) -> CommandResult,
{
    let link = open_board(config, cancel).await?;
    let result = f(&link);
    if result.is_ok() {
        hold(hold_secs, cancel).await;
    }
    link.disconnect()?;
    result
}

/// Sleep for `secs` seconds or until Ctrl-C
pub async fn hold(secs: u64, cancel: &CancelFlag) {
    if secs == 0 {
        return;
    }
    println!("Holding for {secs}s (Ctrl-C to release)");
    let until = Instant::now() + Duration::from_secs(secs);
    while Instant::now() < until && !cancel.is_cancelled() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
