//! High-level interface for Chessnut sensor chessboards
//!
//! This crate provides the board session on top of the USB HID transport:
//! decoding position reports, driving the LED matrix, and the
//! upload/realtime mode handshake.

pub mod error;
pub mod fen;
pub mod led;
pub mod session;
pub mod square;

pub use error::BoardError;
pub use fen::{decode, piece_at, Position};
pub use led::{LedMatrix, Signal};
pub use session::{ChessLink, DeviceSession, SessionConfig, SessionMode, NO_CONNECTION};
pub use square::Square;

// Re-exported so callers don't need a direct transport dependency
pub use niclink_transport::{CancelFlag, DeviceDiscovery, DiscoveredDevice, HidDiscovery};

/// List all attached boards
pub fn list_boards() -> Result<Vec<DiscoveredDevice>, BoardError> {
    Ok(niclink_transport::list_boards()?)
}
