//! Board interface error types

use niclink_transport::TransportError;
use thiserror::Error;

/// Errors from board operations
#[derive(Error, Debug)]
pub enum BoardError {
    /// No board attached (or none appeared before the connect timeout)
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// The board rejected the handshake or a mode switch
    #[error("Mode switch failed: {0}")]
    ModeSwitchFailed(String),

    /// Command issued without a live session
    #[error("Not connected to a board")]
    NotConnected,

    /// A session is live, or another connect is in progress
    #[error("Already connected to a board")]
    AlreadyConnected,

    /// Square coordinate outside 0-7
    #[error("Invalid square ({x}, {y}): coordinates must be 0-7")]
    InvalidSquare { x: i64, y: i64 },

    /// LED row that is not exactly eight '0'/'1' characters
    #[error("Invalid LED row {row:?}: expected 8 characters of '0' or '1'")]
    InvalidLedRow { row: String },

    /// Move string that does not name two squares
    #[error("Invalid move {0:?}: expected squares like \"e2e4\"")]
    InvalidMove(String),

    /// Position string that is not an eight-rank piece placement
    #[error("Invalid position {0:?}: expected eight ranks of piece letters and digits")]
    InvalidPosition(String),

    /// Connect was cancelled while waiting for the board
    #[error("Connect cancelled")]
    Cancelled,

    /// Transport layer error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl BoardError {
    /// Map errors from the connect path: "not found" and "cancelled" get
    /// their own kinds, everything else stays a transport error.
    pub(crate) fn from_connect(e: TransportError) -> Self {
        match e {
            TransportError::DeviceNotFound(msg) => BoardError::DeviceNotFound(msg),
            TransportError::Cancelled => BoardError::Cancelled,
            other => BoardError::Transport(other),
        }
    }
}
