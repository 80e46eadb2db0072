//! Device registry - which USB IDs belong to a supported board
//!
//! The Chessnut Air family enumerates with a single vendor ID. Only the USB
//! interface is a HID device; over Bluetooth the board exposes a GATT
//! service instead.

/// Chessnut vendor ID
pub const VENDOR_ID: u16 = 0x2D80;

/// Known board PIDs
pub const BOARD_PIDS: &[u16] = &[
    0x8002, // Chessnut Air
    0x8003, // Chessnut Air+
    0x8004, // Chessnut Pro
    0x8005, // Chessnut Evo
];

/// Check if a VID/PID pair is a supported board
#[inline]
pub fn is_board(vid: u16, pid: u16) -> bool {
    vid == VENDOR_ID && BOARD_PIDS.contains(&pid)
}

/// Human-readable model name for a PID
pub fn model_name(pid: u16) -> &'static str {
    match pid {
        0x8002 => "Chessnut Air",
        0x8003 => "Chessnut Air+",
        0x8004 => "Chessnut Pro",
        0x8005 => "Chessnut Evo",
        _ => "Unknown board",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_board_pids() {
        for &pid in BOARD_PIDS {
            assert!(is_board(VENDOR_ID, pid));
            assert_ne!(model_name(pid), "Unknown board");
        }
    }

    #[test]
    fn test_foreign_vendor_rejected() {
        assert!(!is_board(0x3151, 0x8002));
        assert!(!is_board(VENDOR_ID, 0x0000));
    }
}
