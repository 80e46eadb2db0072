//! Protocol constants and utilities for Chessnut Air board communication
//!
//! Every host-to-board command is framed as `[cmd] [len] [payload...]`:
//!
//! | Command | Bytes |
//! |---|---|
//! | Realtime mode | `21 01 00` |
//! | Upload mode | `21 01 01` |
//! | LED matrix | `0A 08 <R8> <R7> <R6> <R5> <R4> <R3> <R2> <R1>` |
//! | Beep | `0B 04 <freq_hi> <freq_lo> <dur_hi> <dur_lo>` |
//!
//! The board answers in realtime mode with `01 24 <32 board bytes> ...`.

/// Command bytes
pub mod cmd {
    /// Write the LED matrix
    pub const SET_LED: u8 = 0x0A;
    /// Sound the buzzer
    pub const BEEP: u8 = 0x0B;
    /// Select realtime/upload mode
    pub const SET_MODE: u8 = 0x21;

    /// Get human-readable name for command byte
    pub fn name(cmd: u8) -> &'static str {
        match cmd {
            SET_LED => "SET_LED",
            BEEP => "BEEP",
            SET_MODE => "SET_MODE",
            _ => "UNKNOWN",
        }
    }
}

/// Arguments to `cmd::SET_MODE`
pub mod mode {
    /// Board pushes a position report whenever a sensor changes
    pub const REALTIME: u8 = 0x00;
    /// Board accepts LED and buzzer commands
    pub const UPLOAD: u8 = 0x01;
}

/// Input report layout
pub mod report {
    /// First byte of a board state report
    pub const BOARD_STATE: u8 = 0x01;
    /// Second byte of a board state report (payload length)
    pub const BOARD_STATE_LEN: u8 = 0x24;
    /// Offset of the first board byte
    pub const BOARD_OFFSET: usize = 2;
    /// Board bytes (64 squares, two per byte)
    pub const BOARD_BYTES: usize = 32;
    /// Reports of this length or shorter carry no position
    pub const MIN_POSITION_LEN: usize = BOARD_BYTES;
    /// Input report buffer size
    pub const INPUT_REPORT_SIZE: usize = 66;
}

/// Buzzer defaults
pub mod beep {
    pub const DEFAULT_FREQ_HZ: u16 = 1000;
    pub const DEFAULT_DURATION_MS: u16 = 200;
}

/// HID communication timing constants
pub mod timing {
    /// Number of retries for write operations
    pub const SEND_RETRIES: usize = 3;
    /// Delay between write retries (ms)
    pub const SHORT_DELAY_MS: u64 = 50;
    /// Delay after a command so the board can digest it (ms)
    pub const DEFAULT_DELAY_MS: u64 = 20;
    /// The board ignores commands for a while after the handle opens (ms)
    pub const SETTLE_DELAY_MS: u64 = 2000;
    /// Interval between enumeration attempts while waiting for a board (ms)
    pub const PLUG_POLL_MS: u64 = 500;
}

/// USB HID framing
pub mod usb {
    /// hidapi expects a report ID byte; the board uses unnumbered reports
    pub const OUTPUT_REPORT_ID: u8 = 0x00;
}

/// Build a command: `[cmd] [len] [payload...]`
pub fn build_command(cmd: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 2);
    buf.push(cmd);
    buf.push(payload.len() as u8);
    buf.extend_from_slice(payload);
    buf
}

/// Build a mode switch command
pub fn mode_command(mode: u8) -> Vec<u8> {
    build_command(cmd::SET_MODE, &[mode])
}

/// Build an LED matrix command from rows in wire order (row 8 first)
pub fn led_command(rows: &[u8; 8]) -> Vec<u8> {
    build_command(cmd::SET_LED, rows)
}

/// Build a beep command (big-endian frequency and duration)
pub fn beep_command(freq_hz: u16, duration_ms: u16) -> Vec<u8> {
    let f = freq_hz.to_be_bytes();
    let d = duration_ms.to_be_bytes();
    build_command(cmd::BEEP, &[f[0], f[1], d[0], d[1]])
}

/// Prefix a payload with an output report ID, as hidapi `write()` expects
pub fn frame_output_report(report_id: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 1);
    buf.push(report_id);
    buf.extend_from_slice(payload);
    buf
}

/// Check if a raw input report looks like a board state report
pub fn is_board_report(data: &[u8]) -> bool {
    data.len() > report::MIN_POSITION_LEN && data[0] == report::BOARD_STATE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_commands() {
        assert_eq!(mode_command(mode::REALTIME), vec![0x21, 0x01, 0x00]);
        assert_eq!(mode_command(mode::UPLOAD), vec![0x21, 0x01, 0x01]);
    }

    #[test]
    fn test_led_command_layout() {
        // E2-E4 highlighted, board in normal orientation
        let rows = [0x00, 0x00, 0x00, 0x00, 0x08, 0x00, 0x08, 0x00];
        assert_eq!(
            led_command(&rows),
            vec![0x0A, 0x08, 0x00, 0x00, 0x00, 0x00, 0x08, 0x00, 0x08, 0x00]
        );
    }

    #[test]
    fn test_beep_default() {
        let buf = beep_command(beep::DEFAULT_FREQ_HZ, beep::DEFAULT_DURATION_MS);
        assert_eq!(buf, vec![0x0B, 0x04, 0x03, 0xE8, 0x00, 0xC8]);
    }

    #[test]
    fn test_frame_output_report() {
        let framed = frame_output_report(usb::OUTPUT_REPORT_ID, &[0x21, 0x01, 0x00]);
        assert_eq!(framed, vec![0x00, 0x21, 0x01, 0x00]);
    }

    #[test]
    fn test_board_report_detection() {
        let mut data = vec![0u8; report::INPUT_REPORT_SIZE];
        data[0] = report::BOARD_STATE;
        data[1] = report::BOARD_STATE_LEN;
        assert!(is_board_report(&data));
        assert!(is_board_report(&data[..report::BOARD_OFFSET + report::BOARD_BYTES]));
        assert!(!is_board_report(&data[..report::BOARD_BYTES]));
        data[0] = 0x02;
        assert!(!is_board_report(&data));
    }

    #[test]
    fn test_command_names() {
        assert_eq!(cmd::name(cmd::SET_LED), "SET_LED");
        assert_eq!(cmd::name(0xEE), "UNKNOWN");
    }
}
