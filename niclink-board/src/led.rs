//! LED matrix types and encoding
//!
//! The board has one LED per square. The matrix is sent as eight bytes,
//! one per row, furthest row (rank 8) first. Within a row bit 7 is file a
//! and bit 0 is file h, so a bit string like `"10000001"` reads left to
//! right across the board as white sees it.

use std::fmt;

use niclink_transport::protocol;

use crate::error::BoardError;
use crate::fen::{self, Position};
use crate::square::Square;

/// Number of LED rows
pub const ROWS: usize = 8;

/// State of every square LED, rows in wire order (rank 8 first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct LedMatrix {
    rows: [u8; ROWS],
}

impl LedMatrix {
    /// All LEDs dark
    pub const OFF: Self = Self { rows: [0x00; ROWS] };

    /// All LEDs lit
    pub const ON: Self = Self { rows: [0xFF; ROWS] };

    /// Game over: a hollow square with a ring in the centre
    pub const GAME_OVER: Self = Self {
        rows: [
            0b1111_1111,
            0b1000_0001,
            0b1011_1101,
            0b1010_0101,
            0b1010_0101,
            0b1011_1101,
            0b1000_0001,
            0b1111_1111,
        ],
    };

    pub fn off() -> Self {
        Self::OFF
    }

    pub fn on() -> Self {
        Self::ON
    }

    /// Build from raw row bytes in wire order
    pub fn from_rows(rows: [u8; ROWS]) -> Self {
        Self { rows }
    }

    /// Build from eight bit strings in wire order (rank 8 first)
    pub fn from_bit_strings<S: AsRef<str>>(rows: [S; ROWS]) -> Result<Self, BoardError> {
        let mut parsed = [0u8; ROWS];
        for (slot, row) in parsed.iter_mut().zip(rows.iter()) {
            *slot = parse_row(row.as_ref())?;
        }
        Ok(Self { rows: parsed })
    }

    /// Light the origin and destination squares of a UCI move (`"e2e4"`,
    /// `"e7e8q"`). Only the notation is checked, not the move.
    pub fn for_move(uci: &str) -> Result<Self, BoardError> {
        let invalid = || BoardError::InvalidMove(uci.to_string());
        if !(uci.len() == 4 || uci.len() == 5) || !uci.is_ascii() {
            return Err(invalid());
        }
        if uci.len() == 5 && !matches!(uci.as_bytes()[4], b'q' | b'r' | b'b' | b'n') {
            return Err(invalid());
        }
        let from = Square::from_algebraic(&uci[..2]).ok_or_else(invalid)?;
        let to = Square::from_algebraic(&uci[2..4]).ok_or_else(invalid)?;

        let mut matrix = Self::OFF;
        matrix.set(from, true);
        matrix.set(to, true);
        Ok(matrix)
    }

    /// Light every occupied square of a raw board report
    pub fn occupied(raw: &[u8]) -> Self {
        let mut rows = [0u8; ROWS];
        if let Some(grid) = fen::squares(raw) {
            for (row, codes) in rows.iter_mut().zip(grid.iter()) {
                for (bit, &code) in codes.iter().enumerate() {
                    if code != 0 {
                        *row |= 1 << bit;
                    }
                }
            }
        }
        Self { rows }
    }

    /// Light every square whose piece differs between two positions, or
    /// `None` if they agree everywhere. An empty position counts as an
    /// empty board.
    pub fn diff(a: &Position, b: &Position) -> Option<Self> {
        let bare = [[fen::EMPTY; 8]; 8];
        let a = a.grid().unwrap_or(bare);
        let b = b.grid().unwrap_or(bare);

        let mut rows = [0u8; ROWS];
        for (row, (ra, rb)) in rows.iter_mut().zip(a.iter().zip(b.iter())) {
            for (bit, (pa, pb)) in ra.iter().zip(rb.iter()).enumerate() {
                if pa != pb {
                    *row |= 1 << bit;
                }
            }
        }
        let matrix = Self { rows };
        (!matrix.is_empty()).then_some(matrix)
    }

    /// Squares lit in either matrix
    pub fn union(self, other: Self) -> Self {
        let mut rows = self.rows;
        for (row, extra) in rows.iter_mut().zip(other.rows) {
            *row |= extra;
        }
        Self { rows }
    }

    /// Squares lit here but not in `other`
    pub fn without(self, other: Self) -> Self {
        let mut rows = self.rows;
        for (row, mask) in rows.iter_mut().zip(other.rows) {
            *row &= !mask;
        }
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|&r| r == 0)
    }

    /// Switch one square on or off
    pub fn set(&mut self, square: Square, on: bool) {
        let mask = 1u8 << square.y();
        let row = &mut self.rows[square.x() as usize];
        if on {
            *row |= mask;
        } else {
            *row &= !mask;
        }
    }

    /// Check whether a square is lit
    pub fn is_lit(&self, square: Square) -> bool {
        self.rows[square.x() as usize] & (1 << square.y()) != 0
    }

    /// Row bytes in wire order
    pub fn rows(&self) -> &[u8; ROWS] {
        &self.rows
    }

    /// Number of lit squares
    pub fn lit_count(&self) -> u32 {
        self.rows.iter().map(|r| r.count_ones()).sum()
    }

    /// Rows as bit strings, wire order
    pub fn to_bit_strings(&self) -> [String; ROWS] {
        self.rows.map(|r| format!("{r:08b}"))
    }

    /// Device command payload: `[0x0A, 0x08, row8 .. row1]`
    pub fn encode(&self) -> Vec<u8> {
        protocol::led_command(&self.rows)
    }
}

impl fmt::Display for LedMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.rows.iter().enumerate() {
            write!(f, "{} ", ROWS - i)?;
            for bit in (0..8).rev() {
                let c = if row & (1 << bit) != 0 { '#' } else { '.' };
                write!(f, "{c}")?;
            }
            writeln!(f)?;
        }
        write!(f, "  abcdefgh")
    }
}

/// Parse one row: exactly eight '0'/'1' characters, leftmost is bit 7
pub fn parse_row(row: &str) -> Result<u8, BoardError> {
    let invalid = || BoardError::InvalidLedRow {
        row: row.to_string(),
    };
    if row.len() != 8 || !row.bytes().all(|b| b == b'0' || b == b'1') {
        return Err(invalid());
    }
    u8::from_str_radix(row, 2).map_err(|_| invalid())
}

/// Predefined light patterns for signalling the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Signal {
    Ring = 1,
    LeftHalf = 2,
    RightHalf = 3,
    CenterLine = 4,
    CenterCross = 5,
}

impl Signal {
    /// Get signal from its number
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Ring),
            2 => Some(Self::LeftHalf),
            3 => Some(Self::RightHalf),
            4 => Some(Self::CenterLine),
            5 => Some(Self::CenterCross),
            _ => None,
        }
    }

    /// Get the display name for this signal
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ring => "Ring",
            Self::LeftHalf => "Left Half",
            Self::RightHalf => "Right Half",
            Self::CenterLine => "Center Line",
            Self::CenterCross => "Center Cross",
        }
    }

    /// The light pattern for this signal
    pub fn matrix(&self) -> LedMatrix {
        let rows = match self {
            Self::Ring => [0xFF, 0x81, 0x81, 0x81, 0x81, 0x81, 0x81, 0xFF],
            Self::LeftHalf => [0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF],
            Self::RightHalf => [0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00],
            Self::CenterLine => [0x00, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00, 0x00],
            Self::CenterCross => [0x18, 0x18, 0x18, 0xFF, 0xFF, 0x18, 0x18, 0x18],
        };
        LedMatrix::from_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_over_matches_bit_strings() {
        let matrix = LedMatrix::from_bit_strings([
            "11111111", "10000001", "10111101", "10100101", "10100101", "10111101", "10000001",
            "11111111",
        ])
        .unwrap();
        assert_eq!(matrix, LedMatrix::GAME_OVER);
        assert_eq!(matrix.encode(), LedMatrix::GAME_OVER.encode());
    }

    #[test]
    fn test_encode_layout() {
        assert_eq!(
            LedMatrix::off().encode(),
            vec![0x0A, 0x08, 0, 0, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(LedMatrix::on().encode()[2..], [0xFF; 8]);
    }

    #[test]
    fn test_first_string_is_first_wire_row() {
        let matrix = LedMatrix::from_bit_strings([
            "10000000", "00000000", "00000000", "00000000", "00000000", "00000000", "00000000",
            "00000001",
        ])
        .unwrap();
        let payload = matrix.encode();
        assert_eq!(payload[2], 0x80); // a8
        assert_eq!(payload[9], 0x01); // h1
        assert!(matrix.is_lit(Square::from_algebraic("a8").unwrap()));
        assert!(matrix.is_lit(Square::from_algebraic("h1").unwrap()));
    }

    #[test]
    fn test_parse_row_rejects_bad_input() {
        for row in ["", "1010101", "101010101", "1010102a", "11111111 "] {
            assert!(
                matches!(parse_row(row), Err(BoardError::InvalidLedRow { .. })),
                "{row:?}"
            );
        }
        assert_eq!(parse_row("00011000").unwrap(), 0x18);
    }

    #[test]
    fn test_set_and_clear_square() {
        let mut matrix = LedMatrix::off();
        let sq = Square::new(4, 3).unwrap();
        matrix.set(sq, true);
        assert_eq!(matrix.rows()[4], 0x08);
        assert_eq!(matrix.lit_count(), 1);
        matrix.set(sq, true);
        assert_eq!(matrix.lit_count(), 1);
        matrix.set(sq, false);
        assert_eq!(matrix, LedMatrix::OFF);
    }

    #[test]
    fn test_move_e2e4() {
        // Same bytes as the protocol documentation's E2-E4 example
        let matrix = LedMatrix::for_move("e2e4").unwrap();
        assert_eq!(
            matrix.encode(),
            vec![0x0A, 0x08, 0x00, 0x00, 0x00, 0x00, 0x08, 0x00, 0x08, 0x00]
        );
        assert_eq!(LedMatrix::for_move("e7e8q").unwrap().lit_count(), 2);
    }

    #[test]
    fn test_bad_moves() {
        for uci in ["", "e2", "e2e9", "e2e4k", "z1a1", "e2-e4", "é2e4"] {
            assert!(
                matches!(LedMatrix::for_move(uci), Err(BoardError::InvalidMove(_))),
                "{uci:?}"
            );
        }
    }

    #[test]
    fn test_occupied_squares_of_start_position() {
        let mut raw = vec![0u8; 34];
        raw[2..6].copy_from_slice(&[0x58, 0x23, 0x31, 0x85]);
        raw[6..10].copy_from_slice(&[0x44; 4]);
        raw[26..30].copy_from_slice(&[0x77; 4]);
        raw[30..34].copy_from_slice(&[0xA6, 0xC9, 0x9B, 0x6A]);
        let matrix = LedMatrix::occupied(&raw);
        assert_eq!(matrix.rows(), &[0xFF, 0xFF, 0, 0, 0, 0, 0xFF, 0xFF]);
        assert_eq!(LedMatrix::occupied(&raw[..10]), LedMatrix::OFF);
    }

    #[test]
    fn test_signals() {
        for n in 1..=5 {
            let signal = Signal::from_u8(n).unwrap();
            assert_eq!(signal as u8, n);
            assert!(signal.matrix().lit_count() > 0, "{}", signal.name());
        }
        assert_eq!(Signal::from_u8(0), None);
        assert_eq!(Signal::Ring.matrix().lit_count(), 28);
    }

    #[test]
    fn test_bit_strings_roundtrip_and_display() {
        let strings = LedMatrix::GAME_OVER.to_bit_strings();
        assert_eq!(strings[2], "10111101");
        assert_eq!(LedMatrix::from_bit_strings(strings).unwrap(), LedMatrix::GAME_OVER);

        let shown = LedMatrix::for_move("a8h1").unwrap().to_string();
        let lines: Vec<&str> = shown.lines().collect();
        assert_eq!(lines[0], "8 #.......");
        assert_eq!(lines[7], "1 .......#");
        assert_eq!(lines[8], "  abcdefgh");
    }

    #[test]
    fn test_diff_after_e4() {
        let start: Position = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR".parse().unwrap();
        let after: Position = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR".parse().unwrap();

        let diff = LedMatrix::diff(&start, &after).unwrap();
        assert_eq!(diff, LedMatrix::for_move("e2e4").unwrap());
        assert_eq!(LedMatrix::diff(&after, &start), Some(diff));
        assert_eq!(LedMatrix::diff(&start, &start), None);
    }

    #[test]
    fn test_diff_sees_piece_changes_not_just_occupancy() {
        let queen: Position = "8/8/8/8/8/8/8/3Q4".parse().unwrap();
        let king: Position = "8/8/8/8/8/8/8/3K4".parse().unwrap();
        let diff = LedMatrix::diff(&queen, &king).unwrap();
        assert_eq!(diff.lit_count(), 1);
        assert!(diff.is_lit(Square::from_algebraic("d1").unwrap()));

        // Nothing decoded yet reads as an empty board
        let empty_board: Position = "8/8/8/8/8/8/8/8".parse().unwrap();
        assert_eq!(LedMatrix::diff(&Position::default(), &empty_board), None);
        assert_eq!(
            LedMatrix::diff(&Position::default(), &queen).map(|m| m.lit_count()),
            Some(1)
        );
    }

    #[test]
    fn test_union_and_without() {
        let e2e4 = LedMatrix::for_move("e2e4").unwrap();
        let e4e5 = LedMatrix::for_move("e4e5").unwrap();
        assert_eq!(e2e4.union(e4e5).lit_count(), 3);
        assert_eq!(e2e4.without(e4e5), LedMatrix::for_move("e2e2").unwrap());
        assert!(e2e4.without(e2e4).is_empty());
        assert!(!LedMatrix::GAME_OVER.is_empty());
    }
}
