//! Board report decoding
//!
//! A realtime report carries the whole board in 32 bytes starting at offset
//! 2, two squares per byte. Within a byte the low nibble is the first square
//! and the high nibble the second, in device order h8, g8, ... a8, h7, ...
//! a1. Nibble values index [`PIECE_SYMBOLS`].
//!
//! The decoder emits ranks in device order (rank 8 first) and files a to h,
//! with runs of empty squares collapsed to a digit, which is the piece
//! placement field of a FEN string for a board in normal orientation.

use std::fmt;
use std::str::FromStr;

use niclink_transport::protocol::report;

use crate::error::BoardError;
use crate::square::Square;

/// Symbol for each 4-bit piece code. Codes 13-15 never come from known
/// firmware.
pub const PIECE_SYMBOLS: [char; 16] = [
    '0', 'q', 'k', 'b', 'p', 'n', 'R', 'P', 'r', 'B', 'N', 'Q', 'K', '?', '?', '?',
];

/// Symbol of an empty square
pub const EMPTY: char = '0';

/// Raw 4-bit piece code at (rank, j) where `j` counts from file h.
/// Bytes past the end of a short report read as empty.
fn piece_code(raw: &[u8], rank: usize, j: usize) -> u8 {
    let idx = rank * 8 + j;
    let byte = raw
        .get(idx / 2 + report::BOARD_OFFSET)
        .copied()
        .unwrap_or(0);
    if j % 2 == 0 {
        byte & 0x0F
    } else {
        byte >> 4
    }
}

/// Decode a raw report into a position string.
///
/// Reports of 32 bytes or fewer carry no position and decode to `""`.
pub fn decode(raw: &[u8]) -> String {
    if raw.len() <= report::MIN_POSITION_LEN {
        return String::new();
    }

    let mut fen = String::with_capacity(71);
    for rank in 0..8 {
        if rank > 0 {
            fen.push('/');
        }
        let mut empty = 0u8;
        for j in (0..8).rev() {
            let symbol = PIECE_SYMBOLS[piece_code(raw, rank, j) as usize];
            if symbol == EMPTY {
                empty += 1;
                continue;
            }
            if empty > 0 {
                fen.push((b'0' + empty) as char);
                empty = 0;
            }
            fen.push(symbol);
        }
        if empty > 0 {
            fen.push((b'0' + empty) as char);
        }
    }
    fen
}

/// Piece symbol on one square, or `None` if the report carries no position
pub fn piece_at(raw: &[u8], square: Square) -> Option<char> {
    if raw.len() <= report::MIN_POSITION_LEN {
        return None;
    }
    Some(PIECE_SYMBOLS[piece_code(raw, square.x() as usize, square.y() as usize) as usize])
}

/// Raw piece codes as an 8x8 grid indexed `[x][y]` like [`Square`], or
/// `None` if the report carries no position
pub fn squares(raw: &[u8]) -> Option<[[u8; 8]; 8]> {
    if raw.len() <= report::MIN_POSITION_LEN {
        return None;
    }
    let mut grid = [[0u8; 8]; 8];
    for (rank, row) in grid.iter_mut().enumerate() {
        for (j, code) in row.iter_mut().enumerate() {
            *code = piece_code(raw, rank, j);
        }
    }
    Some(grid)
}

/// Expand a piece placement into symbols indexed `[x][y]` like [`Square`].
/// `None` unless there are exactly eight ranks of eight squares.
fn expand(placement: &str) -> Option<[[char; 8]; 8]> {
    let mut grid = [[EMPTY; 8]; 8];
    let mut ranks = placement.split('/');
    for row in grid.iter_mut() {
        let mut file = 0usize;
        for c in ranks.next()?.chars() {
            match c {
                '1'..='8' => file += c as usize - '0' as usize,
                c if c != EMPTY && PIECE_SYMBOLS.contains(&c) && file < 8 => {
                    row[7 - file] = c;
                    file += 1;
                }
                _ => return None,
            }
            if file > 8 {
                return None;
            }
        }
        if file != 8 {
            return None;
        }
    }
    match ranks.next() {
        Some(_) => None,
        None => Some(grid),
    }
}

/// A decoded board position
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Position(String);

impl Position {
    /// Decode a raw report
    pub fn from_report(raw: &[u8]) -> Self {
        Self(decode(raw))
    }

    /// True until the first full report has arrived
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Piece symbol on every square, indexed `[x][y]` like [`Square`], with
    /// [`EMPTY`] for empty squares. `None` for an empty position.
    pub fn grid(&self) -> Option<[[char; 8]; 8]> {
        expand(&self.0)
    }

    /// Ranks in device order (rank 8 first). Empty for an empty position.
    pub fn ranks(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|r| !r.is_empty())
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses a piece placement such as `"8/8/8/8/4P3/8/8/8"`. A full FEN
/// record is accepted too; only its first field is kept.
impl FromStr for Position {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let placement = s.split_whitespace().next().unwrap_or_default();
        if expand(placement).is_none() {
            return Err(BoardError::InvalidPosition(s.to_string()));
        }
        Ok(Self(placement.to_string()))
    }
}

impl From<Position> for String {
    fn from(position: Position) -> Self {
        position.0
    }
}

impl PartialEq<&str> for Position {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
