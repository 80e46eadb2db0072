//! Board coordinates in the device's own orientation
//!
//! The board counts from h8: `x` is the LED row (0 = rank 8, the row
//! furthest from white) and `y` is the bit within that row (0 = file h,
//! 7 = file a).

use std::fmt;

use crate::error::BoardError;

const FILES: &[u8; 8] = b"abcdefgh";

/// A validated square, both coordinates in 0-7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Square {
    x: u8,
    y: u8,
}

impl Square {
    /// Create a square, rejecting coordinates outside 0-7
    pub fn new(x: i64, y: i64) -> Result<Self, BoardError> {
        if !(0..8).contains(&x) || !(0..8).contains(&y) {
            return Err(BoardError::InvalidSquare { x, y });
        }
        Ok(Self {
            x: x as u8,
            y: y as u8,
        })
    }

    /// LED row index (0 = rank 8)
    pub fn x(&self) -> u8 {
        self.x
    }

    /// Bit index within the row (0 = file h)
    pub fn y(&self) -> u8 {
        self.y
    }

    /// Parse an algebraic square name such as `"e4"`
    pub fn from_algebraic(name: &str) -> Option<Self> {
        let bytes = name.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let file = FILES.iter().position(|&f| f == bytes[0].to_ascii_lowercase())?;
        let rank = match bytes[1] {
            b'1'..=b'8' => (bytes[1] - b'0') as usize,
            _ => return None,
        };
        Some(Self {
            x: (8 - rank) as u8,
            y: (7 - file) as u8,
        })
    }

    /// Algebraic name of this square
    pub fn algebraic(&self) -> String {
        let file = FILES[7 - self.y as usize] as char;
        let rank = 8 - self.x;
        format!("{file}{rank}")
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.algebraic())
    }
}

impl TryFrom<(i64, i64)> for Square {
    type Error = BoardError;

    fn try_from((x, y): (i64, i64)) -> Result<Self, Self::Error> {
        Self::new(x, y)
    }
}
