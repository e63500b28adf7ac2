//! The D8 flow direction encoding.
//!
//! Codes run clockwise from East, each one the previous rotated by 45 degrees:
//!
//! ```text
//!  32  64  128
//!  16   x    1
//!   8   4    2
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowDirection {
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    North,
    NorthEast,
}

use FlowDirection::*;

impl FlowDirection {
    /// All eight directions in code order (1, 2, 4, ..., 128).
    pub const ALL: [FlowDirection; 8] = [
        East, SouthEast, South, SouthWest, West, NorthWest, North, NorthEast,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// The D8 code stored in a flow direction raster.
    pub fn code(self) -> u8 {
        1 << self.index()
    }

    /// Decodes a raster code, `None` for anything outside the eight valid values.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(East),
            2 => Some(SouthEast),
            4 => Some(South),
            8 => Some(SouthWest),
            16 => Some(West),
            32 => Some(NorthWest),
            64 => Some(North),
            128 => Some(NorthEast),
            _ => None,
        }
    }

    /// Decodes a cell value read as `f64`. Fractional values are never valid codes.
    pub fn from_value(value: f64) -> Option<Self> {
        if value.fract() != 0.0 {
            return None;
        }
        Self::from_code(value as i64)
    }

    /// Offset in pixel space as `(dcol, drow)`; rows grow downwards.
    pub fn offset(self) -> (isize, isize) {
        match self {
            East => (1, 0),
            SouthEast => (1, 1),
            South => (0, 1),
            SouthWest => (-1, 1),
            West => (-1, 0),
            NorthWest => (-1, -1),
            North => (0, -1),
            NorthEast => (1, -1),
        }
    }

    /// Displacement in world units `(dx, dy)` where y grows upwards.
    ///
    /// West moves by `cell_width`, the same magnitude as East.
    pub fn displacement(self, cell_width: f64, cell_height: f64) -> (f64, f64) {
        let (dcol, drow) = self.offset();
        (dcol as f64 * cell_width, -(drow as f64) * cell_height)
    }

    /// The direction rotated 180 degrees, i.e. the direction flow arrives from.
    pub fn inverse(self) -> Self {
        Self::ALL[(self.index() + 4) % 8]
    }
}

impl fmt::Display for FlowDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}
