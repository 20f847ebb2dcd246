//! Core domain types for Reversi.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::action::MoveError;

/// Width and height of the board.
pub const BOARD_SIZE: usize = 8;

/// Total number of cells on the board.
pub const CELL_COUNT: usize = BOARD_SIZE * BOARD_SIZE;

/// One side of a match.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Color {
    /// White moves first.
    White,
    /// Black.
    Black,
}

impl Color {
    /// Returns the other side.
    pub fn opponent(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

/// A cell of the board.
///
/// `legal` is a transient annotation for the side about to move. It is only
/// meaningful right after [`Board::compute_legal_moves`](crate::Board::compute_legal_moves)
/// and is cleared whenever a disc is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell {
    /// Disc on this cell, if any.
    pub occupant: Option<Color>,
    /// Whether the side to move may place a disc here.
    pub legal: bool,
}

impl Cell {
    /// Returns true when no disc sits on this cell.
    pub fn is_empty(&self) -> bool {
        self.occupant.is_none()
    }
}

/// A coordinate on the board, `x` is the column and `y` the row (both 0-7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    x: u8,
    y: u8,
}

impl Position {
    /// Validates raw coordinates coming from the outside world.
    #[instrument]
    pub fn new(x: i32, y: i32) -> Result<Self, MoveError> {
        Self::checked(x, y).ok_or(MoveError::OutOfBounds { x, y })
    }

    /// Returns the position if both coordinates are on the board.
    pub(crate) fn checked(x: i32, y: i32) -> Option<Self> {
        let range = 0..BOARD_SIZE as i32;
        (range.contains(&x) && range.contains(&y)).then(|| Self {
            x: x as u8,
            y: y as u8,
        })
    }

    /// Column.
    pub fn x(&self) -> u8 {
        self.x
    }

    /// Row.
    pub fn y(&self) -> u8 {
        self.y
    }

    /// Iterates every cell in row-major order.
    pub fn all() -> impl Iterator<Item = Position> {
        (0..BOARD_SIZE as u8).flat_map(|y| (0..BOARD_SIZE as u8).map(move |x| Position { x, y }))
    }
}

/// Renders as the move-history encoding `"x:y"`.
impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.x, self.y)
    }
}

/// Final result of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Outcome {
    /// White holds more discs.
    White,
    /// Black holds more discs.
    Black,
    /// Equal disc counts.
    Draw,
}

impl Outcome {
    /// Returns the winning color, `None` for a draw.
    pub fn winner(self) -> Option<Color> {
        match self {
            Outcome::White => Some(Color::White),
            Outcome::Black => Some(Color::Black),
            Outcome::Draw => None,
        }
    }
}

impl From<Color> for Outcome {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Outcome::White,
            Color::Black => Outcome::Black,
        }
    }
}
