//! Move errors.

use super::{Color, Position};

/// Error that can occur when validating or applying a move.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum MoveError {
    /// Coordinates fall outside the 8x8 board.
    #[display("Cell {}:{} is outside of the board", x, y)]
    OutOfBounds {
        /// Requested column.
        x: i32,
        /// Requested row.
        y: i32,
    },

    /// The cell is occupied or does not flank any opposing disc.
    #[display("Trying to make an invalid move at {}", _0)]
    IllegalMove(#[error(not(source))] Position),

    /// It is the other side's turn.
    #[display("Not your turn. Waiting for {}", _0)]
    NotYourTurn(#[error(not(source))] Color),

    /// The game has already finished.
    #[display("Game is already over")]
    GameOver,

    /// The caller does not play in this game.
    #[display("You are not a player in this game")]
    NotAPlayer,

    /// The engine reached a state that should be impossible.
    #[display("Invariant violation: {}", _0)]
    InvariantViolation(#[error(not(source))] String),
}
