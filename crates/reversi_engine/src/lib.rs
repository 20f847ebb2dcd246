//! Pure Reversi game logic.
//!
//! The board engine knows nothing about players, rooms or connections: it
//! annotates legal moves, applies placements with their flips, resolves whose
//! turn it is (including the double-pass rule) and decides the outcome.
//!
//! # Example
//!
//! ```
//! use reversi_engine::{Board, Color, TurnResolution, resolve_turn};
//!
//! let mut board = Board::initial();
//! assert_eq!(
//!     resolve_turn(&mut board, Color::White),
//!     TurnResolution::ToMove { side: Color::White, passed: false }
//! );
//! let flipped = board.apply_move(5, 3, Color::White).expect("legal opening");
//! assert_eq!(flipped.len(), 1);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod action;
mod board;
mod rules;
mod types;

pub use action::MoveError;
pub use board::{Board, BoardParseError};
pub use rules::{TurnResolution, determine_outcome, resolve_turn};
pub use types::{BOARD_SIZE, CELL_COUNT, Cell, Color, Outcome, Position};
