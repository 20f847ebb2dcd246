//! Game rules for Reversi.
//!
//! Pure functions evaluating a [`Board`](crate::Board): who may move next and
//! who won. Board storage and flipping live in the board module.

pub mod outcome;
pub mod turn;

pub use outcome::determine_outcome;
pub use turn::{TurnResolution, resolve_turn};
