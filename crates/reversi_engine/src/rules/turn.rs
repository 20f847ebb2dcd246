//! Turn resolution with the double-pass rule.
//!
//! A side without legal moves passes once. If the opponent cannot move
//! either, the game ends no matter how many cells are still empty.

use super::determine_outcome;
use crate::{Board, Color, Outcome};
use tracing::{debug, info, instrument};

/// Result of resolving whose turn it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnResolution {
    /// `side` has at least one legal move; the board is annotated for it.
    ToMove {
        /// Side to move.
        side: Color,
        /// True when the expected side had to pass.
        passed: bool,
    },
    /// Neither side can move.
    Finished(Outcome),
}

/// Computes legal moves for `side`, passing to the opponent at most once.
#[instrument(skip(board))]
pub fn resolve_turn(board: &mut Board, side: Color) -> TurnResolution {
    if board.is_full() {
        debug!("Board is full");
        return TurnResolution::Finished(determine_outcome(board));
    }

    let mut candidate = side;
    for attempt in 0..2 {
        if board.compute_legal_moves(candidate) > 0 {
            return TurnResolution::ToMove {
                side: candidate,
                passed: attempt > 0,
            };
        }
        info!(side = %candidate, "No legal moves, skipping turn");
        candidate = candidate.opponent();
    }

    TurnResolution::Finished(determine_outcome(board))
}
