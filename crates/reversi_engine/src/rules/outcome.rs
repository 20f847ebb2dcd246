//! Victory determination.

use crate::{Board, Color, Outcome};
use tracing::{info, instrument};

/// Compares disc counts. Only meaningful once neither side can move.
#[instrument(skip(board))]
pub fn determine_outcome(board: &Board) -> Outcome {
    let white = board.count(Color::White);
    let black = board.count(Color::Black);

    let outcome = match white.cmp(&black) {
        std::cmp::Ordering::Greater => Outcome::White,
        std::cmp::Ordering::Less => Outcome::Black,
        std::cmp::Ordering::Equal => Outcome::Draw,
    };

    info!(white, black, %outcome, "Game decided");
    outcome
}
