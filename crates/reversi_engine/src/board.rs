//! The 8x8 Reversi board: legality annotation, placement and flips.

use tracing::{debug, error, instrument};

use super::action::MoveError;
use super::types::{BOARD_SIZE, Cell, Color, Position};

/// The 8 compass directions as `(dx, dy)`.
const DIRECTIONS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
];

/// Error returned by [`Board::from_ascii`].
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("Unexpected board character {:?} at {}:{}", ch, x, y)]
pub struct BoardParseError {
    /// Offending character.
    pub ch: char,
    /// Column.
    pub x: usize,
    /// Row.
    pub y: usize,
}

/// Reversi board, cells stored row-major as `cells[y][x]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
    /// Side the legality flags were last computed for.
    legal_for: Option<Color>,
}

impl Board {
    /// Creates a board with no discs.
    pub fn empty() -> Self {
        Self {
            cells: [[Cell::default(); BOARD_SIZE]; BOARD_SIZE],
            legal_for: None,
        }
    }

    /// Creates the opening position:
    /// (3,3)=white, (4,3)=black, (3,4)=black, (4,4)=white.
    #[instrument]
    pub fn initial() -> Self {
        let mut board = Self::empty();
        board.cells[3][3].occupant = Some(Color::White);
        board.cells[3][4].occupant = Some(Color::Black);
        board.cells[4][3].occupant = Some(Color::Black);
        board.cells[4][4].occupant = Some(Color::White);
        board
    }

    /// Builds a board from 8 rows of `W`, `B` and `.` characters.
    ///
    /// Handy for fixtures; no legality flags are set.
    pub fn from_ascii(rows: [&str; BOARD_SIZE]) -> Result<Self, BoardParseError> {
        let mut board = Self::empty();
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let occupant = match ch {
                    'W' => Some(Color::White),
                    'B' => Some(Color::Black),
                    '.' => None,
                    other => return Err(BoardParseError { ch: other, x, y }),
                };
                if x >= BOARD_SIZE {
                    return Err(BoardParseError { ch, x, y });
                }
                board.cells[y][x].occupant = occupant;
            }
        }
        Ok(board)
    }

    /// Returns the cell at the given position.
    pub fn cell(&self, pos: Position) -> Cell {
        self.cells[pos.y() as usize][pos.x() as usize]
    }

    /// Returns the disc at the given position.
    pub fn occupant(&self, pos: Position) -> Option<Color> {
        self.cell(pos).occupant
    }

    /// Side the legality flags currently describe, if any.
    pub fn legal_for(&self) -> Option<Color> {
        self.legal_for
    }

    /// Annotates every cell with whether `side` may play there.
    ///
    /// Returns the number of legal cells. Running it twice without an
    /// intervening placement yields the same annotation.
    #[instrument(skip(self))]
    pub fn compute_legal_moves(&mut self, side: Color) -> usize {
        let mut count = 0;
        for pos in Position::all() {
            let legal = self.occupant(pos).is_none()
                && DIRECTIONS
                    .iter()
                    .any(|&dir| !self.flanked_run(pos, dir, side).is_empty());
            self.cells[pos.y() as usize][pos.x() as usize].legal = legal;
            if legal {
                count += 1;
            }
        }
        self.legal_for = Some(side);
        debug!(%side, count, "Computed legal moves");
        count
    }

    /// Lists the cells currently flagged legal, row-major.
    pub fn legal_moves(&self) -> Vec<Position> {
        Position::all().filter(|&pos| self.cell(pos).legal).collect()
    }

    /// Places a disc for `side` at `(x, y)` and flips every flanked run.
    ///
    /// Returns the flipped positions. Legality flags are cleared afterwards
    /// and must be recomputed for the next side to move. A board annotated
    /// for the opponent rejects the move outright.
    #[instrument(skip(self))]
    pub fn apply_move(&mut self, x: i32, y: i32, side: Color) -> Result<Vec<Position>, MoveError> {
        let pos = Position::new(x, y)?;
        let cell = self.cell(pos);
        if !cell.is_empty() {
            return Err(MoveError::IllegalMove(pos));
        }

        let flips: Vec<Position> = DIRECTIONS
            .iter()
            .flat_map(|&dir| self.flanked_run(pos, dir, side))
            .collect();

        let flagged = match self.legal_for {
            Some(annotated) if annotated == side => cell.legal,
            // Annotated for the other side: not this side's turn.
            Some(_) => false,
            None => !flips.is_empty(),
        };
        if !flagged {
            return Err(MoveError::IllegalMove(pos));
        }
        if flips.is_empty() {
            error!(%pos, %side, "Cell flagged legal but flanks nothing");
            return Err(MoveError::InvariantViolation(format!(
                "cell {pos} was flagged legal for {side} but flips nothing"
            )));
        }

        self.set(pos, side);
        for &flipped in &flips {
            self.set(flipped, side);
        }
        self.clear_legal_moves();

        debug!(%pos, %side, flipped = flips.len(), "Move applied");
        Ok(flips)
    }

    /// Counts discs of the given color.
    pub fn count(&self, color: Color) -> u32 {
        Position::all()
            .filter(|&pos| self.occupant(pos) == Some(color))
            .count() as u32
    }

    /// Number of cells without a disc.
    pub fn empty_count(&self) -> u32 {
        Position::all()
            .filter(|&pos| self.occupant(pos).is_none())
            .count() as u32
    }

    /// Returns true when every cell holds a disc.
    pub fn is_full(&self) -> bool {
        self.empty_count() == 0
    }

    /// Formats the board as text: `W`/`B` for discs, `*` for legal cells.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity((BOARD_SIZE + 1) * BOARD_SIZE);
        for row in &self.cells {
            for cell in row {
                out.push(match (cell.occupant, cell.legal) {
                    (Some(Color::White), _) => 'W',
                    (Some(Color::Black), _) => 'B',
                    (None, true) => '*',
                    (None, false) => '.',
                });
            }
            out.push('\n');
        }
        out
    }

    fn set(&mut self, pos: Position, color: Color) {
        self.cells[pos.y() as usize][pos.x() as usize].occupant = Some(color);
    }

    fn clear_legal_moves(&mut self) {
        for row in self.cells.iter_mut() {
            for cell in row.iter_mut() {
                cell.legal = false;
            }
        }
        self.legal_for = None;
    }

    /// Opposing run starting next to `origin` in direction `(dx, dy)`,
    /// if it is closed by a `side` disc. Empty otherwise.
    fn flanked_run(&self, origin: Position, (dx, dy): (i32, i32), side: Color) -> Vec<Position> {
        let mut run = Vec::new();
        let mut x = origin.x() as i32 + dx;
        let mut y = origin.y() as i32 + dy;

        while let Some(pos) = Position::checked(x, y) {
            match self.occupant(pos) {
                Some(color) if color == side => return run,
                Some(_) => run.push(pos),
                None => break,
            }
            x += dx;
            y += dy;
        }

        Vec::new()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::initial()
    }
}
