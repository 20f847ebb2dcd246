//! Game session management.

use std::collections::HashMap;

use derive_more::{Display, Error};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reversi_engine::{Board, Color, MoveError, Outcome, Position, TurnResolution, resolve_turn};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::ids::IdAllocator;
use crate::lobby::{Player, ROOM_CAPACITY, Room, RoomId};

/// Unique identifier for a game session.
pub type GameId = u64;

/// Opaque identity handed out by the connection layer.
pub type UserId = String;

/// Failure to create a session.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum SessionError {
    /// A game needs exactly two seated players.
    #[display("A game needs exactly 2 players, got {}", _0)]
    WrongPlayerCount(#[error(not(source))] usize),
    /// Both seats belong to the same identity.
    #[display("Both players share the same identity")]
    DuplicatePlayer,
    /// The game id counter overflowed.
    #[display("Game id counter overflowed")]
    IdsExhausted,
}

/// What one player sees of a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientView {
    /// Game id.
    pub id: GameId,
    /// Room the game was started from.
    pub lobby_game: RoomId,
    /// Side to move.
    pub current_turn: Color,
    /// Recipient's color.
    pub color: Color,
    /// History as `"x:y"` strings.
    pub moves: Vec<String>,
    /// Set once the game is over.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Outcome>,
}

/// A game with two players.
#[derive(Debug, Clone)]
pub struct GameSession {
    id: GameId,
    owner_room: RoomId,
    board: Board,
    white: Player,
    black: Player,
    current_turn: Color,
    remaining_empty_cells: u32,
    history: Vec<Position>,
    winner: Option<Outcome>,
}

impl GameSession {
    /// Creates a session on the opening board and resolves the first turn.
    #[instrument(skip(white, black), fields(white = %white.identity(), black = %black.identity()))]
    fn new(id: GameId, owner_room: RoomId, white: Player, black: Player) -> Self {
        let board = Board::initial();
        let remaining_empty_cells = board.empty_count();
        let mut session = Self {
            id,
            owner_room,
            board,
            white,
            black,
            current_turn: Color::White,
            remaining_empty_cells,
            history: Vec::new(),
            winner: None,
        };
        session.resolve_turn();
        session
    }

    /// Session id.
    pub fn id(&self) -> GameId {
        self.id
    }

    /// Room the game belongs to.
    pub fn owner_room(&self) -> RoomId {
        self.owner_room
    }

    /// The board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Side to move.
    pub fn current_turn(&self) -> Color {
        self.current_turn
    }

    /// Cells still empty.
    pub fn remaining_empty_cells(&self) -> u32 {
        self.remaining_empty_cells
    }

    /// Outcome, once the game is over.
    pub fn winner(&self) -> Option<Outcome> {
        self.winner
    }

    /// Player holding the given color.
    pub fn player(&self, color: Color) -> &Player {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    /// Color played by the identity, if it plays here.
    pub fn color_of(&self, identity: &str) -> Option<Color> {
        if self.white.identity() == identity {
            Some(Color::White)
        } else if self.black.identity() == identity {
            Some(Color::Black)
        } else {
            None
        }
    }

    /// History in the `"x:y"` wire encoding.
    pub fn moves(&self) -> Vec<String> {
        self.history.iter().map(ToString::to_string).collect()
    }

    /// View of the game for the player of `color`.
    pub fn view_as(&self, color: Color) -> ClientView {
        ClientView {
            id: self.id,
            lobby_game: self.owner_room,
            current_turn: self.current_turn,
            color,
            moves: self.moves(),
            winner: self.winner,
        }
    }

    /// View for the identity, `None` if it does not play here.
    pub fn view_for(&self, identity: &str) -> Option<ClientView> {
        self.color_of(identity).map(|color| self.view_as(color))
    }

    /// Plays a disc for `identity` at `(x, y)`.
    ///
    /// Rejections never touch the board.
    #[instrument(skip(self), fields(game_id = self.id))]
    pub fn submit_move(&mut self, identity: &str, x: i32, y: i32) -> Result<ClientView, MoveError> {
        if self.winner.is_some() {
            warn!("Move after game over");
            return Err(MoveError::GameOver);
        }

        let color = self.color_of(identity).ok_or_else(|| {
            warn!("Unknown player attempted move");
            MoveError::NotAPlayer
        })?;

        if color != self.current_turn {
            warn!(
                player_color = %color,
                current_turn = %self.current_turn,
                "Player tried to move out of turn"
            );
            return Err(MoveError::NotYourTurn(self.current_turn));
        }

        let flips = self.board.apply_move(x, y, color).map_err(|e| {
            warn!(error = %e, "Invalid move");
            e
        })?;

        let pos = Position::new(x, y)?;
        self.remaining_empty_cells -= 1;
        debug_assert_eq!(self.remaining_empty_cells, self.board.empty_count());
        self.history.push(pos);
        self.current_turn = color.opponent();
        self.resolve_turn();

        info!(
            %pos,
            flipped = flips.len(),
            current_turn = %self.current_turn,
            winner = ?self.winner,
            "Move completed successfully"
        );

        Ok(self.view_as(color))
    }

    /// Annotates legal moves for the side to move, applying the pass rule.
    fn resolve_turn(&mut self) {
        match resolve_turn(&mut self.board, self.current_turn) {
            TurnResolution::ToMove { side, passed } => {
                if passed {
                    info!(game_id = self.id, skipped = %self.current_turn, "Turn skipped");
                }
                self.current_turn = side;
            }
            TurnResolution::Finished(outcome) => {
                info!(game_id = self.id, %outcome, "Game over");
                self.winner = Some(outcome);
            }
        }
    }

    #[cfg(test)]
    fn set_board_for_test(&mut self, board: Board, current_turn: Color) {
        self.remaining_empty_cells = board.empty_count();
        self.board = board;
        self.current_turn = current_turn;
        self.winner = None;
        self.resolve_turn();
    }
}

/// Owns every game session.
#[derive(Debug)]
pub struct SessionStore {
    sessions: HashMap<GameId, GameSession>,
    by_room: HashMap<RoomId, GameId>,
    by_player: HashMap<UserId, GameId>,
    ids: IdAllocator,
    rng: StdRng,
}

impl SessionStore {
    /// Creates a store drawing colors from OS entropy.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating session store");
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Creates a store with reproducible color assignment.
    #[instrument]
    pub fn seeded(seed: u64) -> Self {
        info!("Creating seeded session store");
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// Makes the next game id `first`.
    #[cfg(test)]
    pub(crate) fn with_first_id(mut self, first: GameId) -> Self {
        self.ids = IdAllocator::starting_at(first);
        self
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            sessions: HashMap::new(),
            by_room: HashMap::new(),
            by_player: HashMap::new(),
            ids: IdAllocator::new(),
            rng,
        }
    }

    /// Starts a game for the room's two members, colors by coin flip.
    #[instrument(skip(self, room), fields(room_id = *room.id()))]
    pub fn create_session(&mut self, room: &Room) -> Result<GameId, SessionError> {
        let [first, second] = <&[Player; ROOM_CAPACITY]>::try_from(room.members().as_slice())
            .map_err(|_| SessionError::WrongPlayerCount(room.members().len()))?;

        if first.identity() == second.identity() {
            return Err(SessionError::DuplicatePlayer);
        }

        let id = self.ids.allocate().ok_or(SessionError::IdsExhausted)?;

        let (white, black) = if self.rng.random_bool(0.5) {
            (first.clone(), second.clone())
        } else {
            (second.clone(), first.clone())
        };

        let session = GameSession::new(id, *room.id(), white, black);
        info!(
            game_id = id,
            white = %session.white.identity(),
            black = %session.black.identity(),
            "Created new session"
        );

        self.by_room.insert(*room.id(), id);
        self.by_player.insert(session.white.identity().clone(), id);
        self.by_player.insert(session.black.identity().clone(), id);
        self.sessions.insert(id, session);
        Ok(id)
    }

    /// Gets a session by id.
    pub fn get(&self, id: GameId) -> Option<&GameSession> {
        self.sessions.get(&id)
    }

    /// Session started from the room.
    #[instrument(skip(self))]
    pub fn get_by_room(&self, room_id: RoomId) -> Option<&GameSession> {
        let session = self.by_room.get(&room_id).and_then(|id| self.sessions.get(id));
        if session.is_none() {
            debug!("No session for room");
        }
        session
    }

    /// Most recent session the identity plays in.
    #[instrument(skip(self))]
    pub fn get_by_player(&self, identity: &str) -> Option<&GameSession> {
        let session = self.by_player.get(identity).and_then(|id| self.sessions.get(id));
        if session.is_none() {
            debug!("No session for player");
        }
        session
    }

    /// Mutable variant of [`SessionStore::get_by_player`].
    pub fn get_by_player_mut(&mut self, identity: &str) -> Option<&mut GameSession> {
        let id = self.by_player.get(identity)?;
        self.sessions.get_mut(id)
    }

    /// Number of sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true when no game was ever started.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
