//! In-memory registry of rooms.

use std::collections::BTreeMap;

use derive_more::{Display, Error, From};
use tracing::{debug, info, instrument, warn};

use super::room::{Player, ROOM_CAPACITY, Room, RoomId, RoomState};
use crate::ids::IdAllocator;
use crate::session::{GameId, SessionError, SessionStore};

/// Default maximum password length.
pub const DEFAULT_MAX_PASSWORD_LEN: usize = 12;

/// Failure to create a room.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum CreateError {
    /// Password longer than allowed.
    #[display("Password cannot be longer than {} symbols!", max)]
    PasswordTooLong {
        /// Configured limit.
        max: usize,
    },
    /// Founder already sits in another room.
    #[display("You are already in room {}", _0)]
    AlreadyInRoom(#[error(not(source))] RoomId),
    /// The room id counter overflowed.
    #[display("Room id counter overflowed")]
    IdsExhausted,
}

/// Failure to join a room.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum JoinError {
    /// No such room.
    #[display("Could not add player to the game that does not exist!")]
    NotFound(#[error(not(source))] RoomId),
    /// Both seats are taken.
    #[display("Game room is full!")]
    RoomFull,
    /// Caller is already seated here.
    #[display("Player is already in the room")]
    AlreadyJoined,
    /// Caller sits in a different room.
    #[display("You are already in room {}", _0)]
    AlreadyInRoom(#[error(not(source))] RoomId),
    /// The room's game has already started.
    #[display("The game in this room has already started")]
    GameInProgress,
    /// Password missing or wrong.
    #[display("Incorrect password")]
    WrongPassword,
}

/// Failure to leave a room.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum LeaveError {
    /// No such room.
    #[display("Could not leave the game that does not exist!")]
    NotFound(#[error(not(source))] RoomId),
    /// Caller is not seated in the room.
    #[display("Could not find player with provided id in this room")]
    NotAMember,
}

/// Why a room cannot start its game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StartBlocker {
    /// Not exactly two members.
    #[display("You can only start the game if there are 2 players!")]
    WrongPlayerCount(usize),
    /// Someone is not ready.
    #[display("Both players have to be ready to start the game!")]
    NotReady,
}

/// Failure to start a game.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error, From)]
pub enum StartError {
    /// No such room.
    #[display("Could not find game!")]
    #[from(ignore)]
    NotFound(#[error(not(source))] RoomId),
    /// Preconditions not met.
    #[display("{}", _0)]
    CannotStart(#[error(not(source))] StartBlocker),
    /// The session store refused to create the game.
    #[display("Could not create the game: {}", _0)]
    Session(SessionError),
}

/// What happened to a room after a member left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The room was empty and has been removed.
    Deleted,
    /// The room still exists.
    Remaining,
}

/// A started (or already running) game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartedGame {
    /// Game id.
    pub game_id: GameId,
    /// False when the room already had a game.
    pub created: bool,
}

/// Owns every room.
#[derive(Debug, Clone)]
pub struct LobbyRegistry {
    rooms: BTreeMap<RoomId, Room>,
    ids: IdAllocator,
    max_password_len: usize,
}

impl LobbyRegistry {
    /// Creates an empty registry.
    #[instrument]
    pub fn new(max_password_len: usize) -> Self {
        info!("Creating lobby registry");
        Self {
            rooms: BTreeMap::new(),
            ids: IdAllocator::new(),
            max_password_len,
        }
    }

    /// Looks up a room.
    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    /// Room the identity is seated in.
    #[instrument(skip(self))]
    pub fn room_of(&self, identity: &str) -> Option<&Room> {
        let room = self.rooms.values().find(|room| room.is_member(identity));
        if room.is_none() {
            debug!("Caller is not seated anywhere");
        }
        room
    }

    /// Rooms without a started game, ordered by id.
    pub fn open_rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms
            .values()
            .filter(|room| room.active_game().is_none())
    }

    /// Number of rooms, including rooms whose game started.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Returns true when no rooms exist.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Creates a room seating `founder`.
    ///
    /// An empty password means the room is open to everyone.
    #[instrument(skip(self, password, founder), fields(founder = %founder.identity()))]
    pub fn create_room(
        &mut self,
        name: String,
        password: Option<String>,
        founder: Player,
    ) -> Result<RoomId, CreateError> {
        let password = password.filter(|p| !p.is_empty());
        if let Some(password) = &password
            && password.chars().count() > self.max_password_len
        {
            warn!("Password too long");
            return Err(CreateError::PasswordTooLong {
                max: self.max_password_len,
            });
        }

        if let Some(room) = self.room_of(founder.identity()) {
            warn!(room_id = room.id(), "Founder already seated");
            return Err(CreateError::AlreadyInRoom(*room.id()));
        }

        let id = self.ids.allocate().ok_or(CreateError::IdsExhausted)?;

        info!(room_id = id, has_password = password.is_some(), "Room created");
        self.rooms.insert(id, Room::new(id, name, password, founder));
        Ok(id)
    }

    /// Seats `identity` in the room.
    #[instrument(skip(self, display_name, password))]
    pub fn join_room(
        &mut self,
        room_id: RoomId,
        identity: &str,
        display_name: String,
        password: Option<&str>,
    ) -> Result<&Room, JoinError> {
        let seated_elsewhere = self
            .room_of(identity)
            .map(|room| *room.id())
            .filter(|&id| id != room_id);

        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or(JoinError::NotFound(room_id))?;

        if room.members().len() >= ROOM_CAPACITY {
            warn!("Room is full");
            return Err(JoinError::RoomFull);
        }
        if room.is_member(identity) {
            warn!("Player already in room");
            return Err(JoinError::AlreadyJoined);
        }
        if let Some(other) = seated_elsewhere {
            warn!(other_room = other, "Player seated in another room");
            return Err(JoinError::AlreadyInRoom(other));
        }
        if room.active_game().is_some() {
            warn!("Game already started");
            return Err(JoinError::GameInProgress);
        }
        if !room.accepts(password) {
            warn!("Incorrect password");
            return Err(JoinError::WrongPassword);
        }

        room.members_mut()
            .push(Player::new(identity.to_string(), display_name));
        info!(members = room.members().len(), "Player joined room");
        Ok(&*room)
    }

    /// Flips the caller's readiness. `None` if the caller is not seated there.
    #[instrument(skip(self))]
    pub fn toggle_ready(&mut self, room_id: RoomId, identity: &str) -> Option<bool> {
        let player = self.rooms.get_mut(&room_id)?.member_mut(identity)?;
        let ready = player.toggle_ready();
        info!(ready, "Readiness toggled");
        Some(ready)
    }

    /// Removes the caller from the room.
    ///
    /// An empty room without a game is deleted. A room whose game started
    /// stays so the game keeps its owner.
    #[instrument(skip(self))]
    pub fn leave_room(
        &mut self,
        room_id: RoomId,
        identity: &str,
    ) -> Result<LeaveOutcome, LeaveError> {
        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or(LeaveError::NotFound(room_id))?;

        let index = room
            .members()
            .iter()
            .position(|p| p.identity() == identity)
            .ok_or(LeaveError::NotAMember)?;
        room.members_mut().remove(index);

        if room.state() == RoomState::Empty {
            self.rooms.remove(&room_id);
            info!("Last player left, room deleted");
            return Ok(LeaveOutcome::Deleted);
        }

        info!(remaining = room.members().len(), "Player left room");
        Ok(LeaveOutcome::Remaining)
    }

    /// Starts the room's game once two ready players are seated.
    ///
    /// Idempotent: a room with a game returns that game.
    #[instrument(skip(self, games))]
    pub fn maybe_start_game(
        &mut self,
        room_id: RoomId,
        games: &mut SessionStore,
    ) -> Result<StartedGame, StartError> {
        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or(StartError::NotFound(room_id))?;

        if let Some(game_id) = *room.active_game() {
            debug!(game_id, "Room already has a game");
            return Ok(StartedGame {
                game_id,
                created: false,
            });
        }

        match room.state() {
            RoomState::Starting => {}
            RoomState::Full => return Err(StartError::CannotStart(StartBlocker::NotReady)),
            _ => {
                return Err(StartError::CannotStart(StartBlocker::WrongPlayerCount(
                    room.members().len(),
                )));
            }
        }

        let game_id = games.create_session(room)?;
        room.set_active_game(game_id);
        info!(game_id, "Game started");
        Ok(StartedGame {
            game_id,
            created: true,
        })
    }
}

impl Default for LobbyRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PASSWORD_LEN)
    }
}
