//! Rooms and their members.

use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::session::{GameId, UserId};

/// Unique identifier for a room.
pub type RoomId = u64;

/// Rooms seat exactly two players.
pub const ROOM_CAPACITY: usize = 2;

/// A seated player.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize, new)]
pub struct Player {
    /// Opaque identity from the connection layer.
    identity: UserId,
    /// Name shown to other players.
    display_name: String,
    /// Readiness flag, toggled by the player.
    #[new(default)]
    is_ready: bool,
}

impl Player {
    pub(super) fn toggle_ready(&mut self) -> bool {
        self.is_ready = !self.is_ready;
        self.is_ready
    }
}

/// Lifecycle of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum RoomState {
    /// Nobody seated.
    Empty,
    /// One member.
    Open,
    /// Two members, not both ready.
    Full,
    /// Two members, both ready, no game yet.
    Starting,
    /// A game has been started.
    InGame,
}

/// A pre-game grouping of up to two players.
#[derive(Debug, Clone, Getters)]
pub struct Room {
    /// Room id.
    id: RoomId,
    /// Display name.
    name: String,
    /// Optional join password.
    #[getter(skip)]
    password: Option<String>,
    /// Seated players in join order.
    members: Vec<Player>,
    /// Game started from this room, set once.
    active_game: Option<GameId>,
}

impl Room {
    pub(super) fn new(id: RoomId, name: String, password: Option<String>, founder: Player) -> Self {
        Self {
            id,
            name,
            password,
            members: vec![founder],
            active_game: None,
        }
    }

    /// Current lifecycle state.
    #[instrument(skip(self), fields(room_id = self.id))]
    pub fn state(&self) -> RoomState {
        if self.active_game.is_some() {
            return RoomState::InGame;
        }
        match self.members.len() {
            0 => RoomState::Empty,
            1 => RoomState::Open,
            _ if self.members.iter().all(|p| p.is_ready) => RoomState::Starting,
            _ => RoomState::Full,
        }
    }

    /// Whether joining requires a password.
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Returns true if `password` opens this room.
    pub(super) fn accepts(&self, password: Option<&str>) -> bool {
        match &self.password {
            None => true,
            Some(expected) => password == Some(expected.as_str()),
        }
    }

    /// Returns true if the identity is seated here.
    pub fn is_member(&self, identity: &str) -> bool {
        self.members.iter().any(|p| p.identity == identity)
    }

    /// Identities of all members.
    pub fn member_ids(&self) -> impl Iterator<Item = &UserId> {
        self.members.iter().map(|p| &p.identity)
    }

    pub(super) fn member_mut(&mut self, identity: &str) -> Option<&mut Player> {
        self.members.iter_mut().find(|p| p.identity == identity)
    }

    pub(super) fn members_mut(&mut self) -> &mut Vec<Player> {
        &mut self.members
    }

    pub(super) fn set_active_game(&mut self, game: GameId) {
        self.active_game = Some(game);
    }
}
