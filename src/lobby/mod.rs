//! Lobby: rooms, membership, readiness and game start.
//!
//! A room moves through `Empty → Open → Full → Starting → InGame`. The
//! registry owns every room; starting a game hands the seated players to the
//! [`SessionStore`](crate::session::SessionStore).

mod registry;
mod room;

pub use registry::{
    CreateError, DEFAULT_MAX_PASSWORD_LEN, JoinError, LeaveError, LeaveOutcome, LobbyRegistry,
    StartBlocker, StartError, StartedGame,
};
pub use room::{Player, ROOM_CAPACITY, Room, RoomId, RoomState};
