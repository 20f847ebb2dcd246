//! Reversi lobby server library.
//!
//! Players gather in a lobby, pair up in rooms of two and play Reversi over
//! WebSockets. The server holds the authoritative copy of every room and game
//! and re-validates each move.
//!
//! # Architecture
//!
//! - **Lobby**: rooms, membership, readiness and password gating
//! - **Session**: running games, color assignment and turn order
//! - **Router**: parses inbound events and decides who hears about what
//! - **Server**: axum WebSocket endpoints and the `link-user` handshake
//!
//! Board rules live in the `reversi_engine` crate.
//!
//! # Example
//!
//! ```
//! use reversi_lobby::{Channel, LobbyRegistry, SessionRouter, SessionStore};
//!
//! let mut router = SessionRouter::new(LobbyRegistry::default(), SessionStore::seeded(7), true);
//! let replies = router.handle(
//!     "player-1",
//!     Channel::Lobby,
//!     r#"{"event":"create-game","info":{"name":"A","playerName":"Ann"}}"#,
//! );
//! assert_eq!(replies.len(), 2);
//! assert_eq!(router.lobby().len(), 1);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod ids;
mod lobby;
mod protocol;
mod router;
mod server;
mod session;

// Crate-level exports - Configuration
pub use config::{ConfigError, ServerConfig};

// Crate-level exports - Errors
pub use error::{ErrorKind, GENERIC_FAILURE, RouterError};

// Crate-level exports - Id allocation
pub use ids::IdAllocator;

// Crate-level exports - Lobby
pub use lobby::{
    CreateError, DEFAULT_MAX_PASSWORD_LEN, JoinError, LeaveError, LeaveOutcome, LobbyRegistry,
    Player, ROOM_CAPACITY, Room, RoomId, RoomState, StartBlocker, StartError, StartedGame,
};

// Crate-level exports - Wire protocol
pub use protocol::{
    ClientPlayer, CreateGameOptions, ErrorReply, GameInfo, GameRequest, HasReversiGame,
    JoinGameOptions, LeaveGameOptions, LobbyRequest, MoveOptions, Outgoing, ProtocolError,
    RawMessage, RoomInfo, ServerEvent, UserInfo,
};

// Crate-level exports - Routing
pub use router::{Channel, Envelope, SessionRouter};

// Crate-level exports - Transport
pub use server::{AppState, ConnectionHub, ConnectionId, Frame, app, serve};

// Crate-level exports - Game sessions
pub use session::{ClientView, GameId, GameSession, SessionError, SessionStore, UserId};

// Crate-level exports - Board rules
pub use reversi_engine::{Board, Color, MoveError, Outcome, Position};
