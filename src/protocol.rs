//! JSON wire protocol for the lobby and game channels.
//!
//! Every frame is `{"event": string, "info"?: payload}`. Inbound frames are
//! parsed into typed requests per channel; payload shapes are validated in
//! full before anything is mutated.

use derive_more::{Display, Error, From};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::lobby::{Room, RoomId};
use crate::session::{ClientView, GameId, UserId};

/// Reply to a `ping` frame.
pub const PONG: &str = "pong";

/// Raw keep-alive frame.
pub const PING: &str = "ping";

/// Acknowledges a `link-user` carrying an existing id.
pub const IS_READY: &str = "is-ready";

/// Handshake event binding a connection to an identity.
pub const LINK_USER: &str = "link-user";

/// Reply to any event sent before `link-user`.
pub const NOT_REGISTERED: &str = "Socket connection is not registered!";

/// Inbound frame that could not be turned into a request.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum ProtocolError {
    /// Not a JSON object with a string `event`.
    #[display("Message must be a JSON object with a string event")]
    Malformed,
    /// Event name not known on this channel.
    #[display("Unknown event: {}", _0)]
    UnknownEvent(#[error(not(source))] String),
    /// Payload does not have the shape the event requires.
    #[display("{}", _0)]
    InvalidPayload(#[error(not(source))] &'static str),
}

/// Frame split into event name and untyped payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawMessage {
    /// Event name.
    pub event: String,
    /// Payload, `Null` when absent.
    #[serde(default)]
    pub info: Value,
}

impl RawMessage {
    /// Parses the envelope without looking at the payload.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| {
            debug!(error = %e, "Frame is not an event envelope");
            ProtocolError::Malformed
        })
    }

    fn payload<T: for<'de> Deserialize<'de>>(
        self,
        message: &'static str,
    ) -> Result<T, ProtocolError> {
        serde_json::from_value(self.info).map_err(|e| {
            warn!(event = %self.event, error = %e, "Invalid payload");
            ProtocolError::InvalidPayload(message)
        })
    }
}

/// Passwords that are not strings count as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_owned))
}

/// Payload of `create-game`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameOptions {
    /// Room name.
    pub name: String,
    /// Founder's display name.
    pub player_name: String,
    /// Optional password.
    #[serde(default, deserialize_with = "lenient_string")]
    pub password: Option<String>,
}

/// Payload of `join-game`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameOptions {
    /// Room to join.
    pub id: RoomId,
    /// Joiner's display name.
    pub player_name: String,
    /// Password, if the room has one.
    #[serde(default, deserialize_with = "lenient_string")]
    pub password: Option<String>,
}

/// Payload of `leave-game`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveGameOptions {
    /// Room to leave.
    pub id: RoomId,
}

/// Payload of `try-making-move`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOptions {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

/// Requests accepted on the lobby channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyRequest {
    /// Initial sync: current room, started game and room list.
    FirstLoadLobby,
    /// Room list only.
    GetGameList,
    /// Create a room.
    CreateGame(CreateGameOptions),
    /// Join a room.
    JoinGame(JoinGameOptions),
    /// Leave a room.
    LeaveGame(LeaveGameOptions),
    /// Flip the caller's readiness.
    TogglePlayerReadiness,
    /// Start the caller's room.
    StartGame,
}

impl LobbyRequest {
    /// Parses a lobby frame.
    #[instrument(skip(text))]
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let raw = RawMessage::parse(text)?;
        let request = match raw.event.as_str() {
            "first-load-lobby" => Self::FirstLoadLobby,
            "get-game-list" => Self::GetGameList,
            "create-game" => {
                Self::CreateGame(raw.payload("Could not create a game: invalid data provided!")?)
            }
            "join-game" => Self::JoinGame(
                raw.payload("Could not join the game: invalid information provided!")?,
            ),
            "leave-game" => Self::LeaveGame(
                raw.payload("Could not leave the game: invalid information provided!")?,
            ),
            "toggle-player-readiness" => Self::TogglePlayerReadiness,
            "start-game" => Self::StartGame,
            _ => return Err(ProtocolError::UnknownEvent(raw.event)),
        };
        Ok(request)
    }
}

/// Requests accepted on the game channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameRequest {
    /// Place a disc.
    TryMakingMove(MoveOptions),
    /// Fetch the caller's view.
    RefreshReversiGame,
}

impl GameRequest {
    /// Parses a game frame.
    #[instrument(skip(text))]
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let raw = RawMessage::parse(text)?;
        match raw.event.as_str() {
            "try-making-move" => Ok(Self::TryMakingMove(
                raw.payload("Invalid info was provided for making a move!")?,
            )),
            "refresh-reversi-game" => Ok(Self::RefreshReversiGame),
            _ => Err(ProtocolError::UnknownEvent(raw.event)),
        }
    }
}

/// Room entry in `refresh-game-list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    /// Room id.
    pub id: RoomId,
    /// Room name.
    pub name: String,
    /// Seated players.
    pub player_count: usize,
    /// Whether joining needs a password.
    pub has_password: bool,
}

impl From<&Room> for GameInfo {
    fn from(room: &Room) -> Self {
        Self {
            id: *room.id(),
            name: room.name().clone(),
            player_count: room.members().len(),
            has_password: room.has_password(),
        }
    }
}

/// Member as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPlayer {
    /// Display name.
    pub name: String,
    /// Readiness.
    pub is_ready: bool,
}

/// Room as shown to its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    /// Room id.
    pub id: RoomId,
    /// Room name.
    pub name: String,
    /// Members in join order.
    pub players: Vec<ClientPlayer>,
}

impl From<&Room> for RoomInfo {
    fn from(room: &Room) -> Self {
        Self {
            id: *room.id(),
            name: room.name().clone(),
            players: room
                .members()
                .iter()
                .map(|p| ClientPlayer {
                    name: p.display_name().clone(),
                    is_ready: *p.is_ready(),
                })
                .collect(),
        }
    }
}

/// Payload of `has-reversi-game`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HasReversiGame {
    /// Game id.
    pub id: GameId,
}

/// Payload of `save-user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    /// Freshly minted identity.
    pub user_id: UserId,
}

/// Events sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "info", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Rooms without a started game.
    RefreshGameList(Vec<GameInfo>),
    /// The recipient's room changed.
    RefreshCurrentRoom(RoomInfo),
    /// Someone left; the room as it is now.
    PlayerLeftTheGame(RoomInfo),
    /// The recipient's room has a game.
    HasReversiGame(HasReversiGame),
    /// Join rejected for a wrong password.
    IncorrectPassword,
    /// The recipient's view of its game.
    RefreshReversiGame(ClientView),
    /// The recipient plays no game.
    NoReversiGame,
    /// Identity minted during the handshake.
    SaveUser(UserInfo),
}

/// Direct error reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReply {
    /// Human readable message.
    pub message: String,
    /// Always true.
    pub is_error: bool,
}

impl ErrorReply {
    /// Creates an error reply.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: true,
        }
    }
}

/// Anything written to a socket.
#[derive(Debug, Clone, PartialEq, Eq, From)]
pub enum Outgoing {
    /// JSON event.
    Event(ServerEvent),
    /// JSON error reply.
    Error(ErrorReply),
    /// Bare text such as `pong`.
    #[from(ignore)]
    Text(&'static str),
}

impl Outgoing {
    /// Renders the frame text.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::Event(event) => serde_json::to_string(event),
            Self::Error(reply) => serde_json::to_string(reply),
            Self::Text(text) => Ok((*text).to_string()),
        }
    }
}
