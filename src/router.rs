//! Session router: the root context owning rooms and games.
//!
//! The transport hands every inbound text frame to [`SessionRouter::handle`]
//! together with the caller's identity and the channel it arrived on. The
//! router validates it, mutates the registries and returns the envelopes to
//! deliver, in order. Failures turn into a single error reply to the caller.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, error, info, instrument, warn};

use crate::config::ServerConfig;
use crate::error::{ErrorKind, RouterError};
use crate::lobby::{JoinError, LeaveOutcome, LobbyRegistry, Player, Room, RoomId, RoomState};
use crate::protocol::{
    CreateGameOptions, ErrorReply, GameInfo, GameRequest, HasReversiGame, JoinGameOptions,
    LobbyRequest, MoveOptions, Outgoing, RoomInfo, ServerEvent,
};
use crate::session::{SessionStore, UserId};

/// Connection endpoint a frame arrived on or goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Channel {
    /// Room management.
    Lobby,
    /// Game play.
    Game,
}

/// A message for one identity on one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Recipient.
    pub to: UserId,
    /// Channel to deliver on.
    pub channel: Channel,
    /// Payload.
    pub message: Outgoing,
}

impl Envelope {
    /// Creates an envelope.
    pub fn new(to: impl Into<UserId>, channel: Channel, message: impl Into<Outgoing>) -> Self {
        Self {
            to: to.into(),
            channel,
            message: message.into(),
        }
    }
}

type Handled = Result<Vec<Envelope>, RouterError>;

/// Owns the lobby registry and the game session store.
#[derive(Debug)]
pub struct SessionRouter {
    lobby: LobbyRegistry,
    games: SessionStore,
    /// Open lobby connections per identity.
    lobby_subscribers: BTreeMap<UserId, usize>,
    leave_on_disconnect: bool,
}

impl SessionRouter {
    /// Creates a router from its parts.
    pub fn new(lobby: LobbyRegistry, games: SessionStore, leave_on_disconnect: bool) -> Self {
        Self {
            lobby,
            games,
            lobby_subscribers: BTreeMap::new(),
            leave_on_disconnect,
        }
    }

    /// Creates a router from configuration.
    #[instrument(skip(config))]
    pub fn from_config(config: &ServerConfig) -> Self {
        let games = match config.color_seed() {
            Some(seed) => SessionStore::seeded(*seed),
            None => SessionStore::new(),
        };
        Self::new(
            LobbyRegistry::new(*config.max_password_len()),
            games,
            *config.leave_on_disconnect(),
        )
    }

    /// The room registry.
    pub fn lobby(&self) -> &LobbyRegistry {
        &self.lobby
    }

    /// The game store.
    pub fn games(&self) -> &SessionStore {
        &self.games
    }

    /// Registers a connection bound to `identity`.
    #[instrument(skip(self))]
    pub fn connect(&mut self, identity: &str, channel: Channel) {
        if channel == Channel::Lobby {
            *self
                .lobby_subscribers
                .entry(identity.to_string())
                .or_default() += 1;
        }
        debug!("Connection registered");
    }

    /// Unregisters a connection and runs the leave path when configured.
    #[instrument(skip(self))]
    pub fn disconnect(&mut self, identity: &str, channel: Channel) -> Vec<Envelope> {
        if channel != Channel::Lobby {
            debug!("Game connection closed");
            return Vec::new();
        }

        let Some(count) = self.lobby_subscribers.get_mut(identity) else {
            return Vec::new();
        };
        *count = count.saturating_sub(1);
        if *count > 0 {
            return Vec::new();
        }
        self.lobby_subscribers.remove(identity);

        if !self.leave_on_disconnect {
            return Vec::new();
        }

        let Some(room_id) = self
            .lobby
            .room_of(identity)
            .filter(|room| room.active_game().is_none())
            .map(|room| *room.id())
        else {
            return Vec::new();
        };

        info!(room_id, "Last lobby connection closed, leaving room");
        match self.leave(identity, room_id) {
            Ok(envelopes) => envelopes.into_iter().filter(|e| e.to != identity).collect(),
            Err(err) => {
                warn!(error = %err, "Leave on disconnect failed");
                Vec::new()
            }
        }
    }

    /// Handles one inbound frame.
    #[instrument(skip(self, text), fields(user_id = %caller))]
    pub fn handle(&mut self, caller: &str, channel: Channel, text: &str) -> Vec<Envelope> {
        let result = match channel {
            Channel::Lobby => LobbyRequest::parse(text)
                .map_err(RouterError::from)
                .and_then(|request| self.handle_lobby(caller, request)),
            Channel::Game => GameRequest::parse(text)
                .map_err(RouterError::from)
                .and_then(|request| self.handle_game(caller, request)),
        };

        match result {
            Ok(envelopes) => envelopes,
            Err(err) => vec![error_reply(caller, channel, &err)],
        }
    }

    fn handle_lobby(&mut self, caller: &str, request: LobbyRequest) -> Handled {
        match request {
            LobbyRequest::FirstLoadLobby => Ok(self.first_load(caller)),
            LobbyRequest::GetGameList => Ok(vec![Envelope::new(
                caller,
                Channel::Lobby,
                self.game_list(),
            )]),
            LobbyRequest::CreateGame(options) => self.create(caller, options),
            LobbyRequest::JoinGame(options) => self.join(caller, options),
            LobbyRequest::LeaveGame(options) => self.leave(caller, options.id),
            LobbyRequest::TogglePlayerReadiness => self.toggle_ready(caller),
            LobbyRequest::StartGame => {
                let room_id = self
                    .lobby
                    .room_of(caller)
                    .map(|room| *room.id())
                    .ok_or_else(|| RouterError::not_found("Could not find game!"))?;
                self.start(room_id)
            }
        }
    }

    fn handle_game(&mut self, caller: &str, request: GameRequest) -> Handled {
        match request {
            GameRequest::RefreshReversiGame => {
                let event = match self
                    .games
                    .get_by_player(caller)
                    .and_then(|game| game.view_for(caller))
                {
                    Some(view) => ServerEvent::RefreshReversiGame(view),
                    None => ServerEvent::NoReversiGame,
                };
                Ok(vec![Envelope::new(caller, Channel::Game, event)])
            }
            GameRequest::TryMakingMove(options) => self.make_move(caller, options),
        }
    }

    fn first_load(&self, caller: &str) -> Vec<Envelope> {
        let mut envelopes = Vec::new();
        if let Some(room) = self.lobby.room_of(caller) {
            if let Some(id) = *room.active_game() {
                envelopes.push(Envelope::new(
                    caller,
                    Channel::Lobby,
                    ServerEvent::HasReversiGame(HasReversiGame { id }),
                ));
            }
            envelopes.push(Envelope::new(
                caller,
                Channel::Lobby,
                ServerEvent::RefreshCurrentRoom(RoomInfo::from(room)),
            ));
        }
        envelopes.push(Envelope::new(caller, Channel::Lobby, self.game_list()));
        envelopes
    }

    fn create(&mut self, caller: &str, options: CreateGameOptions) -> Handled {
        let CreateGameOptions {
            name,
            player_name,
            password,
        } = options;
        let founder = Player::new(caller.to_string(), player_name);
        let room_id = self.lobby.create_room(name, password, founder)?;

        let mut envelopes = self.broadcast_game_list(Some(caller));
        envelopes.push(Envelope::new(
            caller,
            Channel::Lobby,
            ServerEvent::RefreshCurrentRoom(RoomInfo::from(self.room(room_id)?)),
        ));
        Ok(envelopes)
    }

    fn join(&mut self, caller: &str, options: JoinGameOptions) -> Handled {
        let JoinGameOptions {
            id,
            player_name,
            password,
        } = options;

        let room = match self
            .lobby
            .join_room(id, caller, player_name, password.as_deref())
        {
            Ok(room) => room,
            Err(JoinError::WrongPassword) => {
                return Ok(vec![Envelope::new(
                    caller,
                    Channel::Lobby,
                    ServerEvent::IncorrectPassword,
                )]);
            }
            Err(err) => return Err(err.into()),
        };

        let mut envelopes = to_members(room, ServerEvent::RefreshCurrentRoom(RoomInfo::from(room)));
        envelopes.extend(self.broadcast_game_list(Some(caller)));
        Ok(envelopes)
    }

    fn leave(&mut self, caller: &str, room_id: RoomId) -> Handled {
        match self.lobby.leave_room(room_id, caller)? {
            LeaveOutcome::Deleted => Ok(self.broadcast_game_list(Some(caller))),
            LeaveOutcome::Remaining => {
                let room = self.room(room_id)?;
                let event = ServerEvent::PlayerLeftTheGame(RoomInfo::from(room));
                let mut envelopes = vec![Envelope::new(caller, Channel::Lobby, event.clone())];
                envelopes.extend(to_members(room, event));
                envelopes.extend(self.broadcast_game_list(Some(caller)));
                Ok(envelopes)
            }
        }
    }

    fn toggle_ready(&mut self, caller: &str) -> Handled {
        let Some(room_id) = self.lobby.room_of(caller).map(|room| *room.id()) else {
            debug!("Readiness toggle from a player without a room");
            return Ok(Vec::new());
        };
        if self.lobby.toggle_ready(room_id, caller).is_none() {
            return Ok(Vec::new());
        }

        let room = self.room(room_id)?;
        let starting = room.state() == RoomState::Starting;
        let mut envelopes =
            to_members(room, ServerEvent::RefreshCurrentRoom(RoomInfo::from(room)));

        if starting {
            info!(room_id, "Both players ready, starting game");
            match self.start(room_id) {
                Ok(started) => envelopes.extend(started),
                // Members still learn the new readiness.
                Err(err) => envelopes.push(error_reply(caller, Channel::Lobby, &err)),
            }
        }
        Ok(envelopes)
    }

    fn start(&mut self, room_id: RoomId) -> Handled {
        let started = self.lobby.maybe_start_game(room_id, &mut self.games)?;
        let room = self.room(room_id)?;

        let mut envelopes = to_members(
            room,
            ServerEvent::HasReversiGame(HasReversiGame {
                id: started.game_id,
            }),
        );
        if started.created {
            envelopes.extend(self.broadcast_game_list(None));
        }
        Ok(envelopes)
    }

    fn make_move(&mut self, caller: &str, options: MoveOptions) -> Handled {
        let game = self.games.get_by_player_mut(caller).ok_or_else(|| {
            RouterError::not_found("Trying to make a move in the game, that does not exist")
        })?;

        let view = game.submit_move(caller, options.x, options.y)?;
        let opponent = view.color.opponent();
        let opponent_id = game.player(opponent).identity().clone();
        let opponent_view = game.view_as(opponent);

        Ok(vec![
            Envelope::new(caller, Channel::Game, ServerEvent::RefreshReversiGame(view)),
            Envelope::new(
                opponent_id,
                Channel::Game,
                ServerEvent::RefreshReversiGame(opponent_view),
            ),
        ])
    }

    fn room(&self, room_id: RoomId) -> Result<&Room, RouterError> {
        self.lobby
            .room(room_id)
            .ok_or_else(|| RouterError::internal(format!("Room {} vanished", room_id)))
    }

    fn game_list(&self) -> ServerEvent {
        ServerEvent::RefreshGameList(self.lobby.open_rooms().map(GameInfo::from).collect())
    }

    /// Room list to every lobby subscriber plus `caller`.
    fn broadcast_game_list(&self, caller: Option<&str>) -> Vec<Envelope> {
        let event = self.game_list();
        let mut recipients: BTreeSet<&str> =
            self.lobby_subscribers.keys().map(String::as_str).collect();
        recipients.extend(caller);
        recipients
            .into_iter()
            .map(|to| Envelope::new(to, Channel::Lobby, event.clone()))
            .collect()
    }
}

/// Logs a failure and turns it into a reply for the caller.
fn error_reply(caller: &str, channel: Channel, err: &RouterError) -> Envelope {
    match err.kind {
        ErrorKind::Internal => error!(error = %err, "Internal error"),
        _ => warn!(error = %err, "Request rejected"),
    }
    Envelope::new(caller, channel, ErrorReply::new(err.public_message()))
}

fn to_members(room: &Room, event: ServerEvent) -> Vec<Envelope> {
    room.member_ids()
        .map(|id| Envelope::new(id.clone(), Channel::Lobby, event.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> SessionRouter {
        SessionRouter::new(LobbyRegistry::default(), SessionStore::seeded(1), true)
    }

    fn events_for<'a>(envelopes: &'a [Envelope], to: &str) -> Vec<&'a Outgoing> {
        envelopes
            .iter()
            .filter(|e| e.to == to)
            .map(|e| &e.message)
            .collect()
    }

    #[test]
    fn test_create_replies_with_room_and_list() {
        let mut router = router();
        router.connect("watcher", Channel::Lobby);

        let envelopes = router.handle(
            "p1",
            Channel::Lobby,
            r#"{"event":"create-game","info":{"name":"A","playerName":"P1"}}"#,
        );

        assert_eq!(events_for(&envelopes, "watcher").len(), 1);
        let to_p1 = events_for(&envelopes, "p1");
        assert!(matches!(
            to_p1.as_slice(),
            [
                Outgoing::Event(ServerEvent::RefreshGameList(_)),
                Outgoing::Event(ServerEvent::RefreshCurrentRoom(_))
            ]
        ));
    }

    #[test]
    fn test_errors_go_only_to_caller() {
        let mut router = router();
        router.connect("watcher", Channel::Lobby);

        let envelopes = router.handle(
            "p1",
            Channel::Lobby,
            r#"{"event":"leave-game","info":{"id":4}}"#,
        );

        assert_eq!(
            envelopes,
            vec![Envelope::new(
                "p1",
                Channel::Lobby,
                ErrorReply::new("Could not leave the game that does not exist!")
            )]
        );
    }

    #[test]
    fn test_failed_auto_start_still_broadcasts_readiness() {
        let games = SessionStore::seeded(1).with_first_id(u64::MAX);
        let mut router = SessionRouter::new(LobbyRegistry::default(), games, true);
        router.handle(
            "p1",
            Channel::Lobby,
            r#"{"event":"create-game","info":{"name":"A","playerName":"P1"}}"#,
        );
        router.handle(
            "p2",
            Channel::Lobby,
            r#"{"event":"join-game","info":{"id":0,"playerName":"P2"}}"#,
        );
        router.handle("p1", Channel::Lobby, r#"{"event":"toggle-player-readiness"}"#);

        let envelopes = router.handle(
            "p2",
            Channel::Lobby,
            r#"{"event":"toggle-player-readiness"}"#,
        );

        for who in ["p1", "p2"] {
            assert!(matches!(
                events_for(&envelopes, who).first(),
                Some(Outgoing::Event(ServerEvent::RefreshCurrentRoom(room)))
                    if room.players.iter().all(|p| p.is_ready)
            ));
        }
        assert_eq!(
            envelopes.last(),
            Some(&Envelope::new(
                "p2",
                Channel::Lobby,
                ErrorReply::new(crate::error::GENERIC_FAILURE)
            ))
        );
        assert!(router.games().is_empty());
        assert_eq!(router.lobby().room(0).and_then(|r| *r.active_game()), None);
    }

    #[test]
    fn test_toggle_without_room_is_silent() {
        let mut router = router();
        let envelopes = router.handle(
            "p1",
            Channel::Lobby,
            r#"{"event":"toggle-player-readiness"}"#,
        );
        assert!(envelopes.is_empty());
    }

    #[test]
    fn test_disconnect_leaves_room_before_game() {
        let mut router = router();
        router.connect("p1", Channel::Lobby);
        router.connect("p1", Channel::Lobby);
        router.handle(
            "p1",
            Channel::Lobby,
            r#"{"event":"create-game","info":{"name":"A","playerName":"P1"}}"#,
        );

        assert!(router.disconnect("p1", Channel::Lobby).is_empty());
        assert_eq!(router.lobby().len(), 1);

        router.disconnect("p1", Channel::Lobby);
        assert!(router.lobby().is_empty());
    }

    #[test]
    fn test_disconnect_kept_when_disabled() {
        let mut router =
            SessionRouter::new(LobbyRegistry::default(), SessionStore::seeded(1), false);
        router.connect("p1", Channel::Lobby);
        router.handle(
            "p1",
            Channel::Lobby,
            r#"{"event":"create-game","info":{"name":"A","playerName":"P1"}}"#,
        );

        router.disconnect("p1", Channel::Lobby);
        assert_eq!(router.lobby().len(), 1);
    }
}
