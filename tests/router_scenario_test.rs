//! End-to-end scenarios through the session router.

use reversi_lobby::{
    Channel, ClientView, Color, Envelope, ErrorReply, GameInfo, HasReversiGame, LobbyRegistry,
    Outgoing, ServerEvent, SessionRouter, SessionStore,
};

const CREATE_A: &str = r#"{"event":"create-game","info":{"name":"A","playerName":"P1"}}"#;
const JOIN_0: &str = r#"{"event":"join-game","info":{"id":0,"playerName":"P2"}}"#;
const TOGGLE: &str = r#"{"event":"toggle-player-readiness"}"#;
const REFRESH_GAME: &str = r#"{"event":"refresh-reversi-game"}"#;

fn router() -> SessionRouter {
    SessionRouter::new(LobbyRegistry::default(), SessionStore::seeded(42), true)
}

fn events_to<'a>(envelopes: &'a [Envelope], to: &str) -> Vec<&'a ServerEvent> {
    envelopes
        .iter()
        .filter(|e| e.to == to)
        .filter_map(|e| match &e.message {
            Outgoing::Event(event) => Some(event),
            _ => None,
        })
        .collect()
}

fn errors_to<'a>(envelopes: &'a [Envelope], to: &str) -> Vec<&'a ErrorReply> {
    envelopes
        .iter()
        .filter(|e| e.to == to)
        .filter_map(|e| match &e.message {
            Outgoing::Error(reply) => Some(reply),
            _ => None,
        })
        .collect()
}

fn game_view(envelopes: &[Envelope], to: &str) -> ClientView {
    match events_to(envelopes, to).as_slice() {
        [ServerEvent::RefreshReversiGame(view)] => view.clone(),
        other => panic!("expected one refresh-reversi-game for {to}, got {other:?}"),
    }
}

/// Two players in room 0, both ready, game started.
fn started_game(router: &mut SessionRouter) {
    router.handle("p1", Channel::Lobby, CREATE_A);
    router.handle("p2", Channel::Lobby, JOIN_0);
    router.handle("p1", Channel::Lobby, TOGGLE);
    router.handle("p2", Channel::Lobby, TOGGLE);
}

#[test]
fn test_full_lobby_to_game_flow() {
    let mut router = router();
    router.connect("p1", Channel::Lobby);
    router.connect("p2", Channel::Lobby);

    let created = router.handle("p1", Channel::Lobby, CREATE_A);
    let expected_list = ServerEvent::RefreshGameList(vec![GameInfo {
        id: 0,
        name: "A".into(),
        player_count: 1,
        has_password: false,
    }]);
    assert_eq!(events_to(&created, "p2"), vec![&expected_list]);
    assert_eq!(events_to(&created, "p1")[0], &expected_list);

    let joined = router.handle("p2", Channel::Lobby, JOIN_0);
    for who in ["p1", "p2"] {
        assert!(matches!(
            events_to(&joined, who)[0],
            ServerEvent::RefreshCurrentRoom(room) if room.players.len() == 2
        ));
    }

    let first_toggle = router.handle("p1", Channel::Lobby, TOGGLE);
    assert!(
        !events_to(&first_toggle, "p2")
            .iter()
            .any(|e| matches!(e, ServerEvent::HasReversiGame(_)))
    );

    let second_toggle = router.handle("p2", Channel::Lobby, TOGGLE);
    let announced = ServerEvent::HasReversiGame(HasReversiGame { id: 0 });
    assert!(events_to(&second_toggle, "p1").contains(&&announced));
    assert!(events_to(&second_toggle, "p2").contains(&&announced));

    let p1_view = game_view(&router.handle("p1", Channel::Game, REFRESH_GAME), "p1");
    let p2_view = game_view(&router.handle("p2", Channel::Game, REFRESH_GAME), "p2");
    assert_eq!(p1_view.id, p2_view.id);
    assert_eq!(p1_view.lobby_game, 0);
    assert_eq!(p1_view.color, p2_view.color.opponent());
    assert_eq!(p1_view.current_turn, Color::White);
    assert_eq!(p2_view.current_turn, Color::White);
    assert!(p1_view.moves.is_empty());
    assert_eq!(p1_view.winner, None);
}

#[test]
fn test_room_list_hides_started_games() {
    let mut router = router();
    started_game(&mut router);

    let listed = router.handle("p3", Channel::Lobby, r#"{"event":"get-game-list"}"#);
    assert_eq!(
        events_to(&listed, "p3"),
        vec![&ServerEvent::RefreshGameList(Vec::new())]
    );
}

#[test]
fn test_first_load_restores_room_and_game() {
    let mut router = router();
    started_game(&mut router);

    let loaded = router.handle("p1", Channel::Lobby, r#"{"event":"first-load-lobby"}"#);
    let events = events_to(&loaded, "p1");
    assert!(matches!(
        events.as_slice(),
        [
            ServerEvent::HasReversiGame(HasReversiGame { id: 0 }),
            ServerEvent::RefreshCurrentRoom(_),
            ServerEvent::RefreshGameList(_)
        ]
    ));
}

#[test]
fn test_move_broadcast_keeps_each_players_color() {
    let mut router = router();
    started_game(&mut router);
    let p1 = game_view(&router.handle("p1", Channel::Game, REFRESH_GAME), "p1");
    let (white, black) = if p1.color == Color::White {
        ("p1", "p2")
    } else {
        ("p2", "p1")
    };

    let moved = router.handle(
        white,
        Channel::Game,
        r#"{"event":"try-making-move","info":{"x":4,"y":2}}"#,
    );

    let mover = game_view(&moved, white);
    let other = game_view(&moved, black);
    assert_eq!(mover.color, Color::White);
    assert_eq!(other.color, Color::Black);
    assert_eq!(mover.current_turn, Color::Black);
    assert_eq!(other.current_turn, Color::Black);
    assert_eq!(mover.moves, vec!["4:2".to_string()]);
    assert_eq!(other.moves, mover.moves);
    assert!(moved.iter().all(|e| e.channel == Channel::Game));
}

#[test]
fn test_rejected_move_only_answers_caller() {
    let mut router = router();
    started_game(&mut router);
    let p1 = game_view(&router.handle("p1", Channel::Game, REFRESH_GAME), "p1");
    let black = if p1.color == Color::Black { "p1" } else { "p2" };

    let rejected = router.handle(
        black,
        Channel::Game,
        r#"{"event":"try-making-move","info":{"x":3,"y":2}}"#,
    );

    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].to, black);
    assert_eq!(errors_to(&rejected, black).len(), 1);

    let after = game_view(&router.handle(black, Channel::Game, REFRESH_GAME), black);
    assert!(after.moves.is_empty());
    assert_eq!(after.current_turn, Color::White);
}

#[test]
fn test_third_join_rejected() {
    let mut router = router();
    router.handle("p1", Channel::Lobby, CREATE_A);
    router.handle("p2", Channel::Lobby, JOIN_0);

    let rejected = router.handle(
        "p3",
        Channel::Lobby,
        r#"{"event":"join-game","info":{"id":0,"playerName":"P3"}}"#,
    );

    assert_eq!(
        rejected,
        vec![Envelope::new(
            "p3",
            Channel::Lobby,
            ErrorReply::new("Game room is full!")
        )]
    );
    assert_eq!(router.lobby().room(0).expect("room").members().len(), 2);
}

#[test]
fn test_wrong_password_sends_incorrect_password() {
    let mut router = router();
    router.connect("watcher", Channel::Lobby);
    router.handle(
        "p1",
        Channel::Lobby,
        r#"{"event":"create-game","info":{"name":"A","playerName":"P1","password":"pw"}}"#,
    );

    let rejected = router.handle(
        "p2",
        Channel::Lobby,
        r#"{"event":"join-game","info":{"id":0,"playerName":"P2","password":"nope"}}"#,
    );

    assert_eq!(
        rejected,
        vec![Envelope::new(
            "p2",
            Channel::Lobby,
            ServerEvent::IncorrectPassword
        )]
    );
    assert_eq!(router.lobby().room(0).expect("room").members().len(), 1);
}

#[test]
fn test_malformed_payloads_change_nothing() {
    let mut router = router();

    let bad_create = router.handle(
        "p1",
        Channel::Lobby,
        r#"{"event":"create-game","info":{"name":5,"playerName":"P1"}}"#,
    );
    assert_eq!(
        errors_to(&bad_create, "p1"),
        vec![&ErrorReply::new("Could not create a game: invalid data provided!")]
    );
    assert!(router.lobby().is_empty());

    let garbage = router.handle("p1", Channel::Lobby, "{not json");
    assert_eq!(errors_to(&garbage, "p1").len(), 1);

    let bad_move = router.handle(
        "p1",
        Channel::Game,
        r#"{"event":"try-making-move","info":{"x":1}}"#,
    );
    assert_eq!(
        errors_to(&bad_move, "p1"),
        vec![&ErrorReply::new("Invalid info was provided for making a move!")]
    );
}

#[test]
fn test_game_channel_without_game() {
    let mut router = router();
    let reply = router.handle("p1", Channel::Game, REFRESH_GAME);
    assert_eq!(events_to(&reply, "p1"), vec![&ServerEvent::NoReversiGame]);

    let reply = router.handle(
        "p1",
        Channel::Game,
        r#"{"event":"try-making-move","info":{"x":4,"y":2}}"#,
    );
    assert_eq!(
        errors_to(&reply, "p1"),
        vec![&ErrorReply::new(
            "Trying to make a move in the game, that does not exist"
        )]
    );
}

#[test]
fn test_leave_notifies_remaining_member() {
    let mut router = router();
    router.handle("p1", Channel::Lobby, CREATE_A);
    router.handle("p2", Channel::Lobby, JOIN_0);

    let left = router.handle("p2", Channel::Lobby, r#"{"event":"leave-game","info":{"id":0}}"#);

    for who in ["p1", "p2"] {
        assert!(matches!(
            events_to(&left, who)[0],
            ServerEvent::PlayerLeftTheGame(room) if room.players.len() == 1
        ));
    }
}

#[test]
fn test_disconnect_during_game_keeps_room() {
    let mut router = router();
    router.connect("p1", Channel::Lobby);
    started_game(&mut router);

    router.disconnect("p1", Channel::Lobby);

    assert!(router.lobby().room(0).is_some());
    assert!(router.games().get_by_player("p1").is_some());
}
