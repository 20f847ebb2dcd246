//! Game session tests: color assignment, turn order and move rejection.

use reversi_lobby::{
    Color, GameId, LobbyRegistry, MoveError, Player, Position, SessionStore, StartError,
};

/// Builds a room with two ready players and starts its game.
fn started(seed: u64) -> (LobbyRegistry, SessionStore, GameId) {
    let mut lobby = LobbyRegistry::default();
    let mut games = SessionStore::seeded(seed);
    let room = lobby
        .create_room("A".into(), None, Player::new("p1".into(), "P1".into()))
        .expect("create");
    lobby.join_room(room, "p2", "P2".into(), None).expect("join");
    lobby.toggle_ready(room, "p1");
    lobby.toggle_ready(room, "p2");
    let game_id = lobby
        .maybe_start_game(room, &mut games)
        .map_err(|e: StartError| e.to_string())
        .expect("starts")
        .game_id;
    (lobby, games, game_id)
}

fn white_and_black(games: &SessionStore, id: GameId) -> (String, String) {
    let game = games.get(id).expect("game");
    (
        game.player(Color::White).identity().clone(),
        game.player(Color::Black).identity().clone(),
    )
}

#[test]
fn test_new_session_starts_with_white_to_move() {
    let (_, games, id) = started(5);
    let game = games.get(id).expect("game");

    assert_eq!(game.current_turn(), Color::White);
    assert_eq!(game.remaining_empty_cells(), 60);
    assert_eq!(game.winner(), None);
    assert!(game.moves().is_empty());
    assert_eq!(game.owner_room(), 0);
}

#[test]
fn test_players_get_distinct_colors() {
    let (_, games, id) = started(5);
    let (white, black) = white_and_black(&games, id);

    assert_ne!(white, black);
    let mut ids = [white, black];
    ids.sort();
    assert_eq!(ids, ["p1".to_string(), "p2".to_string()]);
}

#[test]
fn test_coin_flip_covers_both_assignments() {
    let whites: std::collections::BTreeSet<String> = (0..32)
        .map(|seed| {
            let (_, games, id) = started(seed);
            white_and_black(&games, id).0
        })
        .collect();
    assert_eq!(whites.len(), 2, "both players should get white for some seed");
}

#[test]
fn test_same_seed_same_colors() {
    let (_, a, id_a) = started(9);
    let (_, b, id_b) = started(9);
    assert_eq!(white_and_black(&a, id_a), white_and_black(&b, id_b));
}

#[test]
fn test_lookup_by_room_and_player() {
    let (_, games, id) = started(5);
    assert_eq!(games.get_by_room(0).map(|g| g.id()), Some(id));
    assert_eq!(games.get_by_player("p1").map(|g| g.id()), Some(id));
    assert_eq!(games.get_by_player("p2").map(|g| g.id()), Some(id));
    assert!(games.get_by_player("p3").is_none());
    assert!(games.get_by_room(7).is_none());
}

#[test]
fn test_out_of_turn_move_leaves_board_untouched() {
    let (_, mut games, id) = started(5);
    let (_, black) = white_and_black(&games, id);
    let before = games.get(id).expect("game").board().render();

    let game = games.get_by_player_mut(&black).expect("game");
    assert_eq!(
        game.submit_move(&black, 4, 2),
        Err(MoveError::NotYourTurn(Color::White))
    );
    assert_eq!(game.board().render(), before);
    assert!(game.moves().is_empty());
    assert_eq!(game.current_turn(), Color::White);
}

#[test]
fn test_illegal_and_out_of_bounds_moves_rejected() {
    let (_, mut games, id) = started(5);
    let (white, _) = white_and_black(&games, id);
    let game = games.get_by_player_mut(&white).expect("game");
    let before = game.board().render();

    assert_eq!(
        game.submit_move(&white, 0, 0),
        Err(MoveError::IllegalMove(Position::new(0, 0).expect("in bounds")))
    );
    assert_eq!(
        game.submit_move(&white, 3, 3),
        Err(MoveError::IllegalMove(Position::new(3, 3).expect("in bounds")))
    );
    assert_eq!(
        game.submit_move(&white, 8, 0),
        Err(MoveError::OutOfBounds { x: 8, y: 0 })
    );
    assert_eq!(game.submit_move("stranger", 4, 2), Err(MoveError::NotAPlayer));
    assert_eq!(game.board().render(), before);
}

#[test]
fn test_legal_move_updates_history_and_turn() {
    let (_, mut games, id) = started(5);
    let (white, black) = white_and_black(&games, id);
    let game = games.get_by_player_mut(&white).expect("game");

    let view = game.submit_move(&white, 4, 2).expect("legal opening move");

    assert_eq!(view.color, Color::White);
    assert_eq!(view.current_turn, Color::Black);
    assert_eq!(view.moves, vec!["4:2".to_string()]);
    assert_eq!(game.remaining_empty_cells(), 59);
    assert_eq!(game.board().count(Color::White), 4);
    assert_eq!(game.board().count(Color::Black), 1);

    let opponent = game.view_for(&black).expect("black plays here");
    assert_eq!(opponent.color, Color::Black);
    assert_eq!(opponent.moves, view.moves);
}
