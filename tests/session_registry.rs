use chessroom::application::{SessionError, SessionRegistry};
use chessroom::domain::board::Board;
use chessroom::domain::game::{SessionStatus, SnapshotReceiver};
use chessroom::domain::models::{Color, Move, PlayerToken, Position, SessionId};
use chessroom::domain::snapshot::{PieceView, Snapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::timeout;

struct Client {
    token: PlayerToken,
    rx: SnapshotReceiver,
}

fn start_registry() -> Arc<SessionRegistry> {
    let (registry, consumer) = SessionRegistry::new();
    tokio::spawn(consumer.run());
    registry
}

fn connect(registry: &SessionRegistry) -> Client {
    let (tx, rx) = mpsc::unbounded_channel();
    let token = PlayerToken::generate();
    registry.connect(token.clone(), tx);
    Client { token, rx }
}

async fn next_frame(client: &mut Client) -> Snapshot {
    timeout(Duration::from_secs(2), client.rx.recv())
        .await
        .expect("frame arrives in time")
        .expect("channel still open")
}

fn assert_quiet(client: &mut Client) {
    assert!(matches!(client.rx.try_recv(), Err(TryRecvError::Empty)));
}

fn assert_closed(client: &mut Client) {
    loop {
        match client.rx.try_recv() {
            Ok(_) => continue,
            Err(err) => {
                assert_eq!(err, TryRecvError::Disconnected);
                return;
            }
        }
    }
}

fn mv(client: &Client, from: (i32, i32), to: (i32, i32)) -> Move {
    Move {
        mover: client.token.clone(),
        from: Position::new(from.0, from.1),
        to: Position::new(to.0, to.1),
    }
}

/// A hosts as white, B joins; both initial frames are consumed.
async fn seated_pair(registry: &SessionRegistry) -> (SessionId, Client, Client) {
    let mut a = connect(registry);
    let mut b = connect(registry);
    let id = registry.create_session(&a.token, Color::White).unwrap();
    next_frame(&mut a).await;
    registry.join_session(&b.token, &id).unwrap();
    next_frame(&mut a).await;
    next_frame(&mut b).await;
    (id, a, b)
}

fn board_of(registry: &SessionRegistry, id: &SessionId) -> Board {
    registry
        .with_session(id, |session| session.board().clone())
        .expect("session is registered")
}

#[tokio::test]
async fn test_create_and_join_assign_colors_and_turn() {
    let registry = start_registry();
    let mut a = connect(&registry);
    let mut b = connect(&registry);

    let id = registry.create_session(&a.token, Color::White).unwrap();
    let first = next_frame(&mut a).await;
    assert_eq!(first.game_id, id.to_string());
    assert!(first.is_white && first.is_turn && !first.is_game_started);

    registry.join_session(&b.token, &id).unwrap();
    let a_frame = next_frame(&mut a).await;
    let b_frame = next_frame(&mut b).await;

    assert!(a_frame.is_game_started && a_frame.is_white && a_frame.is_turn);
    assert!(b_frame.is_game_started && !b_frame.is_white && !b_frame.is_turn);
    assert_eq!(b_frame.game_id, id.to_string());
    assert_eq!(registry.session_of(&a.token), Some(id.clone()));
    assert_eq!(registry.session_of(&b.token), Some(id.clone()));
    assert_eq!(registry.lobby_count(), 0);
    assert_eq!(
        registry.with_session(&id, |s| s.status()),
        Some(SessionStatus::InProgress)
    );
}

#[tokio::test]
async fn test_join_unknown_session_is_reported_to_requester_only() {
    let registry = start_registry();
    let mut a = connect(&registry);
    let mut b = connect(&registry);
    registry.create_session(&a.token, Color::White).unwrap();
    next_frame(&mut a).await;

    let missing = SessionId::from("no-such-session");
    let err = registry.join_session(&b.token, &missing).unwrap_err();
    assert_eq!(err, SessionError::SessionNotFound(missing));

    registry.notify(&b.token, &err.to_string());
    let notice = next_frame(&mut b).await;
    assert_eq!(notice.msg, "session not found");
    assert_eq!(notice.game_id, "");
    assert!(notice.board.is_empty());
    assert_quiet(&mut a);

    // Still in the lobby, free to try again.
    assert_eq!(registry.lobby_count(), 1);
    assert_eq!(registry.session_of(&b.token), None);
}

#[tokio::test]
async fn test_third_player_cannot_join() {
    let registry = start_registry();
    let (id, mut a, mut b) = seated_pair(&registry).await;
    let c = connect(&registry);

    let err = registry.join_session(&c.token, &id).unwrap_err();

    assert_eq!(err, SessionError::SessionFull(id.clone()));
    assert_eq!(registry.with_session(&id, |s| s.player_count()), Some(2));
    assert_eq!(registry.session_of(&c.token), None);
    assert_quiet(&mut a);
    assert_quiet(&mut b);
}

#[tokio::test]
async fn test_seated_player_cannot_start_another_session() {
    let registry = start_registry();
    let (id, mut a, _b) = seated_pair(&registry).await;

    let err = registry.create_session(&a.token, Color::White).unwrap_err();
    assert_eq!(err, SessionError::AlreadyInSession);

    registry.notify(&a.token, &err.to_string());
    let frame = next_frame(&mut a).await;
    assert_eq!(frame.msg, "already in a session");
    assert_eq!(frame.game_id, id.to_string());
    assert_eq!(registry.session_count(), 1);
}

#[tokio::test]
async fn test_opening_move_scenario() {
    let registry = start_registry();
    let (id, mut a, mut b) = seated_pair(&registry).await;

    // B tries to move before white has moved.
    registry.submit_move(mv(&b, (6, 1), (5, 1)));
    let rejected = next_frame(&mut b).await;
    assert_eq!(rejected.msg, "not your turn");
    assert!(!rejected.is_turn);
    assert_quiet(&mut a);
    assert_eq!(board_of(&registry, &id), Board::new());

    registry.submit_move(mv(&a, (6, 0), (4, 0)));
    let a_frame = next_frame(&mut a).await;
    let b_frame = next_frame(&mut b).await;

    assert_eq!(a_frame.msg, "");
    assert_eq!(b_frame.msg, "");
    assert!(!a_frame.is_turn);
    assert!(b_frame.is_turn);
    assert_eq!(b_frame.piece_at(6, 0), Some(&PieceView::Empty {}));
    assert_eq!(
        b_frame.piece_at(4, 0),
        Some(&PieceView::Occupied {
            is_white: true,
            name: "pawn".to_string()
        })
    );

    // A cannot move twice in a row.
    let board = board_of(&registry, &id);
    registry.submit_move(mv(&a, (6, 1), (4, 1)));
    assert_eq!(next_frame(&mut a).await.msg, "not your turn");
    assert_quiet(&mut b);
    assert_eq!(board_of(&registry, &id), board);
}

#[tokio::test]
async fn test_move_from_empty_square_is_invalid() {
    let registry = start_registry();
    let (id, mut a, mut b) = seated_pair(&registry).await;

    registry.submit_move(mv(&a, (3, 3), (3, 4)));
    let frame = next_frame(&mut a).await;

    assert_eq!(frame.msg, "invalid move");
    assert!(frame.is_turn);
    assert_quiet(&mut b);
    assert_eq!(board_of(&registry, &id), Board::new());
}

#[tokio::test]
async fn test_move_off_the_board_is_invalid() {
    let registry = start_registry();
    let (id, mut a, mut b) = seated_pair(&registry).await;

    registry.submit_move(mv(&a, (6, 0), (8, 0)));
    assert_eq!(next_frame(&mut a).await.msg, "invalid move");
    registry.submit_move(mv(&a, (6, 0), (5, -1)));
    assert_eq!(next_frame(&mut a).await.msg, "invalid move");

    assert_quiet(&mut b);
    assert_eq!(board_of(&registry, &id), Board::new());
}

#[tokio::test]
async fn test_moves_are_applied_in_submission_order() {
    let registry = start_registry();
    let (_id, mut a, mut b) = seated_pair(&registry).await;

    registry.submit_move(mv(&a, (6, 4), (4, 4)));
    registry.submit_move(mv(&b, (1, 4), (3, 4)));
    registry.submit_move(mv(&a, (7, 6), (5, 5)));

    let after_first = next_frame(&mut a).await;
    let after_second = next_frame(&mut a).await;
    let after_third = next_frame(&mut a).await;
    assert!(!after_first.is_turn);
    assert!(after_second.is_turn);
    assert!(!after_third.is_turn);
    assert!(after_third.msg.is_empty());
    assert_eq!(
        after_third.piece_at(5, 5),
        Some(&PieceView::Occupied {
            is_white: true,
            name: "knight".to_string()
        })
    );

    for _ in 0..3 {
        assert_eq!(next_frame(&mut b).await.msg, "");
    }
}

#[tokio::test]
async fn test_disconnect_closes_session_for_both_players() {
    let registry = start_registry();
    let (id, mut a, mut b) = seated_pair(&registry).await;

    registry.disconnect(&b.token);

    assert_closed(&mut a);
    assert_closed(&mut b);
    assert_eq!(registry.session_count(), 0);
    assert_eq!(registry.session_of(&a.token), None);
    assert_eq!(registry.session_of(&b.token), None);
    assert!(registry.with_session(&id, |_| ()).is_none());

    // Second call for either side is a no-op.
    registry.disconnect(&a.token);
    registry.disconnect(&b.token);
    assert_eq!(registry.session_count(), 0);
}

#[tokio::test]
async fn test_disconnect_from_lobby_closes_channel() {
    let registry = start_registry();
    let mut a = connect(&registry);

    registry.disconnect(&a.token);

    assert_closed(&mut a);
    assert_eq!(registry.lobby_count(), 0);
}

#[tokio::test]
async fn test_moves_from_departed_players_are_dropped() {
    let registry = start_registry();
    let (_id, a, _b) = seated_pair(&registry).await;
    let (_other, mut c, _d) = seated_pair(&registry).await;
    let stale = mv(&a, (6, 0), (4, 0));

    registry.disconnect(&a.token);
    registry.submit_move(stale);
    registry.submit_move(mv(&c, (6, 0), (4, 0)));

    // The queue is ordered, so the stale move has been consumed by now.
    let frame = next_frame(&mut c).await;
    assert_eq!(frame.msg, "");
    assert_eq!(registry.session_count(), 1);
}

#[tokio::test]
async fn test_shutdown_closes_everything() {
    let registry = start_registry();
    let (_id, mut a, mut b) = seated_pair(&registry).await;
    let mut lobby = connect(&registry);

    registry.shutdown();

    assert_closed(&mut a);
    assert_closed(&mut b);
    assert_closed(&mut lobby);
    assert_eq!(registry.session_count(), 0);
    assert_eq!(registry.lobby_count(), 0);
}
