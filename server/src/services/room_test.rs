use super::*;
use crate::state::test_helpers;
use tokio::time::{Duration, timeout};
use wire::{Point, Tool};

async fn assert_channel_has_event(rx: &mut mpsc::Receiver<ServerEvent>) -> ServerEvent {
    timeout(Duration::from_millis(200), rx.recv())
        .await
        .expect("event receive timed out")
        .expect("channel closed")
}

async fn assert_channel_empty(rx: &mut mpsc::Receiver<ServerEvent>) {
    assert!(
        timeout(Duration::from_millis(80), rx.recv()).await.is_err(),
        "expected channel to remain empty"
    );
}

fn draw_event(room: &str, stroke_id: &str, action: DrawAction) -> DrawEvent {
    DrawEvent {
        room: room.into(),
        stroke_id: stroke_id.into(),
        user_id: "u1".into(),
        username: None,
        color: Some("#112233".into()),
        width: Some(3.0),
        tool: Some(Tool::Pen),
        action,
    }
}

// =============================================================================
// MEMBERSHIP
// =============================================================================

#[tokio::test]
async fn join_room_returns_snapshot_and_join_ordered_roster() {
    let state = test_helpers::test_app_state();
    let (tx_a, _rx_a) = mpsc::channel(8);
    let (tx_b, _rx_b) = mpsc::channel(8);
    let (tx_c, _rx_c) = mpsc::channel(8);

    let (snapshot, _) = join_room(
        &state,
        "studio",
        test_helpers::dummy_participant(Uuid::new_v4(), "u1"),
        tx_a,
    )
    .await;
    assert!(snapshot.strokes.is_empty());
    assert!(snapshot.undo_stack.is_empty());
    assert_eq!(snapshot.redo_stack_size, 0);

    join_room(&state, "studio", test_helpers::dummy_participant(Uuid::new_v4(), "u2"), tx_b)
        .await;
    let (_, roster) =
        join_room(&state, "studio", test_helpers::dummy_participant(Uuid::new_v4(), "u3"), tx_c)
            .await;

    let ids: Vec<&str> = roster.iter().map(|e| e.user_id.as_str()).collect();
    assert_eq!(ids, vec!["u1", "u2", "u3"]);
}

#[tokio::test]
async fn rejoin_from_same_connection_updates_identity_in_place() {
    let state = test_helpers::test_app_state();
    let conn_a = Uuid::new_v4();
    let (tx_a, _rx_a) = mpsc::channel(8);
    let (tx_b, _rx_b) = mpsc::channel(8);
    let (tx_a2, _rx_a2) = mpsc::channel(8);

    join_room(&state, "studio", test_helpers::dummy_participant(conn_a, "u1"), tx_a).await;
    join_room(&state, "studio", test_helpers::dummy_participant(Uuid::new_v4(), "u2"), tx_b)
        .await;

    let renamed = Participant {
        connection_id: conn_a,
        user_id: "u1".into(),
        username: Some("renamed".into()),
        color: None,
    };
    let (_, roster) = join_room(&state, "studio", renamed, tx_a2).await;

    assert_eq!(roster.len(), 2);
    assert_eq!(roster[0].user_id, "u1");
    assert_eq!(roster[0].username.as_deref(), Some("renamed"));
    assert_eq!(roster[1].user_id, "u2");
}

#[tokio::test]
async fn join_clears_the_idle_mark() {
    let state = test_helpers::test_app_state();
    {
        let mut rooms = state.rooms.write().await;
        let mut room = RoomState::new();
        room.idle_since = Some(Instant::now());
        rooms.insert("studio".into(), room);
    }

    let (tx, _rx) = mpsc::channel(8);
    join_room(&state, "studio", test_helpers::dummy_participant(Uuid::new_v4(), "u1"), tx).await;

    let rooms = state.rooms.read().await;
    assert!(rooms.get("studio").expect("room should exist").idle_since.is_none());
}

#[tokio::test]
async fn leave_room_returns_participant_and_remaining_roster() {
    let state = test_helpers::test_app_state();
    let conn_a = Uuid::new_v4();
    let (tx_a, _rx_a) = mpsc::channel(8);
    let (tx_b, _rx_b) = mpsc::channel(8);

    join_room(&state, "studio", test_helpers::dummy_participant(conn_a, "u1"), tx_a).await;
    join_room(&state, "studio", test_helpers::dummy_participant(Uuid::new_v4(), "u2"), tx_b)
        .await;

    let (removed, roster) =
        leave_room(&state, "studio", conn_a).await.expect("participant should be removed");
    assert_eq!(removed.user_id, "u1");
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].user_id, "u2");
}

#[tokio::test]
async fn leave_room_evicts_blank_room_when_last_participant_leaves() {
    let state = test_helpers::test_app_state();
    let conn = Uuid::new_v4();
    let (tx, _rx) = mpsc::channel(8);

    join_room(&state, "studio", test_helpers::dummy_participant(conn, "u1"), tx).await;
    leave_room(&state, "studio", conn).await;

    assert!(!state.rooms.read().await.contains_key("studio"));
}

#[tokio::test]
async fn leave_room_marks_drawn_room_idle_instead_of_evicting() {
    let state = test_helpers::test_app_state();
    let conn = Uuid::new_v4();
    let (tx, _rx) = mpsc::channel(8);
    join_room(&state, "studio", test_helpers::dummy_participant(conn, "u1"), tx).await;

    let begin = draw_event("studio", "s1", DrawAction::Begin { point: Point { x: 1.0, y: 2.0 } });
    apply_draw(&state, "studio", &begin).await;
    apply_draw(&state, "studio", &draw_event("studio", "s1", DrawAction::End { point: None }))
        .await;

    leave_room(&state, "studio", conn).await.expect("participant should be removed");

    let rooms = state.rooms.read().await;
    let room = rooms.get("studio").expect("drawn room should be retained");
    assert!(room.participants.is_empty());
    assert!(room.idle_since.is_some());
}

#[tokio::test]
async fn leave_room_unknown_connection_returns_none() {
    let state = test_helpers::test_app_state();
    test_helpers::seed_room(&state, "studio").await;

    assert!(leave_room(&state, "studio", Uuid::new_v4()).await.is_none());
    assert!(leave_room(&state, "nowhere", Uuid::new_v4()).await.is_none());
}

#[tokio::test]
async fn list_participants_unknown_room_is_empty() {
    let state = test_helpers::test_app_state();
    assert!(list_participants(&state, "nowhere").await.is_empty());
}

// =============================================================================
// DRAWING
// =============================================================================

#[tokio::test]
async fn apply_draw_creates_the_room_on_first_reference() {
    let state = test_helpers::test_app_state();
    let begin = draw_event("studio", "s1", DrawAction::Begin { point: Point { x: 5.0, y: 6.0 } });

    apply_draw(&state, "studio", &begin).await;

    let rooms = state.rooms.read().await;
    let room = rooms.get("studio").expect("room should be created");
    assert_eq!(room.drawing.strokes().len(), 1);
    assert_eq!(room.drawing.strokes()[0].points, vec![Point { x: 5.0, y: 6.0 }]);
}

#[tokio::test]
async fn draw_actions_compose_into_undo_and_redo() {
    let state = test_helpers::test_app_state();
    apply_draw(
        &state,
        "studio",
        &draw_event("studio", "s1", DrawAction::Begin { point: Point { x: 0.0, y: 0.0 } }),
    )
    .await;
    apply_draw(
        &state,
        "studio",
        &draw_event(
            "studio",
            "s1",
            DrawAction::Draw {
                point: None,
                points: Some(vec![Point { x: 1.0, y: 1.0 }, Point { x: 2.0, y: 2.0 }]),
            },
        ),
    )
    .await;
    apply_draw(
        &state,
        "studio",
        &draw_event("studio", "s1", DrawAction::End { point: Some(Point { x: 3.0, y: 3.0 }) }),
    )
    .await;

    {
        let rooms = state.rooms.read().await;
        let stroke = &rooms.get("studio").expect("room should exist").drawing.strokes()[0];
        assert!(stroke.committed);
        assert_eq!(stroke.points.len(), 4);
    }

    assert_eq!(apply_undo(&state, "studio").await.as_deref(), Some("s1"));
    let restored = apply_redo(&state, "studio").await.expect("redo should restore the stroke");
    assert_eq!(restored.id, "s1");
    assert_eq!(restored.points.len(), 4);
}

#[tokio::test]
async fn undo_and_redo_on_an_untouched_room_return_none() {
    let state = test_helpers::test_app_state();
    assert!(apply_undo(&state, "studio").await.is_none());
    assert!(apply_redo(&state, "studio").await.is_none());
}

// =============================================================================
// BROADCAST
// =============================================================================

#[tokio::test]
async fn broadcast_sends_to_all_except_excluded_client() {
    let state = test_helpers::test_app_state();

    let client_a = Uuid::new_v4();
    let client_b = Uuid::new_v4();
    let client_c = Uuid::new_v4();
    let mut rx_a = test_helpers::attach_client(&state, "studio", client_a).await;
    let mut rx_b = test_helpers::attach_client(&state, "studio", client_b).await;
    let mut rx_c = test_helpers::attach_client(&state, "studio", client_c).await;

    let event = ServerEvent::Undo { stroke_id: "s1".into() };
    broadcast(&state, "studio", &event, Some(client_b)).await;

    assert_eq!(assert_channel_has_event(&mut rx_a).await, event);
    assert_eq!(assert_channel_has_event(&mut rx_c).await, event);
    assert_channel_empty(&mut rx_b).await;
}

#[tokio::test]
async fn broadcast_unknown_room_is_noop() {
    let state = test_helpers::test_app_state();
    broadcast(&state, "nowhere", &ServerEvent::UserLeave { user_id: "u1".into() }, None).await;
}

#[tokio::test]
async fn broadcast_skips_full_channel_without_blocking() {
    let state = test_helpers::test_app_state();
    let slow = Uuid::new_v4();
    let fast = Uuid::new_v4();

    let (slow_tx, mut slow_rx) = mpsc::channel(1);
    let mut fast_rx = test_helpers::attach_client(&state, "studio", fast).await;
    {
        let mut rooms = state.rooms.write().await;
        let room = rooms.get_mut("studio").expect("room should exist");
        room.clients.insert(slow, slow_tx.clone());
    }

    let filler = ServerEvent::UserLeave { user_id: "filler".into() };
    slow_tx.try_send(filler.clone()).expect("prefill should fit");

    let event = ServerEvent::Undo { stroke_id: "s1".into() };
    broadcast(&state, "studio", &event, None).await;

    assert_eq!(assert_channel_has_event(&mut fast_rx).await, event);
    // The slow client only ever sees its prefill; the undo was dropped.
    assert_eq!(assert_channel_has_event(&mut slow_rx).await, filler);
    assert_channel_empty(&mut slow_rx).await;
}
