//! WebSocket handler — room event routing.
//!
//! DESIGN
//! ======
//! Each connection gets a fresh id at upgrade and runs a `select!` loop
//! multiplexing two sources:
//! - Inbound text frames → decode once, dispatch by event type
//! - Peer broadcasts arriving on the connection channel → forward out
//!
//! Handlers hold the business rules only: validate the event, mutate room
//! state, describe the fan-out as an `Outcome`. Everything that actually
//! leaves the process (sender replies, peer relays, whole-room broadcasts)
//! happens in the dispatch layer.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → generate connection id, open the per-connection channel
//! 2. Client sends events → dispatch → handler returns Outcome
//! 3. Dispatch applies Outcome (reply / peer relay / room broadcast)
//! 4. Close → per joined room: remove participant, announce `user-leave`
//!    and the refreshed `users` roster

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use wire::{ClientEvent, CursorEvent, DrawEvent, ServerEvent};

use crate::services;
use crate::state::{AppState, Participant};

// =============================================================================
// OUTCOME
// =============================================================================

/// Fan-out decision produced by a handler. Handlers never send events
/// themselves; the dispatch layer reads this to decide who receives what.
enum Outcome {
    /// Reply to the joiner with `init-state`, announce `user-join` to the
    /// room peers, then broadcast the refreshed roster to the whole room.
    Welcome { room: String, reply: ServerEvent, announce: ServerEvent, roster: ServerEvent },
    /// Relay to every room client excluding the sender. Used for draw and
    /// cursor events — the sender already has its locally-predicted state.
    Peers { room: String, event: ServerEvent },
    /// Broadcast to the whole room including the sender.
    Room { room: String, event: ServerEvent },
    /// Nothing to send (roomless cursor/undo/redo, empty history stacks).
    Silent,
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();

    // Per-connection channel for receiving broadcast events from peers.
    let (client_tx, mut client_rx) = mpsc::channel::<ServerEvent>(256);

    info!(%connection_id, "ws: client connected");

    // Rooms this connection has joined, for disconnect cleanup.
    let mut joined_rooms: Vec<String> = Vec::new();

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        dispatch_event(&state, &mut socket, &mut joined_rooms, connection_id, &client_tx, &text).await;
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(event) = client_rx.recv() => {
                if send_event(&mut socket, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    // Announce the departure to every room this connection joined. The
    // sender is already removed when the broadcasts go out.
    for room in &joined_rooms {
        if let Some((participant, roster)) =
            services::room::leave_room(&state, room, connection_id).await
        {
            let leave = ServerEvent::UserLeave { user_id: participant.user_id };
            services::room::broadcast(&state, room, &leave, None).await;
            let users = ServerEvent::Users { users: roster };
            services::room::broadcast(&state, room, &users, None).await;
        }
    }
    info!(%connection_id, "ws: client disconnected");
}

// =============================================================================
// EVENT DISPATCH
// =============================================================================

/// Decode an incoming event, dispatch to its handler, apply the outcome.
async fn dispatch_event(
    state: &AppState,
    socket: &mut WebSocket,
    joined_rooms: &mut Vec<String>,
    connection_id: Uuid,
    client_tx: &mpsc::Sender<ServerEvent>,
    text: &str,
) {
    let sender_events =
        process_inbound_text(state, joined_rooms, connection_id, client_tx, text).await;
    for event in sender_events {
        let _ = send_event(socket, &event).await;
    }
}

/// Decode and process one inbound text frame and return events for the
/// sender.
///
/// This keeps the websocket transport concerns separate from event
/// handling, so tests can exercise the full dispatch path without a socket.
async fn process_inbound_text(
    state: &AppState,
    joined_rooms: &mut Vec<String>,
    connection_id: Uuid,
    client_tx: &mpsc::Sender<ServerEvent>,
    text: &str,
) -> Vec<ServerEvent> {
    let event = match wire::decode_client(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(%connection_id, error = %e, "ws: invalid inbound event");
            return vec![ServerEvent::Error { message: e.to_string() }];
        }
    };

    if !matches!(event, ClientEvent::Cursor(_)) {
        info!(%connection_id, event = event.kind(), "ws: recv event");
    }

    // Dispatch to handler — returns Outcome or an error event.
    let result = match event {
        ClientEvent::Join { room, user_id, username, color } => {
            let participant = Participant { connection_id, user_id, username, color };
            handle_join(state, joined_rooms, client_tx, room, participant).await
        }
        ClientEvent::Draw(draw) => handle_draw(state, draw).await,
        ClientEvent::Cursor(cursor) => Ok(handle_cursor(cursor)),
        ClientEvent::Undo { room } => Ok(handle_undo(state, &room).await),
        ClientEvent::Redo { room } => Ok(handle_redo(state, &room).await),
    };

    // Apply outcome — the dispatch layer owns all outbound logic.
    match result {
        Ok(Outcome::Welcome { room, reply, announce, roster }) => {
            services::room::broadcast(state, &room, &announce, Some(connection_id)).await;
            services::room::broadcast(state, &room, &roster, None).await;
            vec![reply]
        }
        Ok(Outcome::Peers { room, event }) => {
            services::room::broadcast(state, &room, &event, Some(connection_id)).await;
            vec![]
        }
        Ok(Outcome::Room { room, event }) => {
            services::room::broadcast(state, &room, &event, None).await;
            vec![]
        }
        Ok(Outcome::Silent) => vec![],
        Err(error_event) => vec![error_event],
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn handle_join(
    state: &AppState,
    joined_rooms: &mut Vec<String>,
    client_tx: &mpsc::Sender<ServerEvent>,
    room: String,
    participant: Participant,
) -> Result<Outcome, ServerEvent> {
    if room.is_empty() {
        return Err(ServerEvent::Error { message: "missing room".into() });
    }

    let announce = ServerEvent::UserJoin {
        user_id: participant.user_id.clone(),
        username: participant.username.clone(),
        color: participant.color.clone(),
    };
    let (snapshot, roster) =
        services::room::join_room(state, &room, participant, client_tx.clone()).await;

    if !joined_rooms.contains(&room) {
        joined_rooms.push(room.clone());
    }

    Ok(Outcome::Welcome {
        room,
        reply: ServerEvent::InitState {
            strokes: snapshot.strokes,
            undo_stack: snapshot.undo_stack,
            redo_stack_size: snapshot.redo_stack_size,
        },
        announce,
        roster: ServerEvent::Users { users: roster },
    })
}

async fn handle_draw(state: &AppState, event: DrawEvent) -> Result<Outcome, ServerEvent> {
    if event.room.is_empty() || event.stroke_id.is_empty() {
        return Err(ServerEvent::Error { message: "invalid draw message".into() });
    }

    services::room::apply_draw(state, &event.room, &event).await;

    // Relay the validated event as received; peers replay it against their
    // own state, and the sender already rendered it locally.
    let room = event.room.clone();
    Ok(Outcome::Peers { room, event: ServerEvent::Draw(event) })
}

fn handle_cursor(event: CursorEvent) -> Outcome {
    if event.room.is_empty() {
        // Roomless cursor moves are dropped without an error event.
        return Outcome::Silent;
    }
    let room = event.room.clone();
    Outcome::Peers { room, event: ServerEvent::Cursor(event) }
}

async fn handle_undo(state: &AppState, room: &str) -> Outcome {
    if room.is_empty() {
        return Outcome::Silent;
    }
    match services::room::apply_undo(state, room).await {
        Some(stroke_id) => {
            Outcome::Room { room: room.to_owned(), event: ServerEvent::Undo { stroke_id } }
        }
        None => Outcome::Silent,
    }
}

async fn handle_redo(state: &AppState, room: &str) -> Outcome {
    if room.is_empty() {
        return Outcome::Silent;
    }
    match services::room::apply_redo(state, room).await {
        Some(stroke) => Outcome::Room { room: room.to_owned(), event: ServerEvent::Redo { stroke } },
        None => Outcome::Silent,
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), ()> {
    let json = match wire::encode_server(event) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "ws: failed to encode event");
            return Err(());
        }
    };
    match event {
        ServerEvent::Cursor(_) => {}
        ServerEvent::Error { message } => {
            warn!(event = event.kind(), error = %message, "ws: send event");
        }
        _ => info!(event = event.kind(), "ws: send event"),
    }
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
