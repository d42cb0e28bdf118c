//! Room registry — membership, drawing mutations, and fan-out.
//!
//! DESIGN
//! ======
//! Rooms are created lazily on first reference (a join or a stray draw)
//! and live in memory only. Every mutation runs under the registry write
//! lock and the drawing engine is synchronous, so operations on one room
//! serialize by construction.
//!
//! EVICTION
//! ========
//! When the last participant leaves a blank room, the room is dropped on
//! the spot. A room that still holds strokes is kept and marked idle so a
//! returning participant finds the drawing intact; `services::reaper`
//! evicts it after the idle TTL.

use std::time::Instant;

use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;
use wire::{DrawAction, DrawEvent, RosterEntry, ServerEvent, Stroke};

use crate::engine::{StateSnapshot, StrokeAttrs};
use crate::state::{AppState, Participant, RoomState};

// =============================================================================
// MEMBERSHIP
// =============================================================================

/// Add a participant to a room, creating the room on first join. Returns
/// the drawing snapshot for the joiner's `init-state` reply and the
/// refreshed roster, both taken under the same lock as the mutation.
pub async fn join_room(
    state: &AppState,
    room_key: &str,
    participant: Participant,
    tx: mpsc::Sender<ServerEvent>,
) -> (StateSnapshot, Vec<RosterEntry>) {
    let connection_id = participant.connection_id;
    let mut rooms = state.rooms.write().await;
    let room = rooms.entry(room_key.to_owned()).or_insert_with(RoomState::new);

    room.idle_since = None;
    room.clients.insert(connection_id, tx);

    // A re-join from the same connection updates the identity in place,
    // keeping the roster position.
    if let Some(existing) =
        room.participants.iter_mut().find(|p| p.connection_id == connection_id)
    {
        *existing = participant;
    } else {
        room.participants.push(participant);
    }

    info!(
        room = %room_key,
        %connection_id,
        participants = room.participants.len(),
        "participant joined room"
    );
    (room.drawing.snapshot(), room.roster())
}

/// Remove a participant and its sender from a room. Returns the removed
/// participant and the refreshed roster so the caller can broadcast the
/// departure. Unknown room or connection is a no-op returning `None`.
pub async fn leave_room(
    state: &AppState,
    room_key: &str,
    connection_id: Uuid,
) -> Option<(Participant, Vec<RosterEntry>)> {
    let mut rooms = state.rooms.write().await;
    let room = rooms.get_mut(room_key)?;

    room.clients.remove(&connection_id);
    let idx = room.participants.iter().position(|p| p.connection_id == connection_id)?;
    let participant = room.participants.remove(idx);
    let roster = room.roster();
    info!(
        room = %room_key,
        %connection_id,
        remaining = room.participants.len(),
        "participant left room"
    );

    if room.participants.is_empty() {
        if room.drawing.is_blank() {
            rooms.remove(room_key);
            info!(room = %room_key, "evicted blank room");
        } else {
            // Keep the drawing for returning participants until the TTL.
            room.idle_since = Some(Instant::now());
        }
    }

    Some((participant, roster))
}

/// Current roster for a room, in join order. Unknown rooms yield an empty
/// list. Connection identifiers never leave the registry.
pub async fn list_participants(state: &AppState, room_key: &str) -> Vec<RosterEntry> {
    let rooms = state.rooms.read().await;
    rooms.get(room_key).map(RoomState::roster).unwrap_or_default()
}

// =============================================================================
// DRAWING
// =============================================================================

/// Apply a validated draw action to a room's drawing state, creating the
/// room on first reference. The caller relays the event to peers whether
/// or not the engine changed anything.
pub async fn apply_draw(state: &AppState, room_key: &str, event: &DrawEvent) {
    let mut rooms = state.rooms.write().await;
    let room = rooms.entry(room_key.to_owned()).or_insert_with(RoomState::new);

    match &event.action {
        DrawAction::Begin { point } => {
            room.drawing.apply_begin(
                Some(event.stroke_id.clone()),
                event.user_id.clone(),
                StrokeAttrs {
                    username: event.username.clone(),
                    color: event.color.clone(),
                    width: event.width,
                    tool: event.tool,
                },
                *point,
            );
        }
        DrawAction::Draw { point, points } => {
            room.drawing.apply_draw(&event.stroke_id, *point, points.as_deref());
        }
        DrawAction::End { point } => {
            room.drawing.apply_end(&event.stroke_id, *point);
        }
    }
}

/// Undo the most recent committed stroke. `Some` carries the removed
/// stroke id for the whole-room broadcast.
pub async fn apply_undo(state: &AppState, room_key: &str) -> Option<String> {
    let mut rooms = state.rooms.write().await;
    let room = rooms.entry(room_key.to_owned()).or_insert_with(RoomState::new);
    room.drawing.undo()
}

/// Restore the most recently undone stroke. `Some` carries the restored
/// stroke for the whole-room broadcast.
pub async fn apply_redo(state: &AppState, room_key: &str) -> Option<Stroke> {
    let mut rooms = state.rooms.write().await;
    let room = rooms.entry(room_key.to_owned()).or_insert_with(RoomState::new);
    room.drawing.redo().cloned()
}

// =============================================================================
// BROADCAST
// =============================================================================

/// Broadcast an event to every client in a room, optionally excluding one.
pub async fn broadcast(
    state: &AppState,
    room_key: &str,
    event: &ServerEvent,
    exclude: Option<Uuid>,
) {
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(room_key) else {
        return;
    };

    for (connection_id, tx) in &room.clients {
        if exclude == Some(*connection_id) {
            continue;
        }
        // Best-effort: if a client's channel is full, skip it.
        let _ = tx.try_send(event.clone());
    }
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
