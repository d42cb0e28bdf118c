//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` reaches handlers through Axum's `State` extractor and holds
//! the live room map. Each room carries its authoritative drawing state,
//! the join-ordered participant roster, and a broadcast sender per
//! connected client. Rooms are created lazily on first reference; eviction
//! is handled by the room service (blank rooms drop on last leave) and the
//! idle reaper (TTL for rooms that still hold a drawing).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;
use wire::{RosterEntry, ServerEvent};

use crate::engine::DrawingState;

// =============================================================================
// PARTICIPANT
// =============================================================================

/// One room membership held by a live connection.
#[derive(Debug, Clone)]
pub struct Participant {
    /// Opaque per-connection handle; never exposed on the wire.
    pub connection_id: Uuid,
    pub user_id: String,
    pub username: Option<String>,
    pub color: Option<String>,
}

impl Participant {
    /// Public projection carried by `users` rosters.
    #[must_use]
    pub fn roster_entry(&self) -> RosterEntry {
        RosterEntry {
            user_id: self.user_id.clone(),
            username: self.username.clone(),
            color: self.color.clone(),
        }
    }
}

// =============================================================================
// ROOM STATE
// =============================================================================

/// Per-room live state. Kept in memory for the lifetime of the room.
pub struct RoomState {
    /// Authoritative stroke state.
    pub drawing: DrawingState,
    /// Participants in join order; the `users` broadcast preserves it.
    pub participants: Vec<Participant>,
    /// Connected clients: `connection_id` -> sender for outgoing events.
    pub clients: HashMap<Uuid, mpsc::Sender<ServerEvent>>,
    /// Set when the last participant leaves, cleared on join. The reaper
    /// evicts rooms whose mark is older than the idle TTL.
    pub idle_since: Option<Instant>,
}

impl RoomState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            drawing: DrawingState::new(),
            participants: Vec::new(),
            clients: HashMap::new(),
            idle_since: None,
        }
    }

    /// Join-order roster projection, as broadcast in `users` events.
    #[must_use]
    pub fn roster(&self) -> Vec<RosterEntry> {
        self.participants.iter().map(Participant::roster_entry).collect()
    }
}

impl Default for RoomState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Handle on the live room map, cloned into every handler. Axum needs
/// `Clone`, so the map rides behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RwLock<HashMap<String, RoomState>>>,
}

impl AppState {
    #[must_use]
    pub fn new() -> Self {
        Self { rooms: Arc::new(RwLock::new(HashMap::new())) }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
