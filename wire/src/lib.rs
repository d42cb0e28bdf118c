//! Shared event model and JSON codec for the realtime drawing protocol.
//!
//! This crate owns the wire representation used by both `server` and
//! `canvas`. The protocol is a closed catalogue of tagged events: every
//! message carries a `type` tag (kebab-case), field names are camelCase,
//! and required fields are checked structurally at decode time, so payloads
//! are validated exactly once at the transport boundary.

use serde::{Deserialize, Serialize};

/// Error returned by the codec functions.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The text is not valid JSON or does not match any catalogue variant
    /// (unknown `type`, missing required fields, unrecognized draw action).
    #[error("invalid message: {0}")]
    Decode(#[source] serde_json::Error),
    /// An outbound event failed to serialize.
    #[error("failed to encode event: {0}")]
    Encode(#[source] serde_json::Error),
}

// =============================================================================
// DATA MODEL
// =============================================================================

/// A single sample in device-independent canvas coordinates.
/// Immutable once recorded.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Drawing tool a stroke was made with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Pen,
    Eraser,
}

/// One continuous pen/eraser gesture: an ordered point sequence plus style
/// attributes. `committed` flips to true exactly once, when the stroke is
/// finalized; after that the point sequence is immutable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<Tool>,
    pub points: Vec<Point>,
    #[serde(default)]
    pub committed: bool,
}

/// Public projection of a participant, as carried by `users` rosters.
/// Connection identifiers never appear on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

// =============================================================================
// DRAW PAYLOAD
// =============================================================================

/// A `draw` message: stroke identity and style plus the action applied to
/// it. The same shape travels inbound (client to server) and outbound
/// (relay to room peers), so the gateway re-broadcasts the validated event
/// without reshaping it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawEvent {
    pub room: String,
    pub stroke_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<Tool>,
    #[serde(flatten)]
    pub action: DrawAction,
}

/// Per-action payload of a draw message. `begin` opens a stroke at a single
/// point, `draw` extends it (a `points` batch takes precedence over a
/// single `point` when both are present), `end` commits it with an optional
/// final point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum DrawAction {
    Begin {
        point: Point,
    },
    Draw {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        point: Option<Point>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        points: Option<Vec<Point>>,
    },
    End {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        point: Option<Point>,
    },
}

// =============================================================================
// EVENT CATALOGUE
// =============================================================================

/// Events a client may send. One variant per message type; decoding is the
/// single validation point for required fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    Join {
        room: String,
        user_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
    Draw(DrawEvent),
    Cursor(CursorEvent),
    Undo {
        room: String,
    },
    Redo {
        room: String,
    },
}

impl ClientEvent {
    /// Wire-level tag of this event, as carried in the `type` field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Draw(_) => "draw",
            Self::Cursor(_) => "cursor",
            Self::Undo { .. } => "undo",
            Self::Redo { .. } => "redo",
        }
    }
}

/// A cursor position report, relayed to room peers and never stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorEvent {
    pub room: String,
    pub user_id: String,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Events the server may send. `draw` and `cursor` reuse the inbound
/// payload types: relays carry the validated event through unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    InitState {
        strokes: Vec<Stroke>,
        undo_stack: Vec<String>,
        redo_stack_size: usize,
    },
    UserJoin {
        user_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
    Users {
        users: Vec<RosterEntry>,
    },
    Draw(DrawEvent),
    Cursor(CursorEvent),
    Undo {
        stroke_id: String,
    },
    Redo {
        stroke: Stroke,
    },
    UserLeave {
        user_id: String,
    },
    Error {
        message: String,
    },
}

impl ServerEvent {
    /// Wire-level tag of this event, as carried in the `type` field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InitState { .. } => "init-state",
            Self::UserJoin { .. } => "user-join",
            Self::Users { .. } => "users",
            Self::Draw(_) => "draw",
            Self::Cursor(_) => "cursor",
            Self::Undo { .. } => "undo",
            Self::Redo { .. } => "redo",
            Self::UserLeave { .. } => "user-leave",
            Self::Error { .. } => "error",
        }
    }
}

// =============================================================================
// CODEC
// =============================================================================

/// Decode one inbound text frame into a client event.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] when the text does not decode into any
/// catalogue variant.
pub fn decode_client(text: &str) -> Result<ClientEvent, CodecError> {
    serde_json::from_str(text).map_err(CodecError::Decode)
}

/// Encode a client event as a JSON text frame.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
pub fn encode_client(event: &ClientEvent) -> Result<String, CodecError> {
    serde_json::to_string(event).map_err(CodecError::Encode)
}

/// Decode one server-sent text frame into a server event.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] when the text does not decode into any
/// catalogue variant.
pub fn decode_server(text: &str) -> Result<ServerEvent, CodecError> {
    serde_json::from_str(text).map_err(CodecError::Decode)
}

/// Encode a server event as a JSON text frame.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
pub fn encode_server(event: &ServerEvent) -> Result<String, CodecError> {
    serde_json::to_string(event).map_err(CodecError::Encode)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
