//! Client-side drawing state for the collaborative canvas.
//!
//! This crate is the client's half of the realtime protocol. It predicts
//! local strokes ahead of the server round trip, replays authoritative
//! broadcasts from the room, and tracks presence for the sidebar. A host
//! embeds it by feeding decoded [`wire::ServerEvent`]s in and sending the
//! returned [`wire::DrawEvent`]s out; rendering stays host-side, driven by
//! [`session::CanvasSession::display_list`].
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | Prediction session: local strokes, flush batching, replay |
//! | [`presence`] | Roster and live peer cursors |

pub mod presence;
pub mod session;
