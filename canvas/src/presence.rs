//! Remote presence: the room roster and live peer cursors.
//!
//! Fed from the same authoritative stream as the drawing session. The
//! roster is replaced wholesale on every `users` broadcast; cursor marks
//! update incrementally and are dropped when their owner leaves.

#[cfg(test)]
#[path = "presence_test.rs"]
mod presence_test;

use std::collections::HashMap;

use wire::{CursorEvent, RosterEntry, ServerEvent};

/// A peer's last reported cursor position.
#[derive(Clone, Debug, PartialEq)]
pub struct CursorMark {
    pub x: f64,
    pub y: f64,
    pub color: Option<String>,
    pub username: Option<String>,
}

/// Sidebar state: who is in the room and where their cursors are.
#[derive(Debug, Default)]
pub struct PresenceView {
    users: Vec<RosterEntry>,
    cursors: HashMap<String, CursorMark>,
}

impl PresenceView {
    /// Create an empty view.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one server broadcast to the presence state.
    ///
    /// `user-join` is ignored: the refreshed roster always follows as its
    /// own `users` broadcast.
    pub fn apply(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::Users { users } => self.users.clone_from(users),
            ServerEvent::Cursor(cursor) => self.update_cursor(cursor),
            ServerEvent::UserLeave { user_id } => {
                self.cursors.remove(user_id);
            }
            _ => {}
        }
    }

    fn update_cursor(&mut self, event: &CursorEvent) {
        self.cursors.insert(
            event.user_id.clone(),
            CursorMark {
                x: event.x,
                y: event.y,
                color: event.color.clone(),
                username: event.username.clone(),
            },
        );
    }

    /// Current roster in server order.
    #[must_use]
    pub fn users(&self) -> &[RosterEntry] {
        &self.users
    }

    /// A peer's cursor mark, if it has reported one.
    #[must_use]
    pub fn cursor(&self, user_id: &str) -> Option<&CursorMark> {
        self.cursors.get(user_id)
    }

    /// All live cursor marks.
    pub fn cursors(&self) -> impl Iterator<Item = (&str, &CursorMark)> {
        self.cursors.iter().map(|(id, mark)| (id.as_str(), mark))
    }
}
