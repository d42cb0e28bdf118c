//! Prediction session: the client's mirror of one room's drawing state.
//!
//! The session keeps three disjoint stroke collections: the committed
//! display list, strokes remote peers are still drawing, and strokes
//! predicted locally. Local input mutates the prediction immediately and
//! produces the outbound events for the server; the relay excludes the
//! sender, so a stroke id is only ever live on one side. Points drawn
//! between flushes accumulate in an outbound buffer and leave as a single
//! batched `draw` event, modeling frame-paced sends.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::collections::HashMap;

use uuid::Uuid;

use wire::{DrawAction, DrawEvent, Point, ServerEvent, Stroke, Tool};

/// Style applied to new local strokes.
#[derive(Clone, Debug, PartialEq)]
pub struct StrokeStyle {
    pub color: String,
    pub width: f64,
    pub tool: Tool,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self { color: "#000000".into(), width: 2.0, tool: Tool::Pen }
    }
}

/// Client-side drawing session for one room.
pub struct CanvasSession {
    room: String,
    user_id: String,
    username: Option<String>,
    style: StrokeStyle,
    committed: Vec<Stroke>,
    remote_live: HashMap<String, Stroke>,
    local_live: HashMap<String, Stroke>,
    pending: Vec<Point>,
    active_stroke: Option<String>,
}

impl CanvasSession {
    /// Create a session for `room` drawing as `user_id`.
    #[must_use]
    pub fn new(room: String, user_id: String, username: Option<String>) -> Self {
        Self {
            room,
            user_id,
            username,
            style: StrokeStyle::default(),
            committed: Vec::new(),
            remote_live: HashMap::new(),
            local_live: HashMap::new(),
            pending: Vec::new(),
            active_stroke: None,
        }
    }

    /// Set the style used for stroke events from here on.
    pub fn set_style(&mut self, style: StrokeStyle) {
        self.style = style;
    }

    // -------------------------------------------------------------
    // Local input
    // -------------------------------------------------------------

    /// Start a local stroke at `point`.
    ///
    /// The predicted stroke is inserted into the display state before the
    /// event is returned, so the local echo never waits on the round trip.
    pub fn begin_stroke(&mut self, point: Point) -> DrawEvent {
        let stroke_id = Uuid::new_v4().to_string();
        let stroke = Stroke {
            id: stroke_id.clone(),
            user_id: self.user_id.clone(),
            username: self.username.clone(),
            color: Some(self.style.color.clone()),
            width: Some(self.style.width),
            tool: Some(self.style.tool),
            points: vec![point],
            committed: false,
        };
        self.local_live.insert(stroke_id.clone(), stroke);
        self.active_stroke = Some(stroke_id.clone());
        self.pending.clear();
        self.draw_event(stroke_id, DrawAction::Begin { point })
    }

    /// Append a point to the active stroke and queue it for the next flush.
    /// Without an active stroke this is a no-op.
    pub fn extend_stroke(&mut self, point: Point) {
        let Some(stroke_id) = &self.active_stroke else { return };
        if let Some(stroke) = self.local_live.get_mut(stroke_id) {
            stroke.points.push(point);
        }
        self.pending.push(point);
    }

    /// Drain the outbound buffer into one batched `draw` event. Returns
    /// `None` when nothing is buffered or no stroke is active.
    pub fn flush_points(&mut self) -> Option<DrawEvent> {
        let stroke_id = self.active_stroke.clone()?;
        if self.pending.is_empty() {
            return None;
        }
        let points = std::mem::take(&mut self.pending);
        Some(self.draw_event(stroke_id, DrawAction::Draw { point: None, points: Some(points) }))
    }

    /// Finish the active stroke and return the outbound events in send
    /// order: the flush of any buffered points, then the `end` event. The
    /// final point travels only on `end`.
    ///
    /// The predicted stroke moves into the committed list immediately; the
    /// commit is optimistic and is never rolled back.
    pub fn end_stroke(&mut self, point: Option<Point>) -> Vec<DrawEvent> {
        let mut events = Vec::new();
        if let Some(flush) = self.flush_points() {
            events.push(flush);
        }
        let Some(stroke_id) = self.active_stroke.take() else { return events };
        if let Some(mut stroke) = self.local_live.remove(&stroke_id) {
            if let Some(point) = point {
                stroke.points.push(point);
            }
            stroke.committed = true;
            self.committed.push(stroke);
        }
        events.push(self.draw_event(stroke_id, DrawAction::End { point }));
        events
    }

    fn draw_event(&self, stroke_id: String, action: DrawAction) -> DrawEvent {
        DrawEvent {
            room: self.room.clone(),
            stroke_id,
            user_id: self.user_id.clone(),
            username: self.username.clone(),
            color: Some(self.style.color.clone()),
            width: Some(self.style.width),
            tool: Some(self.style.tool),
            action,
        }
    }

    // -------------------------------------------------------------
    // Authoritative stream
    // -------------------------------------------------------------

    /// Apply one server broadcast to the display state.
    ///
    /// Relays are sender-excluded, so draw events arriving here always
    /// concern other participants and never touch the local prediction.
    pub fn apply_remote(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::InitState { strokes, .. } => {
                self.committed = strokes.clone();
                self.remote_live.clear();
            }
            ServerEvent::Draw(draw) => self.apply_remote_draw(draw),
            ServerEvent::Undo { stroke_id } => {
                if let Some(idx) = self.committed.iter().position(|s| s.id == *stroke_id) {
                    self.committed.remove(idx);
                }
            }
            ServerEvent::Redo { stroke } => self.committed.push(stroke.clone()),
            _ => {}
        }
    }

    fn apply_remote_draw(&mut self, event: &DrawEvent) {
        match &event.action {
            DrawAction::Begin { point } => {
                let stroke = Stroke {
                    id: event.stroke_id.clone(),
                    user_id: event.user_id.clone(),
                    username: event.username.clone(),
                    color: event.color.clone(),
                    width: event.width,
                    tool: event.tool,
                    points: vec![*point],
                    committed: false,
                };
                self.remote_live.insert(event.stroke_id.clone(), stroke);
            }
            DrawAction::Draw { point, points } => {
                let Some(stroke) = self.remote_live.get_mut(&event.stroke_id) else { return };
                if let Some(points) = points {
                    stroke.points.extend_from_slice(points);
                } else if let Some(point) = point {
                    stroke.points.push(*point);
                }
            }
            DrawAction::End { point } => {
                let Some(mut stroke) = self.remote_live.remove(&event.stroke_id) else { return };
                if let Some(point) = point {
                    stroke.points.push(*point);
                }
                stroke.committed = true;
                self.committed.push(stroke);
            }
        }
    }

    // -------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------

    /// Paint-ordered strokes: committed first, then live remote strokes,
    /// then the local prediction on top.
    #[must_use]
    pub fn display_list(&self) -> Vec<&Stroke> {
        let mut list: Vec<&Stroke> = self.committed.iter().collect();
        list.extend(self.remote_live.values());
        list.extend(self.local_live.values());
        list
    }

    /// Id of the stroke currently being drawn, if any.
    #[must_use]
    pub fn active_stroke(&self) -> Option<&str> {
        self.active_stroke.as_deref()
    }
}
