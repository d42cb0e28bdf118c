//! Drawing state engine — per-room stroke list and undo/redo stacks.
//!
//! DESIGN
//! ======
//! `DrawingState` is the authoritative model for one room. Methods are
//! synchronous and never block: callers hold the registry write lock for
//! the duration of a call, which serializes all mutations against a room.
//! Referential misses are benign no-ops, not errors — a draw or end
//! addressing an unknown stroke id (delivered before its begin, or after
//! the room was reset) leaves state untouched.
//!
//! Undo removes the most recently committed stroke and parks the full
//! stroke on the redo stack; redo moves it back. Any new begin invalidates
//! the redo branch. Committed strokes are immutable: stray draw and end
//! events against them change nothing.

use uuid::Uuid;
use wire::{Point, Stroke, Tool};

// =============================================================================
// TYPES
// =============================================================================

/// Style and identity attributes captured when a stroke begins.
#[derive(Clone, Debug, Default)]
pub struct StrokeAttrs {
    pub username: Option<String>,
    pub color: Option<String>,
    pub width: Option<f64>,
    pub tool: Option<Tool>,
}

/// Read-only projection of a room's drawing state for late joiners.
/// Sequences are structural copies, so callers cannot corrupt engine-owned
/// state; redo contents are summarized as a count only.
#[derive(Clone, Debug)]
pub struct StateSnapshot {
    pub strokes: Vec<Stroke>,
    pub undo_stack: Vec<String>,
    pub redo_stack_size: usize,
}

/// Authoritative stroke state for one room.
pub struct DrawingState {
    /// All strokes in insertion order; in-progress and committed interleave.
    strokes: Vec<Stroke>,
    /// Ids of committed strokes, most recent last.
    undo_stack: Vec<String>,
    /// Full strokes removed by undo, most recent last.
    redo_stack: Vec<Stroke>,
}

impl DrawingState {
    #[must_use]
    pub fn new() -> Self {
        Self { strokes: Vec::new(), undo_stack: Vec::new(), redo_stack: Vec::new() }
    }

    /// All strokes in insertion order.
    #[must_use]
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    /// True when there is nothing worth keeping: no strokes on the canvas
    /// and nothing parked for redo. Blank rooms are dropped immediately
    /// when their last participant leaves.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.strokes.is_empty() && self.redo_stack.is_empty()
    }

    // =========================================================================
    // STROKE ACTIONS
    // =========================================================================

    /// Open a new stroke at `point`. A missing `stroke_id` gets a freshly
    /// generated UUID. Clears the redo stack: a new edit invalidates any
    /// pending redo branch.
    pub fn apply_begin(
        &mut self,
        stroke_id: Option<String>,
        user_id: String,
        attrs: StrokeAttrs,
        point: Point,
    ) -> &Stroke {
        let id = stroke_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        self.redo_stack.clear();
        let idx = self.strokes.len();
        self.strokes.push(Stroke {
            id,
            user_id,
            username: attrs.username,
            color: attrs.color,
            width: attrs.width,
            tool: attrs.tool,
            points: vec![point],
            committed: false,
        });
        &self.strokes[idx]
    }

    /// Append point(s) to an in-progress stroke. A `points` batch takes
    /// precedence over a single `point` when both are supplied. Unknown
    /// stroke ids are a no-op returning `None`; committed strokes are
    /// returned unchanged without appending.
    pub fn apply_draw(
        &mut self,
        stroke_id: &str,
        point: Option<Point>,
        points: Option<&[Point]>,
    ) -> Option<&Stroke> {
        let stroke = self.strokes.iter_mut().find(|s| s.id == stroke_id)?;
        if !stroke.committed {
            if let Some(batch) = points {
                stroke.points.extend_from_slice(batch);
            } else if let Some(p) = point {
                stroke.points.push(p);
            }
        }
        Some(stroke)
    }

    /// Commit a stroke, appending the optional final point first.
    /// Idempotent: a stroke that is already committed is returned unchanged
    /// and its id is not pushed onto the undo stack again. Unknown stroke
    /// ids are a no-op returning `None`.
    pub fn apply_end(&mut self, stroke_id: &str, point: Option<Point>) -> Option<&Stroke> {
        let stroke = self.strokes.iter_mut().find(|s| s.id == stroke_id)?;
        if !stroke.committed {
            if let Some(p) = point {
                stroke.points.push(p);
            }
            stroke.committed = true;
            self.undo_stack.push(stroke.id.clone());
        }
        Some(stroke)
    }

    // =========================================================================
    // UNDO / REDO
    // =========================================================================

    /// Remove the most recently committed stroke, parking it on the redo
    /// stack, and return its id. Returns `None` on an empty undo stack. If
    /// the popped id no longer identifies a stroke, the entry is discarded
    /// (not retried against deeper entries) and `None` is returned.
    pub fn undo(&mut self) -> Option<String> {
        let last_id = self.undo_stack.pop()?;
        let idx = self.strokes.iter().position(|s| s.id == last_id)?;
        let stroke = self.strokes.remove(idx);
        self.redo_stack.push(stroke);
        Some(last_id)
    }

    /// Restore the most recently undone stroke, re-appending it to the
    /// stroke list and its id to the undo stack. Returns `None` on an
    /// empty redo stack.
    pub fn redo(&mut self) -> Option<&Stroke> {
        let stroke = self.redo_stack.pop()?;
        self.undo_stack.push(stroke.id.clone());
        self.strokes.push(stroke);
        self.strokes.last()
    }

    // =========================================================================
    // SNAPSHOT
    // =========================================================================

    /// Point-in-time copy of the room's canonical state, shaped for the
    /// `init-state` payload late joiners receive.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            strokes: self.strokes.clone(),
            undo_stack: self.undo_stack.clone(),
            redo_stack_size: self.redo_stack.len(),
        }
    }
}

impl Default for DrawingState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl DrawingState {
    /// Push a raw undo entry, bypassing commit. Lets tests exercise the
    /// defensive path where a popped id no longer matches any stroke.
    pub fn seed_undo_id(&mut self, id: &str) {
        self.undo_stack.push(id.to_owned());
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
