//! Drag-to-pan state machine for the interactive grid.
//!
//! `Idle → Dragging → Idle`. Pointer moves are coalesced: only the latest
//! position survives until the next animation frame applies it.

use crate::store::{CellStore, Offset};

/// An in-flight drag on one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    /// Store key of the cell being dragged.
    pub key: String,
    /// Pointer position at `pointer_down`, in screen pixels.
    pub anchor: (f64, f64),
    /// Cell offset at `pointer_down`.
    pub start_offset: Offset,
    /// On-screen cell size, used to convert pixels to percent of travel.
    pub cell_size: (f64, f64),
}

impl DragSession {
    /// Offset for a pointer at `(x, y)`, before clamping.
    ///
    /// Background-position percentages run opposite to the pointer: dragging
    /// right reveals more of the image's left side.
    fn offset_at(&self, x: f64, y: f64) -> (f64, f64) {
        let (width, height) = self.cell_size;
        let dx = if width > 0.0 { (x - self.anchor.0) * 100.0 / width } else { 0.0 };
        let dy = if height > 0.0 { (y - self.anchor.1) * 100.0 / height } else { 0.0 };
        (self.start_offset.x - dx, self.start_offset.y - dy)
    }
}

/// Where the drag state machine currently is.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    #[default]
    /// No pointer is held on a cell.
    Idle,
    /// A pointer is held on a cell.
    Dragging(DragSession),
}

/// Drives drag-to-pan for one grid, one pointer at a time.
#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
    pending: Option<(f64, f64)>,
}

impl DragController {
    /// An idle controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> &DragState {
        &self.state
    }

    /// Whether a drag is in progress.
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// Start dragging `key`. Ignored (returns `false`) when the cell has no
    /// image or a drag is already running.
    pub fn pointer_down(
        &mut self,
        store: &CellStore,
        key: &str,
        x: f64,
        y: f64,
        cell_width: f64,
        cell_height: f64,
    ) -> bool {
        if self.is_dragging() {
            return false;
        }
        let Some(start_offset) = store.offset(key) else {
            return false;
        };
        self.state = DragState::Dragging(DragSession {
            key: key.to_string(),
            anchor: (x, y),
            start_offset,
            cell_size: (cell_width, cell_height),
        });
        self.pending = None;
        true
    }

    /// Record a pointer position. Returns `true` when the caller should
    /// schedule a frame, i.e. no update was pending yet.
    pub fn pointer_move(&mut self, x: f64, y: f64) -> bool {
        if !self.is_dragging() {
            return false;
        }
        self.pending.replace((x, y)).is_none()
    }

    /// Apply the pending pointer position, if any, to the store.
    pub fn flush_frame(&mut self, store: &mut CellStore) -> Option<Offset> {
        let DragState::Dragging(session) = &self.state else {
            self.pending = None;
            return None;
        };
        let (x, y) = self.pending.take()?;
        let (ox, oy) = session.offset_at(x, y);
        if store.set_offset(&session.key, ox, oy) {
            store.offset(&session.key)
        } else {
            None
        }
    }

    /// Finish the drag, applying any last pending move.
    pub fn pointer_up(&mut self, store: &mut CellStore) -> Option<Offset> {
        let applied = self.flush_frame(store);
        self.state = DragState::Idle;
        applied
    }

    /// Abandon the drag and restore the offset it started from.
    pub fn cancel(&mut self, store: &mut CellStore) {
        if let DragState::Dragging(session) = std::mem::take(&mut self.state) {
            store.set_offset(&session.key, session.start_offset.x, session.start_offset.y);
        }
        self.pending = None;
    }
}
