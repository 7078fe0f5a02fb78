//! Committed History Renderer: applies authoritative history to the persistent surface.
//!
//! DESIGN
//! ======
//! The server resends the whole ordered history on every change. Most updates
//! only append (someone finished a stroke), so the renderer keeps a watermark of
//! how many entries are already on the surface and paints just the tail. A
//! shorter history means undo/clear/redo happened upstream; the surface is
//! cleared and repainted from scratch.
//!
//! Length alone cannot tell an append from a same-length replacement. Under
//! [`HistoryCheck::PrefixIds`] the renderer also remembers which stroke ids it
//! painted and repaints whenever the already-painted prefix changed.
//!
//! INVARIANT
//! =========
//! `watermark <= history.len()` after every apply, and the surface shows
//! exactly `history[0..watermark)`. When no surface is available nothing is
//! painted and the watermark stays put.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use std::collections::HashSet;

use crate::config::HistoryCheck;
use crate::model::{HistoryEntry, StrokeId};
use crate::render;
use crate::store::LiveStrokeStore;
use crate::surface::Surface;

/// What one [`HistoryRenderer::apply_history`] call did to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryOutcome {
    /// Same history as already painted.
    Unchanged,
    /// Fast path: only the new tail was painted.
    Appended { painted: usize },
    /// Structural change: the surface was cleared and fully repainted.
    Repainted { painted: usize },
    /// No persistent surface yet; nothing painted.
    SurfaceMissing,
}

#[derive(Debug)]
pub struct HistoryRenderer {
    check: HistoryCheck,
    eraser_color: String,
    watermark: usize,
    /// Stroke ids of `history[0..watermark)`, `None` for malformed slots.
    painted: Vec<Option<StrokeId>>,
    /// Set when a draw call failed, so the next apply repaints everything.
    dirty: bool,
}

impl HistoryRenderer {
    #[must_use]
    pub fn new(check: HistoryCheck, eraser_color: impl Into<String>) -> Self {
        Self { check, eraser_color: eraser_color.into(), watermark: 0, painted: Vec::new(), dirty: false }
    }

    /// Count of history entries already reflected on the surface.
    #[must_use]
    pub fn watermark(&self) -> usize {
        self.watermark
    }

    /// Force the next apply to repaint from scratch, e.g. after the surface was resized.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Paint `history` onto `surface` and evict every committed stroke from `store`.
    pub fn apply_history(
        &mut self,
        history: &[HistoryEntry],
        surface: Option<&mut dyn Surface>,
        store: &mut LiveStrokeStore,
    ) -> HistoryOutcome {
        let outcome = match surface {
            Some(surface) => self.paint(history, surface),
            None => {
                tracing::debug!(len = history.len(), "history update without a committed surface");
                HistoryOutcome::SurfaceMissing
            }
        };

        let committed: HashSet<&StrokeId> = history.iter().filter_map(HistoryEntry::stroke_id).collect();
        let evicted = store.evict_committed(&committed);
        tracing::trace!(?outcome, evicted, watermark = self.watermark, "history applied");
        outcome
    }

    fn paint(&mut self, history: &[HistoryEntry], surface: &mut dyn Surface) -> HistoryOutcome {
        let new_len = history.len();
        let outcome = if self.is_append(history) {
            if new_len == self.watermark {
                return HistoryOutcome::Unchanged;
            }
            let painted = self.paint_entries(&history[self.watermark..], surface);
            HistoryOutcome::Appended { painted }
        } else {
            let (width, height) = surface.size();
            surface.clear_rect(width, height);
            self.dirty = false;
            let painted = self.paint_entries(history, surface);
            HistoryOutcome::Repainted { painted }
        };

        self.watermark = new_len;
        self.painted = history.iter().map(|e| e.stroke_id().cloned()).collect();
        outcome
    }

    fn is_append(&self, history: &[HistoryEntry]) -> bool {
        if self.dirty || history.len() < self.watermark {
            return false;
        }
        match self.check {
            HistoryCheck::Length => true,
            HistoryCheck::PrefixIds => history[..self.watermark]
                .iter()
                .zip(&self.painted)
                .all(|(entry, painted)| entry.stroke_id() == painted.as_ref()),
        }
    }

    fn paint_entries(&mut self, entries: &[HistoryEntry], surface: &mut dyn Surface) -> usize {
        let mut painted = 0;
        for stroke in entries.iter().filter_map(HistoryEntry::stroke) {
            match render::draw_committed(surface, stroke, &self.eraser_color) {
                Ok(_) => painted += 1,
                Err(err) => {
                    tracing::warn!(%err, stroke_id = %stroke.stroke_id, "failed to paint committed stroke");
                    self.dirty = true;
                }
            }
        }
        painted
    }
}
