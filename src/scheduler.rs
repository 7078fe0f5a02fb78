//! Render Scheduler: the per-frame preview and cursor callbacks.
//!
//! Both layers are fully redrawn every frame from current state, so render
//! cadence is independent of network cadence. A frame never fails: a missing
//! surface skips drawing and a surface fault is logged, and either way the host
//! loop schedules the next frame as usual. A layer that keeps faulting warns
//! once when the fault starts and once more when it clears.

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod scheduler_test;

use crate::config::CursorStyle;
use crate::cursor::CursorTracker;
use crate::render;
use crate::store::LiveStrokeStore;
use crate::surface::{MarkerSurface, Surface, SurfaceError};

/// Result of one frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The layer was cleared and `items` segments or markers were drawn.
    Drawn { items: usize },
    /// No surface was available.
    Skipped,
    /// The surface rejected at least one draw call; everything else on the layer was still drawn.
    Faulted,
}

/// Running frame counts for one layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub drawn: u64,
    pub skipped: u64,
    pub faulted: u64,
}

impl FrameStats {
    fn record(&mut self, outcome: FrameOutcome) {
        match outcome {
            FrameOutcome::Drawn { .. } => self.drawn += 1,
            FrameOutcome::Skipped => self.skipped += 1,
            FrameOutcome::Faulted => self.faulted += 1,
        }
    }

    /// Frames attempted so far.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.drawn + self.skipped + self.faulted
    }
}

#[derive(Debug)]
pub struct RenderScheduler {
    eraser_color: String,
    cursor_style: CursorStyle,
    preview: FrameStats,
    cursors: FrameStats,
    preview_faulting: bool,
    cursors_faulting: bool,
}

impl RenderScheduler {
    #[must_use]
    pub fn new(eraser_color: impl Into<String>, cursor_style: CursorStyle) -> Self {
        Self {
            eraser_color: eraser_color.into(),
            cursor_style,
            preview: FrameStats::default(),
            cursors: FrameStats::default(),
            preview_faulting: false,
            cursors_faulting: false,
        }
    }

    /// Clear the preview layer and redraw every live stroke.
    pub fn preview_frame(&mut self, store: &LiveStrokeStore, surface: Option<&mut dyn Surface>) -> FrameOutcome {
        let outcome = match surface {
            Some(surface) => {
                let strokes = store.snapshot_for_render();
                let painted = render::paint_preview(surface, &strokes, &self.eraser_color);
                settle("preview", &mut self.preview_faulting, painted)
            }
            None => FrameOutcome::Skipped,
        };
        self.preview.record(outcome);
        outcome
    }

    /// Clear the cursor layer and redraw every remote cursor.
    pub fn cursor_frame(&mut self, cursors: &CursorTracker, surface: Option<&mut dyn MarkerSurface>) -> FrameOutcome {
        let outcome = match surface {
            Some(surface) => {
                let painted = render::paint_cursors(surface, cursors.snapshot(), &self.cursor_style);
                settle("cursor", &mut self.cursors_faulting, painted)
            }
            None => FrameOutcome::Skipped,
        };
        self.cursors.record(outcome);
        outcome
    }

    #[must_use]
    pub fn preview_stats(&self) -> FrameStats {
        self.preview
    }

    #[must_use]
    pub fn cursor_stats(&self) -> FrameStats {
        self.cursors
    }

    /// Whether the most recent preview frame faulted.
    #[must_use]
    pub fn preview_faulting(&self) -> bool {
        self.preview_faulting
    }

    /// Whether the most recent cursor frame faulted.
    #[must_use]
    pub fn cursors_faulting(&self) -> bool {
        self.cursors_faulting
    }
}

fn settle(layer: &'static str, faulting: &mut bool, result: Result<usize, SurfaceError>) -> FrameOutcome {
    match result {
        Ok(items) => {
            if std::mem::replace(faulting, false) {
                tracing::warn!(layer, "surface recovered");
            }
            FrameOutcome::Drawn { items }
        }
        Err(err) => {
            if std::mem::replace(faulting, true) {
                tracing::trace!(layer, %err, "surface still faulting");
            } else {
                tracing::warn!(layer, %err, "surface fault; later frames keep drawing what they can");
            }
            FrameOutcome::Faulted
        }
    }
}
