//! Pen input model: tool settings, the gesture state machine and coordinate mapping.
//!
//! A gesture runs pen-down → pen-move* → pen-up. While it runs, [`PenState`]
//! carries the stroke id, the next `seq` to assign and the path that will be
//! submitted for commit on release. [`crate::engine::EngineCore`] drives the
//! transitions and performs the side effects (store mutation, emission).

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::model::{Point, StrokeId, Tool};

/// The participant's drawing controls.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSettings {
    color: String,
    brush_size: f64,
    eraser: bool,
}

impl ToolSettings {
    #[must_use]
    pub fn new(color: impl Into<String>, brush_size: f64) -> Self {
        Self { color: color.into(), brush_size, eraser: false }
    }

    /// Pick a brush color. Picking a color always leaves eraser mode.
    pub fn set_color(&mut self, color: impl Into<String>) {
        self.color = color.into();
        self.eraser = false;
    }

    /// Change the stroke width. Non-positive or non-finite sizes are ignored.
    pub fn set_brush_size(&mut self, size: f64) {
        if !size.is_finite() || size <= 0.0 {
            tracing::debug!(size, "ignoring invalid brush size");
            return;
        }
        self.brush_size = size;
    }

    /// Flip eraser mode, returning the new state.
    pub fn toggle_eraser(&mut self) -> bool {
        self.eraser = !self.eraser;
        self.eraser
    }

    #[must_use]
    pub fn color(&self) -> &str {
        &self.color
    }

    #[must_use]
    pub fn brush_size(&self) -> f64 {
        self.brush_size
    }

    #[must_use]
    pub fn eraser(&self) -> bool {
        self.eraser
    }

    #[must_use]
    pub fn tool(&self) -> Tool {
        if self.eraser { Tool::Eraser } else { Tool::Brush }
    }
}

/// The local gesture in progress, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PenState {
    #[default]
    Idle,
    Drawing {
        stroke_id: StrokeId,
        /// `seq` the next point will carry.
        next_seq: u64,
        /// Every position seen so far, submitted with `strokeComplete`.
        path: Vec<Point>,
    },
}

/// What a released gesture leaves behind.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedStroke {
    pub stroke_id: StrokeId,
    /// `seq` reserved for the final `draw` update.
    pub final_seq: u64,
    pub path: Vec<Point>,
}

impl FinishedStroke {
    /// Where the pen was lifted. The origin if the path is somehow empty.
    #[must_use]
    pub fn last_position(&self) -> Point {
        self.path.last().copied().unwrap_or(Point::new(0.0, 0.0))
    }

    /// Whether the stroke has a segment worth committing.
    #[must_use]
    pub fn is_committable(&self) -> bool {
        self.path.len() > 1
    }
}

impl PenState {
    #[must_use]
    pub fn is_drawing(&self) -> bool {
        matches!(self, Self::Drawing { .. })
    }

    #[must_use]
    pub fn stroke_id(&self) -> Option<&StrokeId> {
        match self {
            Self::Drawing { stroke_id, .. } => Some(stroke_id),
            Self::Idle => None,
        }
    }

    /// Start a gesture at `origin`. The origin takes `seq` 0.
    pub fn begin(&mut self, stroke_id: StrokeId, origin: Point) {
        *self = Self::Drawing { stroke_id, next_seq: 1, path: vec![origin] };
    }

    /// Extend the gesture, returning the stroke id and the `seq` assigned to `pos`.
    pub fn advance(&mut self, pos: Point) -> Option<(StrokeId, u64)> {
        let Self::Drawing { stroke_id, next_seq, path } = self else {
            return None;
        };
        let seq = *next_seq;
        *next_seq += 1;
        path.push(pos);
        Some((stroke_id.clone(), seq))
    }

    /// End the gesture and return to idle.
    pub fn finish(&mut self) -> Option<FinishedStroke> {
        match std::mem::take(self) {
            Self::Drawing { stroke_id, next_seq, path } => Some(FinishedStroke { stroke_id, final_seq: next_seq, path }),
            Self::Idle => None,
        }
    }
}

/// Bounding box of the drawing element in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClientRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Map a pointer position in client coordinates into surface pixels.
///
/// The element may be displayed at a different size than its backing store,
/// so each axis is scaled by `surface / rect`. A degenerate rect maps 1:1.
#[must_use]
pub fn map_client_point(client: Point, rect: ClientRect, surface_size: (f64, f64)) -> Point {
    let scale = |surface: f64, css: f64| if css > 0.0 && css.is_finite() { surface / css } else { 1.0 };
    Point::new(
        (client.x - rect.left) * scale(surface_size.0, rect.width),
        (client.y - rect.top) * scale(surface_size.1, rect.height),
    )
}
