//! Drawing-surface contract and an in-memory recorder.
//!
//! The engine needs very little from its rendering backend: stroke one line
//! segment and clear the whole surface. The cursor layer additionally fills a
//! disc and a text label. Anything that can do that (a browser canvas, a GPU
//! layer, a test recorder) can host the engine.

#[cfg(test)]
#[path = "surface_test.rs"]
mod surface_test;

use crate::model::Point;

/// Error reported by a drawing backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    #[error("drawing backend failed: {0}")]
    Backend(String),
}

/// Primitives every render layer requires.
pub trait Surface {
    /// Width and height of the drawable area, in surface pixels.
    fn size(&self) -> (f64, f64);

    /// Stroke a round-capped line segment.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError`] if the backend rejects the draw call.
    fn stroke_segment(&mut self, from: Point, to: Point, color: &str, width: f64) -> Result<(), SurfaceError>;

    /// Clear the rectangle `(0, 0, width, height)`.
    fn clear_rect(&mut self, width: f64, height: f64);
}

/// Extra primitives used by the cursor layer.
pub trait MarkerSurface: Surface {
    /// Fill a disc centered on `center`.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError`] if the backend rejects the draw call.
    fn fill_disc(&mut self, center: Point, radius: f64, color: &str, alpha: f64) -> Result<(), SurfaceError>;

    /// Fill a single line of text with its baseline origin at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError`] if the backend rejects the draw call.
    fn fill_label(&mut self, text: &str, at: Point, color: &str, font: &str) -> Result<(), SurfaceError>;
}

/// A draw call captured by [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Segment { from: Point, to: Point, color: String, width: f64 },
    Clear { width: f64, height: f64 },
    Disc { center: Point, radius: f64, color: String, alpha: f64 },
    Label { text: String, at: Point, color: String, font: String },
}

/// Surface that records every call instead of producing pixels.
///
/// Used by the replay binary and by tests to compare what two code paths drew.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    width: f64,
    height: f64,
    ops: Vec<DrawOp>,
    fail_draws: bool,
    fail_color: Option<String>,
}

impl RecordingSurface {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height, ops: Vec::new(), fail_draws: false, fail_color: None }
    }

    /// Make every subsequent draw call fail, to exercise fault handling.
    pub fn fail_draws(&mut self, fail: bool) {
        self.fail_draws = fail;
    }

    /// Make only draw calls in `color` fail. `None` lifts the restriction.
    pub fn fail_color(&mut self, color: Option<&str>) {
        self.fail_color = color.map(str::to_owned);
    }

    /// Every recorded call, oldest first.
    #[must_use]
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Calls made since the most recent clear, i.e. what is currently visible.
    #[must_use]
    pub fn visible(&self) -> &[DrawOp] {
        let start = self
            .ops
            .iter()
            .rposition(|op| matches!(op, DrawOp::Clear { .. }))
            .map_or(0, |i| i + 1);
        &self.ops[start..]
    }

    /// Visible line segments as `(from, to, color, width)`.
    #[must_use]
    pub fn visible_segments(&self) -> Vec<(Point, Point, &str, f64)> {
        self.visible()
            .iter()
            .filter_map(|op| match op {
                DrawOp::Segment { from, to, color, width } => Some((*from, *to, color.as_str(), *width)),
                _ => None,
            })
            .collect()
    }

    /// Number of clears recorded so far.
    #[must_use]
    pub fn clear_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Clear { .. }))
            .count()
    }

    /// Forget all recorded calls.
    pub fn reset(&mut self) {
        self.ops.clear();
    }

    fn check(&self, color: &str) -> Result<(), SurfaceError> {
        if self.fail_draws || self.fail_color.as_deref() == Some(color) {
            return Err(SurfaceError::Backend("recording surface set to fail".into()));
        }
        Ok(())
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn stroke_segment(&mut self, from: Point, to: Point, color: &str, width: f64) -> Result<(), SurfaceError> {
        self.check(color)?;
        self.ops.push(DrawOp::Segment { from, to, color: color.to_owned(), width });
        Ok(())
    }

    fn clear_rect(&mut self, width: f64, height: f64) {
        self.ops.push(DrawOp::Clear { width, height });
    }
}

impl MarkerSurface for RecordingSurface {
    fn fill_disc(&mut self, center: Point, radius: f64, color: &str, alpha: f64) -> Result<(), SurfaceError> {
        self.check(color)?;
        self.ops.push(DrawOp::Disc { center, radius, color: color.to_owned(), alpha });
        Ok(())
    }

    fn fill_label(&mut self, text: &str, at: Point, color: &str, font: &str) -> Result<(), SurfaceError> {
        self.check(color)?;
        self.ops.push(DrawOp::Label { text: text.to_owned(), at, color: color.to_owned(), font: font.to_owned() });
        Ok(())
    }
}
