//! Paint routines for the three layers: committed history, live previews, cursors.
//!
//! Each routine receives read-only views of engine state and a [`Surface`]. It
//! produces draw calls and never mutates application state. Fallible draw calls
//! propagate [`SurfaceError`]; callers decide whether a fault is worth more
//! than a log line.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::collections::BTreeMap;

use crate::config::CursorStyle;
use crate::model::{CommittedStroke, Cursor, Point, UserId};
use crate::store::PreviewStroke;
use crate::surface::{MarkerSurface, Surface, SurfaceError};

/// Stroke consecutive pairs of `points`. Returns the number of segments drawn.
///
/// Fewer than two points draw nothing.
///
/// # Errors
///
/// Returns the first [`SurfaceError`] raised by the surface.
pub fn draw_polyline<S, I>(surface: &mut S, points: I, color: &str, width: f64) -> Result<usize, SurfaceError>
where
    S: Surface + ?Sized,
    I: IntoIterator<Item = Point>,
{
    let mut points = points.into_iter();
    let Some(mut prev) = points.next() else {
        return Ok(0);
    };
    let mut drawn = 0;
    for next in points {
        surface.stroke_segment(prev, next, color, width)?;
        prev = next;
        drawn += 1;
    }
    Ok(drawn)
}

/// Draw one committed stroke along its path.
///
/// # Errors
///
/// Returns the first [`SurfaceError`] raised by the surface.
pub fn draw_committed<S>(surface: &mut S, stroke: &CommittedStroke, eraser_color: &str) -> Result<usize, SurfaceError>
where
    S: Surface + ?Sized,
{
    let ink = stroke.tool.ink(&stroke.color, eraser_color);
    draw_polyline(surface, stroke.path.iter().copied(), ink, stroke.size)
}

/// Clear the preview layer and redraw every live stroke in full.
///
/// Returns the number of segments drawn. A stroke the surface rejects is cut
/// short; the strokes after it are still drawn.
///
/// # Errors
///
/// Returns the first [`SurfaceError`] raised by the surface, after every
/// stroke has been attempted.
pub fn paint_preview<S>(surface: &mut S, strokes: &[PreviewStroke<'_>], eraser_color: &str) -> Result<usize, SurfaceError>
where
    S: Surface + ?Sized,
{
    let (width, height) = surface.size();
    surface.clear_rect(width, height);

    let mut drawn = 0;
    let mut fault = None;
    for stroke in strokes {
        let ink = stroke.meta.tool.ink(&stroke.meta.color, eraser_color);
        match draw_polyline(surface, stroke.points.iter().map(|p| p.position()), ink, stroke.meta.size) {
            Ok(segments) => drawn += segments,
            Err(err) => {
                fault.get_or_insert(err);
            }
        }
    }
    fault.map_or(Ok(drawn), Err)
}

/// Clear the cursor layer and draw a marker, plus a label when the name is
/// known, for every remote cursor. Returns the number of markers drawn.
///
/// # Errors
///
/// Returns the first [`SurfaceError`] raised by the surface, after every
/// cursor has been attempted.
pub fn paint_cursors<S>(surface: &mut S, cursors: &BTreeMap<UserId, Cursor>, style: &CursorStyle) -> Result<usize, SurfaceError>
where
    S: MarkerSurface + ?Sized,
{
    let (width, height) = surface.size();
    surface.clear_rect(width, height);

    let mut fault = None;
    for cursor in cursors.values() {
        if let Err(err) = paint_cursor(surface, cursor, style) {
            fault.get_or_insert(err);
        }
    }
    fault.map_or(Ok(cursors.len()), Err)
}

fn paint_cursor<S>(surface: &mut S, cursor: &Cursor, style: &CursorStyle) -> Result<(), SurfaceError>
where
    S: MarkerSurface + ?Sized,
{
    let center = Point::new(cursor.x, cursor.y);
    let marker = cursor.color.as_deref().unwrap_or(&style.fallback_marker_color);
    surface.fill_disc(center, style.radius, marker, style.alpha)?;

    if let Some(name) = cursor.username.as_deref() {
        let label = cursor.color.as_deref().unwrap_or(&style.fallback_label_color);
        let at = Point::new(cursor.x + style.label_offset.0, cursor.y + style.label_offset.1);
        surface.fill_label(name, at, label, &style.font)?;
    }
    Ok(())
}
