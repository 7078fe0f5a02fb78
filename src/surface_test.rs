#![allow(clippy::float_cmp)]

use super::*;

fn p(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

#[test]
fn recording_surface_reports_size() {
    let surface = RecordingSurface::new(640.0, 480.0);
    assert_eq!(surface.size(), (640.0, 480.0));
}

#[test]
fn visible_starts_after_last_clear() {
    let mut surface = RecordingSurface::new(10.0, 10.0);
    surface.stroke_segment(p(0.0, 0.0), p(1.0, 1.0), "#000", 1.0).unwrap();
    surface.clear_rect(10.0, 10.0);
    surface.stroke_segment(p(2.0, 2.0), p(3.0, 3.0), "#f00", 2.0).unwrap();

    let segments = surface.visible_segments();
    assert_eq!(segments, vec![(p(2.0, 2.0), p(3.0, 3.0), "#f00", 2.0)]);
    assert_eq!(surface.ops().len(), 3);
    assert_eq!(surface.clear_count(), 1);
}

#[test]
fn visible_without_clear_is_everything() {
    let mut surface = RecordingSurface::new(10.0, 10.0);
    surface.fill_disc(p(1.0, 1.0), 6.0, "#abc", 0.7).unwrap();
    surface.fill_label("Ada", p(11.0, 4.0), "#abc", "12px Arial").unwrap();
    assert_eq!(surface.visible().len(), 2);
    assert!(surface.visible_segments().is_empty());
}

#[test]
fn failing_surface_records_nothing() {
    let mut surface = RecordingSurface::new(10.0, 10.0);
    surface.fail_draws(true);
    let err = surface
        .stroke_segment(p(0.0, 0.0), p(1.0, 1.0), "#000", 1.0)
        .unwrap_err();
    assert!(matches!(err, SurfaceError::Backend(_)));
    assert!(surface.ops().is_empty());

    surface.clear_rect(10.0, 10.0);
    assert_eq!(surface.clear_count(), 1);
}

#[test]
fn reset_forgets_history() {
    let mut surface = RecordingSurface::new(10.0, 10.0);
    surface.clear_rect(10.0, 10.0);
    surface.reset();
    assert!(surface.ops().is_empty());
}
