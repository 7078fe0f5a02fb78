#![allow(clippy::float_cmp)]

use super::*;
use crate::model::{CommittedStroke, Point, SeqPoint, StrokeMeta, Tool};
use crate::surface::{DrawOp, RecordingSurface};

// =============================================================
// Helpers
// =============================================================

fn stroke(id: &str, offset: f64) -> HistoryEntry {
    HistoryEntry::Stroke(CommittedStroke {
        stroke_id: StrokeId::new(id),
        author: "u1".into(),
        color: "#000".into(),
        size: 2.0,
        tool: Tool::Brush,
        path: vec![Point::new(offset, 0.0), Point::new(offset, 10.0), Point::new(offset + 5.0, 10.0)],
        server_ts: None,
    })
}

fn history(ids: &[&str]) -> Vec<HistoryEntry> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| stroke(id, i as f64 * 100.0))
        .collect()
}

fn renderer(check: HistoryCheck) -> HistoryRenderer {
    HistoryRenderer::new(check, "#fff")
}

fn surface() -> RecordingSurface {
    RecordingSurface::new(800.0, 600.0)
}

fn apply(r: &mut HistoryRenderer, h: &[HistoryEntry], s: &mut RecordingSurface) -> HistoryOutcome {
    let mut store = LiveStrokeStore::new();
    r.apply_history(h, Some(s), &mut store)
}

/// Segments a fresh surface shows after painting `h` in one go.
fn one_shot(h: &[HistoryEntry]) -> Vec<(Point, Point, String, f64)> {
    let mut s = surface();
    apply(&mut renderer(HistoryCheck::PrefixIds), h, &mut s);
    owned_segments(&s)
}

fn owned_segments(s: &RecordingSurface) -> Vec<(Point, Point, String, f64)> {
    s.visible_segments()
        .into_iter()
        .map(|(a, b, c, w)| (a, b, c.to_owned(), w))
        .collect()
}

// =============================================================
// Append fast path
// =============================================================

#[test]
fn first_history_is_an_append_from_zero() {
    let mut r = renderer(HistoryCheck::PrefixIds);
    let mut s = surface();
    assert_eq!(apply(&mut r, &history(&["a", "b"]), &mut s), HistoryOutcome::Appended { painted: 2 });
    assert_eq!(r.watermark(), 2);
    assert_eq!(s.clear_count(), 0);
    assert_eq!(s.visible_segments().len(), 4);
}

#[test]
fn append_paints_only_the_new_tail() {
    let mut r = renderer(HistoryCheck::PrefixIds);
    let mut s = surface();
    apply(&mut r, &history(&["a", "b"]), &mut s);
    s.reset();

    assert_eq!(apply(&mut r, &history(&["a", "b", "c"]), &mut s), HistoryOutcome::Appended { painted: 1 });
    assert_eq!(s.ops().len(), 2);
    assert_eq!(r.watermark(), 3);
}

#[test]
fn identical_history_is_unchanged() {
    let mut r = renderer(HistoryCheck::PrefixIds);
    let mut s = surface();
    apply(&mut r, &history(&["a"]), &mut s);
    s.reset();
    assert_eq!(apply(&mut r, &history(&["a"]), &mut s), HistoryOutcome::Unchanged);
    assert!(s.ops().is_empty());
}

#[test]
fn incremental_appends_match_one_shot() {
    let full = history(&["a", "b", "c", "d", "e"]);
    let mut r = renderer(HistoryCheck::PrefixIds);
    let mut s = surface();
    for len in 1..=full.len() {
        apply(&mut r, &full[..len], &mut s);
    }
    assert_eq!(owned_segments(&s), one_shot(&full));
    assert_eq!(s.clear_count(), 0);
}

// =============================================================
// Structural changes
// =============================================================

#[test]
fn shorter_history_clears_and_repaints_exactly_what_remains() {
    let mut r = renderer(HistoryCheck::PrefixIds);
    let mut s = surface();
    apply(&mut r, &history(&["a", "b", "c", "d", "e"]), &mut s);
    assert_eq!(r.watermark(), 5);

    let undone = history(&["a", "b", "c"]);
    assert_eq!(apply(&mut r, &undone, &mut s), HistoryOutcome::Repainted { painted: 3 });
    assert_eq!(r.watermark(), 3);
    assert!(matches!(s.visible().first(), Some(_)));
    assert!(matches!(s.ops()[s.ops().len() - s.visible().len() - 1], DrawOp::Clear { .. }));
    assert_eq!(owned_segments(&s), one_shot(&undone));
}

#[test]
fn clear_to_empty_leaves_blank_surface() {
    let mut r = renderer(HistoryCheck::PrefixIds);
    let mut s = surface();
    apply(&mut r, &history(&["a", "b"]), &mut s);
    assert_eq!(apply(&mut r, &[], &mut s), HistoryOutcome::Repainted { painted: 0 });
    assert_eq!(r.watermark(), 0);
    assert!(s.visible().is_empty());
}

#[test]
fn same_length_replacement_repaints_under_prefix_check() {
    let mut r = renderer(HistoryCheck::PrefixIds);
    let mut s = surface();
    apply(&mut r, &history(&["a", "b"]), &mut s);
    let replaced = history(&["a", "x"]);
    assert_eq!(apply(&mut r, &replaced, &mut s), HistoryOutcome::Repainted { painted: 2 });
    assert_eq!(owned_segments(&s), one_shot(&replaced));
}

#[test]
fn same_length_replacement_is_missed_by_length_check() {
    let mut r = renderer(HistoryCheck::Length);
    let mut s = surface();
    apply(&mut r, &history(&["a", "b"]), &mut s);
    s.reset();
    assert_eq!(apply(&mut r, &history(&["a", "x"]), &mut s), HistoryOutcome::Unchanged);
    assert!(s.ops().is_empty());
}

#[test]
fn longer_history_with_changed_prefix_repaints_under_prefix_check() {
    let mut r = renderer(HistoryCheck::PrefixIds);
    let mut s = surface();
    apply(&mut r, &history(&["a", "b"]), &mut s);
    assert_eq!(
        apply(&mut r, &history(&["a", "x", "c"]), &mut s),
        HistoryOutcome::Repainted { painted: 3 }
    );
}

#[test]
fn invalidate_forces_full_repaint() {
    let mut r = renderer(HistoryCheck::PrefixIds);
    let mut s = surface();
    apply(&mut r, &history(&["a"]), &mut s);
    r.invalidate();
    assert_eq!(apply(&mut r, &history(&["a", "b"]), &mut s), HistoryOutcome::Repainted { painted: 2 });
}

// =============================================================
// Malformed and degenerate entries
// =============================================================

#[test]
fn malformed_entries_hold_their_slot_but_paint_nothing() {
    let mut r = renderer(HistoryCheck::PrefixIds);
    let mut s = surface();
    let h = vec![stroke("a", 0.0), HistoryEntry::Malformed, stroke("c", 50.0)];
    assert_eq!(apply(&mut r, &h, &mut s), HistoryOutcome::Appended { painted: 2 });
    assert_eq!(r.watermark(), 3);
    assert_eq!(s.visible_segments().len(), 4);
}

#[test]
fn entries_without_stroke_id_never_leave_stale_paint() {
    let unnamed = |from: f64, to: f64| {
        HistoryEntry::from_value(&serde_json::json!({
            "path": [{ "x": from, "y": from }, { "x": to, "y": to }]
        }))
    };
    let mut r = renderer(HistoryCheck::PrefixIds);
    let mut s = surface();

    apply(&mut r, &[unnamed(0.0, 1.0)], &mut s);
    assert_eq!(r.watermark(), 1);
    assert!(s.visible_segments().is_empty());

    apply(&mut r, &[unnamed(50.0, 60.0)], &mut s);
    assert!(s.visible_segments().is_empty());

    assert!(matches!(apply(&mut r, &history(&["b"]), &mut s), HistoryOutcome::Repainted { painted: 1 }));
    assert_eq!(owned_segments(&s), one_shot(&history(&["b"])));
}

#[test]
fn short_path_paints_nothing() {
    let dot = HistoryEntry::Stroke(CommittedStroke {
        stroke_id: StrokeId::new("dot"),
        author: "u1".into(),
        color: "#000".into(),
        size: 2.0,
        tool: Tool::Brush,
        path: vec![Point::new(1.0, 1.0)],
        server_ts: None,
    });
    let mut r = renderer(HistoryCheck::PrefixIds);
    let mut s = surface();
    apply(&mut r, &[dot], &mut s);
    assert!(s.ops().is_empty());
    assert_eq!(r.watermark(), 1);
}

// =============================================================
// Surface availability and faults
// =============================================================

#[test]
fn missing_surface_keeps_watermark_and_still_evicts() {
    let mut r = renderer(HistoryCheck::PrefixIds);
    let mut store = LiveStrokeStore::new();
    let meta = StrokeMeta { author: "u1".into(), color: "#000".into(), size: 2.0, tool: Tool::Brush };
    store.merge_remote_point(StrokeId::new("a"), SeqPoint::new(0, 0.0, 0.0), meta);

    let h = history(&["a", "b"]);
    assert_eq!(r.apply_history(&h, None, &mut store), HistoryOutcome::SurfaceMissing);
    assert_eq!(r.watermark(), 0);
    assert!(store.is_empty());

    let mut s = surface();
    assert_eq!(r.apply_history(&h, Some(&mut s), &mut store), HistoryOutcome::Appended { painted: 2 });
    assert_eq!(r.watermark(), 2);
}

#[test]
fn draw_fault_triggers_repaint_on_next_apply() {
    let mut r = renderer(HistoryCheck::PrefixIds);
    let mut s = surface();
    s.fail_draws(true);
    apply(&mut r, &history(&["a"]), &mut s);
    s.fail_draws(false);
    assert_eq!(apply(&mut r, &history(&["a", "b"]), &mut s), HistoryOutcome::Repainted { painted: 2 });
}

// =============================================================
// Eviction
// =============================================================

#[test]
fn committed_strokes_leave_the_live_store() {
    let mut r = renderer(HistoryCheck::PrefixIds);
    let mut store = LiveStrokeStore::new();
    let meta = StrokeMeta { author: "u1".into(), color: "#000".into(), size: 2.0, tool: Tool::Brush };
    store.merge_remote_point(StrokeId::new("b"), SeqPoint::new(0, 0.0, 0.0), meta.clone());
    store.merge_remote_point(StrokeId::new("live"), SeqPoint::new(0, 0.0, 0.0), meta);

    let mut s = surface();
    r.apply_history(&history(&["a", "b"]), Some(&mut s), &mut store);
    assert!(!store.contains(&StrokeId::new("b")));
    assert!(store.contains(&StrokeId::new("live")));
}
