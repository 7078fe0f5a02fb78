#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;
use crate::emit::RecordingTransport;
use crate::model::Tool;
use crate::surface::RecordingSurface;

// =============================================================
// Helpers
// =============================================================

fn engine() -> EngineCore<RecordingTransport> {
    EngineCore::new(EngineConfig::default(), RecordingTransport::new())
}

fn init(engine: &mut EngineCore<RecordingTransport>) {
    let data = json!({
        "self": { "userId": "me", "username": "Me", "color": "#123456" },
        "users": [{ "userId": "u2", "username": "Two", "color": "#00ff00" }],
        "history": [],
        "roomId": "lobby"
    });
    engine.handle_message("init", &data, None).unwrap();
}

fn sent(engine: &EngineCore<RecordingTransport>) -> &[Outbound] {
    engine.emitter().transport().sent()
}

fn draws(engine: &EngineCore<RecordingTransport>) -> Vec<&DrawPayload> {
    sent(engine)
        .iter()
        .filter_map(|m| match m {
            Outbound::Draw(d) => Some(d),
            _ => None,
        })
        .collect()
}

fn remote_draw(stroke: &str, seq: u64, x: f64) -> Value {
    json!({ "strokeId": stroke, "seq": seq, "x": x, "y": 0, "color": "#f00", "size": 2,
            "tool": "brush", "userId": "u2", "isDrawing": true, "clientTs": 0 })
}

fn p(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

// =============================================================
// Local gesture
// =============================================================

#[test]
fn pen_down_opens_local_preview_and_emits_first_point() {
    let mut e = engine();
    init(&mut e);
    e.pen_down(1_000.0, p(5.0, 5.0));

    assert_eq!(e.store().len(), 1);
    let id = e.pen().stroke_id().unwrap().clone();
    assert!(id.as_str().starts_with("me-1000-"));
    let first = draws(&e)[0];
    assert_eq!((first.seq, first.is_drawing), (0, true));
    assert_eq!(first.stroke_id, id);
}

#[test]
fn local_preview_renders_without_waiting_for_echo() {
    let mut e = engine();
    e.pen_down(0.0, p(0.0, 0.0));
    e.pen_move(1.0, p(10.0, 0.0));
    e.pen_move(2.0, p(20.0, 0.0));

    let mut preview = RecordingSurface::new(100.0, 100.0);
    assert_eq!(e.render_preview(Some(&mut preview)), FrameOutcome::Drawn { items: 2 });
}

#[test]
fn pen_moves_inside_window_are_throttled() {
    let mut e = engine();
    e.pen_down(0.0, p(0.0, 0.0));
    for i in 1..10 {
        e.pen_move(f64::from(i), p(f64::from(i), 0.0));
    }
    assert_eq!(draws(&e).len(), 1);
    assert_eq!(e.next_deadline(), Some(20.0));
    assert_eq!(e.poll_timers(20.0), 1);
    assert_eq!(draws(&e).last().map(|d| d.seq), Some(9));
}

#[test]
fn pen_up_sends_final_draw_and_stroke_complete() {
    let mut e = engine();
    init(&mut e);
    e.set_color("#abcdef");
    e.pen_down(0.0, p(0.0, 0.0));
    e.pen_move(1.0, p(1.0, 1.0));
    e.pen_move(2.0, p(2.0, 2.0));
    assert!(e.pen_up(3.0));

    let last_draw = draws(&e).into_iter().last().unwrap().clone();
    assert!(!last_draw.is_drawing);
    assert_eq!(last_draw.seq, 3);
    assert_eq!((last_draw.x, last_draw.y), (2.0, 2.0));

    let Some(Outbound::StrokeComplete(complete)) = sent(&e).last() else {
        panic!("expected strokeComplete last");
    };
    assert_eq!(complete.path, vec![p(0.0, 0.0), p(1.0, 1.0), p(2.0, 2.0)]);
    assert_eq!(complete.color, "#abcdef");
    assert_eq!(complete.user_id, "me");
    assert!(!e.pen().is_drawing());
    assert_eq!(e.store().len(), 1, "preview stays until history commits it");
}

#[test]
fn nothing_follows_stroke_complete_for_the_same_stroke() {
    let mut e = engine();
    init(&mut e);
    e.pen_down(0.0, p(0.0, 0.0));
    e.pen_move(5.0, p(5.0, 0.0));
    e.pen_move(8.0, p(8.0, 0.0));
    assert!(e.pen_up(9.0));
    e.poll_timers(25.0);
    e.poll_timers(100.0);

    let seqs: Vec<u64> = draws(&e).iter().map(|d| d.seq).collect();
    assert_eq!(seqs, vec![0, 3]);
    let complete_at = sent(&e)
        .iter()
        .position(|m| matches!(m, Outbound::StrokeComplete(_)))
        .unwrap();
    assert!(
        sent(&e)[complete_at..]
            .iter()
            .all(|m| !matches!(m, Outbound::Draw(_)))
    );
}

#[test]
fn late_remote_draw_after_commit_is_ignored() {
    let mut e = engine();
    init(&mut e);
    e.handle_message("draw", &remote_draw("r1", 0, 0.0), None).unwrap();
    let history = json!([{ "strokeId": "r1", "userId": "u2", "path": [{ "x": 0, "y": 0 }, { "x": 3, "y": 0 }] }]);
    let mut committed = RecordingSurface::new(50.0, 50.0);
    e.handle_message("historyUpdate", &history, Some(&mut committed)).unwrap();

    let effect = e.handle_message("draw", &remote_draw("r1", 2, 2.0), None).unwrap();
    assert_eq!(effect, Effect::Ignored);
    assert!(e.store().is_empty());
}

#[test]
fn single_point_tap_is_not_committed() {
    let mut e = engine();
    e.pen_down(0.0, p(3.0, 3.0));
    assert!(e.pen_up(1.0));
    assert!(!e.emitter().transport().events().contains(&"strokeComplete"));
    assert!(e.store().is_empty());
}

#[test]
fn pen_up_while_idle_is_a_no_op() {
    let mut e = engine();
    assert!(!e.pen_up(0.0));
    assert!(sent(&e).is_empty());
}

#[test]
fn pen_down_during_gesture_finishes_previous_stroke() {
    let mut e = engine();
    e.pen_down(0.0, p(0.0, 0.0));
    e.pen_move(1.0, p(1.0, 0.0));
    let first = e.pen().stroke_id().unwrap().clone();
    e.pen_down(50.0, p(9.0, 9.0));
    assert_ne!(e.pen().stroke_id(), Some(&first));
    assert!(e.emitter().transport().events().contains(&"strokeComplete"));
}

#[test]
fn eraser_strokes_carry_eraser_tool() {
    let mut e = engine();
    assert!(e.toggle_eraser());
    e.pen_down(0.0, p(0.0, 0.0));
    e.pen_move(1.0, p(1.0, 0.0));

    assert_eq!(draws(&e)[0].tool, Tool::Eraser);
    let mut preview = RecordingSurface::new(10.0, 10.0);
    e.render_preview(Some(&mut preview));
    assert_eq!(preview.visible_segments()[0].2, "#fff");
}

#[test]
fn pen_move_broadcasts_cursor_with_identity_color() {
    let mut e = engine();
    init(&mut e);
    e.set_color("#ff0000");
    e.pen_move(0.0, p(4.0, 4.0));
    let Some(Outbound::Cursor(cursor)) = sent(&e).first() else {
        panic!("expected cursor");
    };
    assert_eq!(cursor.color.as_deref(), Some("#123456"));
    assert!(e.store().is_empty());
}

#[test]
fn unready_channel_still_updates_local_preview() {
    let mut e = engine();
    e.emitter_mut().transport_mut().set_ready(false);
    e.pen_down(0.0, p(0.0, 0.0));
    e.pen_move(30.0, p(1.0, 0.0));
    assert!(e.pen_up(60.0));
    assert!(sent(&e).is_empty());
    assert!(e.emitter().dropped() >= 3);
    assert_eq!(e.store().len(), 1);
}

#[test]
fn history_commands_are_unthrottled() {
    let mut e = engine();
    assert!(e.undo());
    assert!(e.redo());
    assert!(e.clear_canvas());
    assert_eq!(e.emitter().transport().events(), vec!["undo", "redo", "clear-canvas"]);
}

// =============================================================
// Inbound
// =============================================================

#[test]
fn init_adopts_identity_and_paints_history() {
    let mut e = engine();
    let data = json!({
        "self": { "userId": "me", "username": "Me", "color": "#123456" },
        "users": [],
        "history": [{ "strokeId": "old", "userId": "u2", "color": "#000", "size": 2, "tool": "brush",
                      "path": [{ "x": 0, "y": 0 }, { "x": 5, "y": 5 }] }],
        "roomId": "lobby"
    });
    let mut committed = RecordingSurface::new(100.0, 100.0);
    let effect = e.handle_message("init", &data, Some(&mut committed)).unwrap();
    assert_eq!(effect, Effect::History(HistoryOutcome::Appended { painted: 1 }));
    assert_eq!(e.local_user_id(), "me");
    assert_eq!(e.tools().color(), "#123456");
    assert_eq!(e.roster().room_id(), Some("lobby"));
    assert_eq!(committed.visible_segments().len(), 1);
}

#[test]
fn remote_draws_merge_by_seq() {
    let mut e = engine();
    for (seq, x) in [(2, 2.0), (0, 0.0), (1, 1.0)] {
        e.handle_message("draw", &remote_draw("r1", seq, x), None).unwrap();
    }
    let stroke = e.store().get(&StrokeId::new("r1")).unwrap();
    let seqs: Vec<u64> = stroke.points().iter().map(|p| p.seq).collect();
    assert_eq!(seqs, vec![0, 1, 2]);
    assert_eq!(stroke.meta.author, "u2");
}

#[test]
fn own_echoed_draws_are_ignored() {
    let mut e = engine();
    init(&mut e);
    let mut echo = remote_draw("me-1-abcd", 0, 0.0);
    echo["userId"] = json!("me");
    assert_eq!(e.handle_message("draw", &echo, None).unwrap(), Effect::Ignored);
    assert!(e.store().is_empty());
}

#[test]
fn cursor_updates_resolve_usernames_and_skip_self() {
    let mut e = engine();
    init(&mut e);
    e.handle_message("cursor", &json!({ "userId": "u2", "x": 1, "y": 2, "color": "#0f0" }), None)
        .unwrap();
    e.handle_message("cursor", &json!({ "userId": "me", "x": 1, "y": 2 }), None)
        .unwrap();
    assert_eq!(e.cursors().len(), 1);
    assert_eq!(e.cursors().snapshot()["u2"].username.as_deref(), Some("Two"));
}

#[test]
fn user_left_cleans_up_cursor_and_strokes() {
    let mut e = engine();
    init(&mut e);
    e.handle_message("draw", &remote_draw("r1", 0, 0.0), None).unwrap();
    e.handle_message("cursor", &json!({ "userId": "u2", "x": 1, "y": 2 }), None)
        .unwrap();

    let effect = e.handle_message("user-left", &json!({ "userId": "u2" }), None).unwrap();
    assert_eq!(effect, Effect::PresenceChanged { evicted: 1 });
    assert!(e.store().is_empty());
    assert!(e.cursors().is_empty());
    assert!(e.roster().username_of("u2").is_none());
}

#[test]
fn user_joined_extends_roster() {
    let mut e = engine();
    e.handle_message("user-joined", &json!({ "userId": "u5", "username": "Five", "color": "#555" }), None)
        .unwrap();
    assert_eq!(e.roster().username_of("u5"), Some("Five"));
}

#[test]
fn committed_local_stroke_leaves_preview() {
    let mut e = engine();
    init(&mut e);
    e.pen_down(0.0, p(0.0, 0.0));
    e.pen_move(1.0, p(1.0, 1.0));
    e.pen_up(2.0);
    let id = e.store().snapshot_for_render()[0].stroke_id.clone();

    let history = json!([{ "strokeId": id.as_str(), "userId": "me", "color": "#123456", "size": 5,
                           "tool": "brush", "path": [{ "x": 0, "y": 0 }, { "x": 1, "y": 1 }] }]);
    let mut committed = RecordingSurface::new(10.0, 10.0);
    e.handle_message("historyUpdate", &history, Some(&mut committed)).unwrap();
    assert!(e.store().is_empty());
    assert_eq!(e.history().watermark(), 1);
}

#[test]
fn malformed_messages_are_dropped_and_counted() {
    let mut e = engine();
    assert!(e.handle_message("draw", &json!({ "seq": 1 }), None).is_err());
    assert!(e.handle_message("bogus", &json!({}), None).is_err());
    assert_eq!(e.inbound_stats(), InboundStats { applied: 0, dropped: 2 });
    assert!(e.store().is_empty());
}

#[test]
fn missing_cursor_surface_is_skipped() {
    let mut e = engine();
    assert_eq!(e.render_cursors(None), FrameOutcome::Skipped);
    let mut s = RecordingSurface::new(10.0, 10.0);
    assert_eq!(e.render_cursors(Some(&mut s)), FrameOutcome::Drawn { items: 0 });
}

#[test]
fn repaint_after_resize_restores_committed_layer_immediately() {
    let mut e = engine();
    init(&mut e);
    let history = json!([
        { "strokeId": "a", "userId": "u2", "path": [{ "x": 0, "y": 0 }, { "x": 5, "y": 5 }] },
        { "strokeId": "b", "userId": "u2", "path": [{ "x": 5, "y": 5 }, { "x": 9, "y": 0 }] }
    ]);
    let mut committed = RecordingSurface::new(50.0, 50.0);
    e.handle_message("historyUpdate", &history, Some(&mut committed)).unwrap();
    let before = committed.visible_segments().len();

    // A resized canvas comes back blank.
    let mut resized = RecordingSurface::new(80.0, 80.0);
    let outcome = e.repaint_committed(Some(&mut resized));
    assert_eq!(outcome, HistoryOutcome::Repainted { painted: 2 });
    assert_eq!(resized.visible_segments().len(), before);
    assert_eq!(e.committed_history().len(), 2);
    assert_eq!(e.history().watermark(), 2);
}

#[test]
fn repaint_without_surface_paints_nothing() {
    let mut e = engine();
    assert_eq!(e.repaint_committed(None), HistoryOutcome::SurfaceMissing);
}
