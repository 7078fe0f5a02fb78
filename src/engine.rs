//! Engine core: owns every component and routes events between them.
//!
//! All state lives in one [`EngineCore`] owned by the host. Handlers run to
//! completion on a single thread: inbound messages mutate the store, history,
//! cursors and roster; pen input mutates the store optimistically and emits
//! through the [`Emitter`]; frame callbacks only read.
//!
//! Time is always passed in by the host as milliseconds since the Unix epoch.
//! The same clock drives throttling and stroke-id generation.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use serde_json::Value;

use crate::config::EngineConfig;
use crate::consts::FALLBACK_USER_ID;
use crate::cursor::CursorTracker;
use crate::emit::{Emitter, Transport};
use crate::history::{HistoryOutcome, HistoryRenderer};
use crate::input::{PenState, ToolSettings};
use crate::model::{HistoryEntry, Point, SeqPoint, StrokeId, StrokeMeta};
use crate::protocol::{
    self, CursorPayload, DrawPayload, Inbound, InitPayload, Outbound, ProtocolError, StrokeCompletePayload,
};
use crate::roster::Roster;
use crate::scheduler::{FrameOutcome, RenderScheduler};
use crate::store::LiveStrokeStore;
use crate::surface::{MarkerSurface, Surface};

/// What an inbound message changed, for the host to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Nothing changed.
    Ignored,
    /// A live stroke gained a point.
    PreviewChanged,
    /// A remote cursor moved.
    CursorsChanged,
    /// Authoritative history was applied.
    History(HistoryOutcome),
    /// The roster changed; `evicted` live strokes were dropped with a departing user.
    PresenceChanged { evicted: usize },
}

/// Counters for inbound traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InboundStats {
    pub applied: u64,
    pub dropped: u64,
}

/// Every piece of client state, independent of any browser API.
pub struct EngineCore<T: Transport> {
    config: EngineConfig,
    store: LiveStrokeStore,
    history: HistoryRenderer,
    /// Most recent authoritative history, kept so a wiped surface can be repainted.
    committed: Vec<HistoryEntry>,
    cursors: CursorTracker,
    roster: Roster,
    scheduler: RenderScheduler,
    tools: ToolSettings,
    pen: PenState,
    emitter: Emitter<T>,
    inbound: InboundStats,
}

impl<T: Transport> EngineCore<T> {
    #[must_use]
    pub fn new(config: EngineConfig, transport: T) -> Self {
        Self {
            store: LiveStrokeStore::new(),
            history: HistoryRenderer::new(config.history_check, config.eraser_color.clone()),
            committed: Vec::new(),
            cursors: CursorTracker::new(),
            roster: Roster::new(),
            scheduler: RenderScheduler::new(config.eraser_color.clone(), config.cursor.clone()),
            tools: ToolSettings::new(config.default_color.clone(), config.default_brush_size),
            pen: PenState::default(),
            emitter: Emitter::new(transport, config.draw_throttle_ms, config.cursor_throttle_ms),
            inbound: InboundStats::default(),
            config,
        }
    }

    // --- Inbound ---

    /// Validate and apply one raw inbound message.
    ///
    /// # Errors
    ///
    /// Returns the [`ProtocolError`] for a message that failed validation. The
    /// message has been dropped and no state changed.
    pub fn handle_message(
        &mut self,
        event: &str,
        data: &Value,
        committed: Option<&mut dyn Surface>,
    ) -> Result<Effect, ProtocolError> {
        match protocol::parse_inbound(event, data) {
            Ok(message) => Ok(self.handle_inbound(message, committed)),
            Err(err) => {
                self.inbound.dropped += 1;
                tracing::debug!(event, %err, "dropping inbound message");
                Err(err)
            }
        }
    }

    /// Apply one validated inbound message.
    pub fn handle_inbound(&mut self, message: Inbound, committed: Option<&mut dyn Surface>) -> Effect {
        self.inbound.applied += 1;
        match message {
            Inbound::Draw(draw) => self.apply_remote_draw(draw),
            Inbound::Cursor(cursor) => self.apply_remote_cursor(cursor),
            Inbound::HistoryUpdate(history) => Effect::History(self.apply_history(history, committed)),
            Inbound::UserLeft { user_id } => self.apply_user_left(&user_id),
            Inbound::UserJoined(identity) => {
                tracing::debug!(user_id = %identity.user_id, "user joined");
                self.roster.join(identity);
                Effect::PresenceChanged { evicted: 0 }
            }
            Inbound::Init(init) => self.apply_init(init, committed),
        }
    }

    fn apply_remote_draw(&mut self, draw: DrawPayload) -> Effect {
        if self.roster.is_self(&draw.user_id) {
            return Effect::Ignored;
        }
        let meta = StrokeMeta { author: draw.user_id, color: draw.color, size: draw.size, tool: draw.tool };
        if self
            .store
            .merge_remote_point(draw.stroke_id, SeqPoint::new(draw.seq, draw.x, draw.y), meta)
        {
            Effect::PreviewChanged
        } else {
            Effect::Ignored
        }
    }

    fn apply_remote_cursor(&mut self, cursor: CursorPayload) -> Effect {
        if self.roster.is_self(&cursor.user_id) {
            return Effect::Ignored;
        }
        let username = self.roster.username_of(&cursor.user_id).map(str::to_owned);
        self.cursors
            .set_cursor(&cursor.user_id, cursor.x, cursor.y, cursor.color, username);
        Effect::CursorsChanged
    }

    fn apply_history(&mut self, history: Vec<HistoryEntry>, committed: Option<&mut dyn Surface>) -> HistoryOutcome {
        self.committed = history;
        self.history
            .apply_history(&self.committed, committed, &mut self.store)
    }

    fn apply_user_left(&mut self, user_id: &str) -> Effect {
        self.roster.leave(user_id);
        self.cursors.remove_cursor(user_id);
        let evicted = self.store.evict_by_author(user_id);
        tracing::debug!(user_id, evicted, "user left");
        Effect::PresenceChanged { evicted }
    }

    fn apply_init(&mut self, init: InitPayload, committed: Option<&mut dyn Surface>) -> Effect {
        let InitPayload { self_identity, users, history, room_id } = init;
        tracing::info!(user_id = %self_identity.user_id, room_id = room_id.as_deref(), users = users.len(), "session initialized");
        self.tools.set_color(self_identity.color.clone());
        self.roster.load(self_identity, users, room_id);
        Effect::History(self.apply_history(history, committed))
    }

    // --- Local input ---

    /// Start a stroke at `pos`.
    ///
    /// A gesture still in progress is finished first.
    pub fn pen_down(&mut self, now_ms: f64, pos: Point) {
        if self.pen.is_drawing() {
            self.pen_up(now_ms);
        }
        let user_id = self.local_user_id().to_owned();
        let stroke_id = StrokeId::generate(&user_id, epoch_millis(now_ms));
        let meta = self.stroke_meta(user_id);

        self.store
            .start_local_stroke(stroke_id.clone(), meta, SeqPoint::new(0, pos.x, pos.y));
        self.pen.begin(stroke_id.clone(), pos);
        let payload = self.draw_payload(stroke_id, 0, pos, true, now_ms);
        self.emitter.draw_throttled(now_ms, payload);
    }

    /// Move the pen. Broadcasts the cursor; extends the stroke if one is in progress.
    pub fn pen_move(&mut self, now_ms: f64, pos: Point) {
        let cursor = CursorPayload {
            user_id: self.local_user_id().to_owned(),
            x: pos.x,
            y: pos.y,
            color: Some(self.identity_color().to_owned()),
        };
        self.emitter.cursor_throttled(now_ms, cursor);

        let Some((stroke_id, seq)) = self.pen.advance(pos) else {
            return;
        };
        self.store
            .append_local_point(&stroke_id, SeqPoint::new(seq, pos.x, pos.y));
        let payload = self.draw_payload(stroke_id, seq, pos, true, now_ms);
        self.emitter.draw_throttled(now_ms, payload);
    }

    /// Lift the pen. Returns `false` if no stroke was in progress.
    ///
    /// Sends the final `draw` unthrottled and submits the path for commit. A
    /// parked trailing `draw` is discarded first; nothing for the stroke may
    /// follow `strokeComplete`. A single-point gesture is never committed, so
    /// its preview is dropped here.
    pub fn pen_up(&mut self, now_ms: f64) -> bool {
        let Some(done) = self.pen.finish() else {
            return false;
        };
        self.emitter.cancel_draw();
        let last = done.last_position();
        let final_draw = self.draw_payload(done.stroke_id.clone(), done.final_seq, last, false, now_ms);
        self.emitter.send_now(Outbound::Draw(final_draw));

        if done.is_committable() {
            let complete = StrokeCompletePayload {
                user_id: self.local_user_id().to_owned(),
                color: self.tools.color().to_owned(),
                size: self.tools.brush_size(),
                tool: self.tools.tool(),
                stroke_id: done.stroke_id,
                path: done.path,
            };
            self.emitter.send_now(Outbound::StrokeComplete(complete));
        } else {
            tracing::debug!(stroke_id = %done.stroke_id, "single-point stroke not committed");
            self.store.evict(&done.stroke_id);
        }
        true
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.tools.set_color(color);
    }

    pub fn set_brush_size(&mut self, size: f64) {
        self.tools.set_brush_size(size);
    }

    /// Flip eraser mode, returning the new state.
    pub fn toggle_eraser(&mut self) -> bool {
        self.tools.toggle_eraser()
    }

    pub fn undo(&mut self) -> bool {
        self.emitter.send_now(Outbound::Undo)
    }

    pub fn redo(&mut self) -> bool {
        self.emitter.send_now(Outbound::Redo)
    }

    pub fn clear_canvas(&mut self) -> bool {
        self.emitter.send_now(Outbound::ClearCanvas)
    }

    // --- Timers and frames ---

    /// Fire trailing throttled emissions that are due. Returns how many were sent.
    pub fn poll_timers(&mut self, now_ms: f64) -> usize {
        self.emitter.poll(now_ms)
    }

    /// When [`EngineCore::poll_timers`] next has work, if ever.
    #[must_use]
    pub fn next_deadline(&self) -> Option<f64> {
        self.emitter.next_deadline()
    }

    /// Preview-layer frame callback.
    pub fn render_preview(&mut self, surface: Option<&mut dyn Surface>) -> FrameOutcome {
        self.scheduler.preview_frame(&self.store, surface)
    }

    /// Cursor-layer frame callback.
    pub fn render_cursors(&mut self, surface: Option<&mut dyn MarkerSurface>) -> FrameOutcome {
        self.scheduler.cursor_frame(&self.cursors, surface)
    }

    /// Clear `surface` and repaint the last applied history onto it now,
    /// e.g. after a resize wiped the canvas.
    pub fn repaint_committed(&mut self, surface: Option<&mut dyn Surface>) -> HistoryOutcome {
        self.history.invalidate();
        self.history
            .apply_history(&self.committed, surface, &mut self.store)
    }

    /// The last history applied, as received.
    #[must_use]
    pub fn committed_history(&self) -> &[HistoryEntry] {
        &self.committed
    }

    // --- Queries ---

    /// User id stamped on local strokes.
    #[must_use]
    pub fn local_user_id(&self) -> &str {
        self.roster
            .self_identity()
            .map_or(FALLBACK_USER_ID, |me| me.user_id.as_str())
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &LiveStrokeStore {
        &self.store
    }

    #[must_use]
    pub fn history(&self) -> &HistoryRenderer {
        &self.history
    }

    #[must_use]
    pub fn cursors(&self) -> &CursorTracker {
        &self.cursors
    }

    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    #[must_use]
    pub fn scheduler(&self) -> &RenderScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn tools(&self) -> &ToolSettings {
        &self.tools
    }

    #[must_use]
    pub fn pen(&self) -> &PenState {
        &self.pen
    }

    #[must_use]
    pub fn emitter(&self) -> &Emitter<T> {
        &self.emitter
    }

    pub fn emitter_mut(&mut self) -> &mut Emitter<T> {
        &mut self.emitter
    }

    #[must_use]
    pub fn inbound_stats(&self) -> InboundStats {
        self.inbound
    }

    // --- Helpers ---

    fn identity_color(&self) -> &str {
        self.roster
            .self_identity()
            .map_or(self.tools.color(), |me| me.color.as_str())
    }

    fn stroke_meta(&self, author: String) -> StrokeMeta {
        StrokeMeta {
            author,
            color: self.tools.color().to_owned(),
            size: self.tools.brush_size(),
            tool: self.tools.tool(),
        }
    }

    fn draw_payload(&self, stroke_id: StrokeId, seq: u64, pos: Point, is_drawing: bool, now_ms: f64) -> DrawPayload {
        DrawPayload {
            stroke_id,
            seq,
            x: pos.x,
            y: pos.y,
            color: self.tools.color().to_owned(),
            size: self.tools.brush_size(),
            tool: self.tools.tool(),
            user_id: self.local_user_id().to_owned(),
            is_drawing,
            client_ts: now_ms,
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn epoch_millis(now_ms: f64) -> i64 {
    now_ms.round() as i64
}
