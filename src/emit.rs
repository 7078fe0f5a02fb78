//! Outbound channel: readiness gating plus per-event throttling.
//!
//! `draw` (while the pen is down) and `cursor` updates are perishable and go
//! through their own [`Throttle`]. Everything else (the final `draw` of a
//! gesture, `strokeComplete`, `undo`, `redo`, `clear-canvas`) is sent
//! immediately. Whatever fires while the channel is not ready is dropped,
//! never queued.

#[cfg(test)]
#[path = "emit_test.rs"]
mod emit_test;

use crate::protocol::{CursorPayload, DrawPayload, Outbound};
use crate::throttle::{Throttle, ThrottleDecision};

/// The session-layer channel the engine emits into.
pub trait Transport {
    /// Whether the channel can accept a message right now.
    fn is_ready(&self) -> bool;

    /// Hand one message to the channel. Only called while [`Transport::is_ready`] holds.
    fn send(&mut self, message: &Outbound);
}

/// Transport that keeps every message it is given. Used by tests and the replay binary.
#[derive(Debug, Clone)]
pub struct RecordingTransport {
    ready: bool,
    sent: Vec<Outbound>,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self { ready: true, sent: Vec::new() }
    }
}

impl RecordingTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    #[must_use]
    pub fn sent(&self) -> &[Outbound] {
        &self.sent
    }

    /// Event names of every message sent so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<&'static str> {
        self.sent.iter().map(Outbound::event).collect()
    }

    /// Drain the recorded messages.
    pub fn take(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.sent)
    }
}

impl Transport for RecordingTransport {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn send(&mut self, message: &Outbound) {
        self.sent.push(message.clone());
    }
}

/// Gated, throttled sender over a [`Transport`].
#[derive(Debug)]
pub struct Emitter<T: Transport> {
    transport: T,
    draw: Throttle<DrawPayload>,
    cursor: Throttle<CursorPayload>,
    dropped: u64,
}

impl<T: Transport> Emitter<T> {
    #[must_use]
    pub fn new(transport: T, draw_window_ms: f64, cursor_window_ms: f64) -> Self {
        Self {
            transport,
            draw: Throttle::new(draw_window_ms),
            cursor: Throttle::new(cursor_window_ms),
            dropped: 0,
        }
    }

    /// Send `message` now if the channel is ready. Returns `true` if it was sent.
    pub fn send_now(&mut self, message: Outbound) -> bool {
        if !self.transport.is_ready() {
            self.dropped += 1;
            tracing::debug!(event = message.event(), "channel not ready; dropping outbound message");
            return false;
        }
        self.transport.send(&message);
        true
    }

    /// Offer an in-progress `draw` update. Returns `true` if it went out immediately.
    pub fn draw_throttled(&mut self, now_ms: f64, payload: DrawPayload) -> bool {
        match self.draw.call(now_ms, payload) {
            ThrottleDecision::Fire(payload) => self.send_now(Outbound::Draw(payload)),
            ThrottleDecision::Deferred { due_ms } => {
                tracing::trace!(due_ms, "draw update deferred");
                false
            }
            ThrottleDecision::Coalesced => false,
        }
    }

    /// Offer a `cursor` update. Returns `true` if it went out immediately.
    pub fn cursor_throttled(&mut self, now_ms: f64, payload: CursorPayload) -> bool {
        match self.cursor.call(now_ms, payload) {
            ThrottleDecision::Fire(payload) => self.send_now(Outbound::Cursor(payload)),
            ThrottleDecision::Deferred { .. } | ThrottleDecision::Coalesced => false,
        }
    }

    /// Discard a parked `draw` update so it can never go out. Returns `true` if one was parked.
    pub fn cancel_draw(&mut self) -> bool {
        match self.draw.cancel() {
            Some(payload) => {
                tracing::trace!(stroke_id = %payload.stroke_id, seq = payload.seq, "parked draw update cancelled");
                true
            }
            None => false,
        }
    }

    /// Fire any trailing updates that are due. Returns how many were sent.
    pub fn poll(&mut self, now_ms: f64) -> usize {
        let mut sent = 0;
        if let Some(payload) = self.draw.poll(now_ms) {
            sent += usize::from(self.send_now(Outbound::Draw(payload)));
        }
        if let Some(payload) = self.cursor.poll(now_ms) {
            sent += usize::from(self.send_now(Outbound::Cursor(payload)));
        }
        sent
    }

    /// Earliest time a trailing update comes due, if any is armed.
    #[must_use]
    pub fn next_deadline(&self) -> Option<f64> {
        match (self.draw.next_due(), self.cursor.next_due()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Messages dropped because the channel was not ready.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
