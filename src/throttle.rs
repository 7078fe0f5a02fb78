//! Trailing-edge throttle for perishable outbound events.
//!
//! A call either fires immediately (the window since the last fire has
//! elapsed) or parks its arguments in a single pending slot, overwriting
//! whatever was parked before. A [`Deferred`] trailing task fires the parked
//! arguments once the window closes, so the most recent call always gets out.
//! Intermediate calls inside a window are dropped.
//!
//! Time is passed in explicitly as milliseconds. The owner of a throttle polls
//! it when its deferred task comes due; nothing here reads a clock.

#[cfg(test)]
#[path = "throttle_test.rs"]
mod throttle_test;

/// A one-shot task due at a fixed time, polled by its owner.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Deferred {
    due_ms: Option<f64>,
}

impl Deferred {
    /// Cancel any armed instance and arm for `due_ms`.
    pub fn rearm(&mut self, due_ms: f64) {
        self.due_ms = Some(due_ms);
    }

    /// Disarm. Safe to call when nothing is armed.
    pub fn cancel(&mut self) {
        self.due_ms = None;
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.due_ms.is_some()
    }

    #[must_use]
    pub fn due_ms(&self) -> Option<f64> {
        self.due_ms
    }

    /// Disarm and return `true` if the task is due at `now_ms`.
    pub fn take_if_due(&mut self, now_ms: f64) -> bool {
        match self.due_ms {
            Some(due) if now_ms >= due => {
                self.due_ms = None;
                true
            }
            _ => false,
        }
    }
}

/// What a throttled call did with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum ThrottleDecision<T> {
    /// The window was open; invoke now with these arguments.
    Fire(T),
    /// Parked, and a trailing task was armed for `due_ms`.
    Deferred { due_ms: f64 },
    /// Parked, replacing earlier pending arguments; the trailing task was already armed.
    Coalesced,
}

/// Trailing-edge rate limiter over arguments of type `T`.
#[derive(Debug, Clone)]
pub struct Throttle<T> {
    window_ms: f64,
    last_fire_ms: Option<f64>,
    pending: Option<T>,
    trailing: Deferred,
}

impl<T> Throttle<T> {
    #[must_use]
    pub fn new(window_ms: f64) -> Self {
        Self { window_ms, last_fire_ms: None, pending: None, trailing: Deferred::default() }
    }

    /// Offer `args` at `now_ms`.
    pub fn call(&mut self, now_ms: f64, args: T) -> ThrottleDecision<T> {
        let last = match self.last_fire_ms {
            Some(last) if now_ms - last < self.window_ms => last,
            _ => {
                self.last_fire_ms = Some(now_ms);
                self.pending = None;
                self.trailing.cancel();
                return ThrottleDecision::Fire(args);
            }
        };

        self.pending = Some(args);
        if self.trailing.is_armed() {
            return ThrottleDecision::Coalesced;
        }
        let due_ms = last + self.window_ms;
        self.trailing.rearm(due_ms);
        ThrottleDecision::Deferred { due_ms }
    }

    /// Run the trailing task if it is due, returning the parked arguments.
    pub fn poll(&mut self, now_ms: f64) -> Option<T> {
        if !self.trailing.take_if_due(now_ms) {
            return None;
        }
        let args = self.pending.take()?;
        self.last_fire_ms = Some(now_ms);
        Some(args)
    }

    /// Drop the parked arguments and disarm the trailing task.
    ///
    /// The window is left as it was. Returns the arguments that were parked.
    pub fn cancel(&mut self) -> Option<T> {
        self.trailing.cancel();
        self.pending.take()
    }

    /// When the trailing task comes due, if armed.
    #[must_use]
    pub fn next_due(&self) -> Option<f64> {
        self.trailing.due_ms()
    }

    #[must_use]
    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref()
    }

    #[must_use]
    pub fn window_ms(&self) -> f64 {
        self.window_ms
    }
}

/// A throttle bound to the function it rate-limits.
pub struct Throttled<T, F>
where
    F: FnMut(T),
{
    throttle: Throttle<T>,
    sink: F,
}

/// Wrap `sink` so it runs at most once per `window_ms`, plus one trailing call.
#[must_use]
pub fn throttle<T, F>(sink: F, window_ms: f64) -> Throttled<T, F>
where
    F: FnMut(T),
{
    Throttled { throttle: Throttle::new(window_ms), sink }
}

impl<T, F> Throttled<T, F>
where
    F: FnMut(T),
{
    /// Call through the throttle. Returns `true` if the sink ran now.
    pub fn call(&mut self, now_ms: f64, args: T) -> bool {
        match self.throttle.call(now_ms, args) {
            ThrottleDecision::Fire(args) => {
                (self.sink)(args);
                true
            }
            ThrottleDecision::Deferred { .. } | ThrottleDecision::Coalesced => false,
        }
    }

    /// Run the trailing call if due. Returns `true` if the sink ran.
    pub fn poll(&mut self, now_ms: f64) -> bool {
        match self.throttle.poll(now_ms) {
            Some(args) => {
                (self.sink)(args);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn next_due(&self) -> Option<f64> {
        self.throttle.next_due()
    }
}
