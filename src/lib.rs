//! Live-stroke reconciliation and rendering engine for a shared drawing canvas.
//!
//! Several participants draw at once. This crate renders the local participant's
//! pen input immediately, merges remote point updates (which may arrive out of
//! order or more than once) into correct in-progress paths, and reconciles the
//! server's authoritative stroke history onto a persistent surface without
//! double-drawing or leaving stale previews behind.
//!
//! Transport, identity assignment, pointer capture and the actual drawing
//! backend live outside the crate and are reached through the [`emit::Transport`]
//! and [`surface::Surface`] traits. The optional `web` feature supplies browser
//! implementations of both render layers and the frame loops.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level [`engine::EngineCore`] that owns all state and dispatches events |
//! | [`model`] | Point, stroke, cursor and identity value types |
//! | [`store`] | Live Stroke Store for in-progress previews |
//! | [`history`] | Committed History Renderer (append fast path vs full repaint) |
//! | [`throttle`] | Trailing-edge throttle and its deferred task |
//! | [`emit`] | Outbound channel gating and throttled emission |
//! | [`cursor`] | Remote cursor tracker |
//! | [`roster`] | Participant directory fed by presence events |
//! | [`input`] | Tool settings and the pen gesture state machine |
//! | [`protocol`] | Wire messages and boundary validation |
//! | [`surface`] | Drawing-surface traits and an in-memory recorder |
//! | [`render`] | Paint routines for every layer |
//! | [`scheduler`] | Per-frame preview and cursor callbacks |
//! | [`config`] | Engine configuration |
//! | [`consts`] | Shared defaults (throttle windows, cursor styling, etc.) |
//! | `web` | Browser canvas surfaces and `requestAnimationFrame` loops (feature `web`) |

pub mod config;
pub mod consts;
pub mod cursor;
pub mod emit;
pub mod engine;
pub mod history;
pub mod input;
pub mod model;
pub mod protocol;
pub mod render;
pub mod roster;
pub mod scheduler;
pub mod store;
pub mod surface;
pub mod throttle;
#[cfg(feature = "web")]
pub mod web;
