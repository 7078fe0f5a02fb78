//! Browser bindings: canvas-backed surfaces, frame loops and the JS-facing handle.
//!
//! The host page owns three stacked canvases (committed, live preview,
//! cursors) and a socket. It hands them to [`Sketchboard`], forwards every
//! inbound socket message as `(event, json)`, and forwards pointer events.
//! Everything else happens here: both render layers run on self-rescheduling
//! `requestAnimationFrame` loops and trailing throttled emissions are driven by
//! one re-armed timeout.

use std::cell::{Cell, RefCell};
use std::f64::consts::TAU;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use js_sys::Date;
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::{JsCast, closure::Closure};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::config::EngineConfig;
use crate::emit::Transport;
use crate::engine::EngineCore;
use crate::input::{ClientRect, map_client_point};
use crate::model::Point;
use crate::protocol::Outbound;
use crate::surface::{MarkerSurface, Surface, SurfaceError};

/// Route `tracing` output to the browser console and panics to `console.error`.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    if let Err(err) = console_log::init_with_level(log::Level::Debug) {
        web_sys::console::warn_1(&JsValue::from_str(&format!("logger already set: {err}")));
    }
}

fn js_err(err: JsValue) -> SurfaceError {
    SurfaceError::Backend(format!("{err:?}"))
}

// =============================================================================
// SURFACE
// =============================================================================

/// A [`Surface`] drawing into one `<canvas>` element's 2D context.
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    /// Acquire the 2D context of `canvas`.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::Backend`] if the element has no 2D context.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, SurfaceError> {
        let ctx = canvas
            .get_context("2d")
            .map_err(js_err)?
            .ok_or_else(|| SurfaceError::Backend("2d context unavailable".into()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| SurfaceError::Backend("context is not a CanvasRenderingContext2d".into()))?;
        ctx.set_line_cap("round");
        ctx.set_line_join("round");
        Ok(Self { canvas, ctx })
    }

    /// On-screen box of the element, for pointer mapping.
    #[must_use]
    pub fn client_rect(&self) -> ClientRect {
        let rect = self.canvas.get_bounding_client_rect();
        ClientRect { left: rect.left(), top: rect.top(), width: rect.width(), height: rect.height() }
    }
}

impl Surface for CanvasSurface {
    fn size(&self) -> (f64, f64) {
        (f64::from(self.canvas.width()), f64::from(self.canvas.height()))
    }

    fn stroke_segment(&mut self, from: Point, to: Point, color: &str, width: f64) -> Result<(), SurfaceError> {
        self.ctx.set_stroke_style_str(color);
        self.ctx.set_line_width(width);
        self.ctx.begin_path();
        self.ctx.move_to(from.x, from.y);
        self.ctx.line_to(to.x, to.y);
        self.ctx.stroke();
        Ok(())
    }

    fn clear_rect(&mut self, width: f64, height: f64) {
        self.ctx.clear_rect(0.0, 0.0, width, height);
    }
}

impl MarkerSurface for CanvasSurface {
    fn fill_disc(&mut self, center: Point, radius: f64, color: &str, alpha: f64) -> Result<(), SurfaceError> {
        self.ctx.begin_path();
        self.ctx.set_global_alpha(alpha);
        self.ctx.set_fill_style_str(color);
        let arc = self.ctx.arc(center.x, center.y, radius, 0.0, TAU);
        if arc.is_ok() {
            self.ctx.fill();
        }
        self.ctx.set_global_alpha(1.0);
        arc.map_err(js_err)
    }

    fn fill_label(&mut self, text: &str, at: Point, color: &str, font: &str) -> Result<(), SurfaceError> {
        self.ctx.set_font(font);
        self.ctx.set_fill_style_str(color);
        self.ctx.fill_text(text, at.x, at.y).map_err(js_err)
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// [`Transport`] that hands JSON envelopes to a JS callback.
pub struct JsTransport {
    send: js_sys::Function,
    ready: bool,
}

impl Transport for JsTransport {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn send(&mut self, message: &Outbound) {
        let json = match message.to_json() {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(event = message.event(), %err, "failed to encode outbound message");
                return;
            }
        };
        if let Err(err) = self.send.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
            tracing::debug!(event = message.event(), ?err, "send callback threw");
        }
    }
}

// =============================================================================
// HANDLE
// =============================================================================

struct Shared {
    core: EngineCore<JsTransport>,
    committed: Option<CanvasSurface>,
    live: Option<CanvasSurface>,
    cursor: Option<CanvasSurface>,
}

fn attach(layer: &'static str, canvas: Option<HtmlCanvasElement>) -> Option<CanvasSurface> {
    let canvas = canvas?;
    match CanvasSurface::new(canvas) {
        Ok(surface) => Some(surface),
        Err(err) => {
            tracing::warn!(layer, %err, "canvas layer unavailable");
            None
        }
    }
}

/// JS-facing engine handle.
#[wasm_bindgen]
pub struct Sketchboard {
    shared: Rc<RefCell<Shared>>,
    timer_armed: Rc<Cell<bool>>,
}

#[wasm_bindgen]
impl Sketchboard {
    /// Bind the engine to its canvases and outbound `send(json)` callback.
    ///
    /// `config_json` optionally overrides [`EngineConfig`] defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(
        committed: Option<HtmlCanvasElement>,
        live: Option<HtmlCanvasElement>,
        cursor: Option<HtmlCanvasElement>,
        send: js_sys::Function,
        config_json: Option<String>,
    ) -> Result<Sketchboard, JsValue> {
        let config = match config_json.as_deref() {
            Some(raw) => EngineConfig::from_json(raw).map_err(|err| JsValue::from_str(&err.to_string()))?,
            None => EngineConfig::default(),
        };
        let shared = Shared {
            core: EngineCore::new(config, JsTransport { send, ready: false }),
            committed: attach("committed", committed),
            live: attach("live", live),
            cursor: attach("cursor", cursor),
        };
        Ok(Self { shared: Rc::new(RefCell::new(shared)), timer_armed: Rc::new(Cell::new(false)) })
    }

    /// Start both frame loops.
    pub fn start(&self) {
        start_loop(Rc::clone(&self.shared), preview_frame);
        start_loop(Rc::clone(&self.shared), cursor_frame);
    }

    /// Report whether the socket is connected. Emissions while disconnected are dropped.
    #[wasm_bindgen(js_name = setConnected)]
    pub fn set_connected(&self, ready: bool) {
        self.shared
            .borrow_mut()
            .core
            .emitter_mut()
            .transport_mut()
            .ready = ready;
    }

    /// Apply one inbound socket message whose payload is JSON text.
    #[wasm_bindgen(js_name = handleMessage)]
    pub fn handle_message(&self, event: &str, data_json: &str) {
        let data: Value = match serde_json::from_str(data_json) {
            Ok(data) => data,
            Err(err) => {
                tracing::debug!(event, %err, "dropping unparseable payload");
                return;
            }
        };
        let mut shared = self.shared.borrow_mut();
        let Shared { core, committed, .. } = &mut *shared;
        let surface = committed.as_mut().map(|s| s as &mut dyn Surface);
        if let Ok(effect) = core.handle_message(event, &data, surface) {
            tracing::trace!(event, ?effect, "inbound applied");
        }
    }

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&self, client_x: f64, client_y: f64) {
        let pos = self.surface_point(client_x, client_y);
        self.shared.borrow_mut().core.pen_down(Date::now(), pos);
        self.arm_timer();
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&self, client_x: f64, client_y: f64) {
        let pos = self.surface_point(client_x, client_y);
        self.shared.borrow_mut().core.pen_move(Date::now(), pos);
        self.arm_timer();
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&self) {
        self.shared.borrow_mut().core.pen_up(Date::now());
        self.arm_timer();
    }

    #[wasm_bindgen(js_name = setColor)]
    pub fn set_color(&self, color: &str) {
        self.shared.borrow_mut().core.set_color(color);
    }

    #[wasm_bindgen(js_name = setBrushSize)]
    pub fn set_brush_size(&self, size: f64) {
        self.shared.borrow_mut().core.set_brush_size(size);
    }

    #[wasm_bindgen(js_name = toggleEraser)]
    pub fn toggle_eraser(&self) -> bool {
        self.shared.borrow_mut().core.toggle_eraser()
    }

    pub fn undo(&self) {
        self.shared.borrow_mut().core.undo();
    }

    pub fn redo(&self) {
        self.shared.borrow_mut().core.redo();
    }

    #[wasm_bindgen(js_name = clearCanvas)]
    pub fn clear_canvas(&self) {
        self.shared.borrow_mut().core.clear_canvas();
    }

    /// Call after resizing the canvases. Resizing wipes them, so the committed
    /// layer is repainted from the last history right away.
    pub fn resized(&self) {
        let mut shared = self.shared.borrow_mut();
        let Shared { core, committed, .. } = &mut *shared;
        let surface = committed.as_mut().map(|s| s as &mut dyn Surface);
        let outcome = core.repaint_committed(surface);
        tracing::debug!(?outcome, "committed layer repainted after resize");
    }
}

impl Sketchboard {
    fn surface_point(&self, client_x: f64, client_y: f64) -> Point {
        let client = Point::new(client_x, client_y);
        match self.shared.borrow().committed.as_ref() {
            Some(surface) => map_client_point(client, surface.client_rect(), surface.size()),
            None => client,
        }
    }

    fn arm_timer(&self) {
        arm_timer(&self.shared, &self.timer_armed);
    }
}

// =============================================================================
// LOOPS
// =============================================================================

fn preview_frame(shared: &mut Shared) {
    let surface = shared.live.as_mut().map(|s| s as &mut dyn Surface);
    shared.core.render_preview(surface);
}

fn cursor_frame(shared: &mut Shared) {
    let surface = shared.cursor.as_mut().map(|s| s as &mut dyn MarkerSurface);
    shared.core.render_cursors(surface);
}

fn request_frame(cb: &Closure<dyn FnMut(f64)>) -> bool {
    let Some(window) = web_sys::window() else {
        return false;
    };
    match window.request_animation_frame(cb.as_ref().unchecked_ref()) {
        Ok(_) => true,
        Err(err) => {
            tracing::warn!(?err, "requestAnimationFrame failed");
            false
        }
    }
}

/// Run `frame` on every animation frame for the life of the page.
fn start_loop(shared: Rc<RefCell<Shared>>, frame: fn(&mut Shared)) {
    let holder: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
    let holder_for_cb = Rc::clone(&holder);
    let cb = Closure::wrap(Box::new(move |_ts: f64| {
        frame(&mut shared.borrow_mut());
        if let Some(cb) = holder_for_cb.borrow().as_ref() {
            request_frame(cb);
        }
    }) as Box<dyn FnMut(f64)>);

    if request_frame(&cb) {
        *holder.borrow_mut() = Some(cb);
    }
}

/// Schedule one timeout for the engine's next throttle deadline, if not already pending.
fn arm_timer(shared: &Rc<RefCell<Shared>>, armed: &Rc<Cell<bool>>) {
    if armed.get() {
        return;
    }
    let Some(due_ms) = shared.borrow().core.next_deadline() else {
        return;
    };
    armed.set(true);

    let delay = delay_ms(due_ms - Date::now());
    let shared = Rc::clone(shared);
    let armed = Rc::clone(armed);
    Timeout::new(delay, move || {
        armed.set(false);
        shared.borrow_mut().core.poll_timers(Date::now());
        arm_timer(&shared, &armed);
    })
    .forget();
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn delay_ms(remaining: f64) -> u32 {
    remaining.max(0.0).ceil().min(f64::from(u32::MAX)) as u32
}
