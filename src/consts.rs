//! Shared defaults for the engine.

// ── Emission ────────────────────────────────────────────────────

/// Throttle window for outbound `draw` point updates, in milliseconds.
pub const DRAW_THROTTLE_MS: f64 = 20.0;

/// Throttle window for outbound `cursor` updates, in milliseconds.
pub const CURSOR_THROTTLE_MS: f64 = 20.0;

// ── Ink ─────────────────────────────────────────────────────────

/// Color every eraser stroke paints with, on every layer.
pub const ERASER_COLOR: &str = "#fff";

/// Brush color before the participant picks one or is assigned one.
pub const DEFAULT_COLOR: &str = "#000000";

/// Brush width before the participant changes it.
pub const DEFAULT_BRUSH_SIZE: f64 = 5.0;

// ── Cursor layer ────────────────────────────────────────────────

/// Radius of a remote cursor marker, in surface pixels.
pub const CURSOR_MARKER_RADIUS: f64 = 6.0;

/// Opacity of a remote cursor marker.
pub const CURSOR_MARKER_ALPHA: f64 = 0.7;

/// Marker fill when the cursor carries no color.
pub const CURSOR_FALLBACK_MARKER_COLOR: &str = "rgba(0,0,0,0.6)";

/// Label fill when the cursor carries no color.
pub const CURSOR_FALLBACK_LABEL_COLOR: &str = "#000";

/// CSS font used for cursor labels.
pub const CURSOR_LABEL_FONT: &str = "12px Arial";

/// Label offset from the marker center, x then y.
pub const CURSOR_LABEL_OFFSET: (f64, f64) = (10.0, 3.0);

// ── Identity ────────────────────────────────────────────────────

/// Length of the random suffix appended to generated stroke ids.
pub const STROKE_ID_SUFFIX_LEN: usize = 4;

/// User id stamped on local strokes before the presence layer assigns one.
pub const FALLBACK_USER_ID: &str = "local";
