//! Engine configuration with compiled-in defaults and environment/JSON overrides.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::Deserialize;

use crate::consts::{
    CURSOR_FALLBACK_LABEL_COLOR, CURSOR_FALLBACK_MARKER_COLOR, CURSOR_LABEL_FONT, CURSOR_LABEL_OFFSET,
    CURSOR_MARKER_ALPHA, CURSOR_MARKER_RADIUS, CURSOR_THROTTLE_MS, DEFAULT_BRUSH_SIZE, DEFAULT_COLOR,
    DRAW_THROTTLE_MS, ERASER_COLOR,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// How the history renderer decides that an update only appends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HistoryCheck {
    /// Any update at least as long as the watermark is an append.
    Length,
    /// Also require the already-painted prefix to carry the same stroke ids.
    #[default]
    PrefixIds,
}

impl HistoryCheck {
    /// Parse the `length` / `prefix-ids` spelling used by env vars and the CLI.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for any other spelling.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw {
            "length" => Ok(Self::Length),
            "prefix-ids" => Ok(Self::PrefixIds),
            other => Err(ConfigError::InvalidValue { key: "history_check", value: other.to_owned() }),
        }
    }
}

/// Styling of the remote cursor layer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CursorStyle {
    pub radius: f64,
    pub alpha: f64,
    pub font: String,
    pub label_offset: (f64, f64),
    pub fallback_marker_color: String,
    pub fallback_label_color: String,
}

impl Default for CursorStyle {
    fn default() -> Self {
        Self {
            radius: CURSOR_MARKER_RADIUS,
            alpha: CURSOR_MARKER_ALPHA,
            font: CURSOR_LABEL_FONT.to_owned(),
            label_offset: CURSOR_LABEL_OFFSET,
            fallback_marker_color: CURSOR_FALLBACK_MARKER_COLOR.to_owned(),
            fallback_label_color: CURSOR_FALLBACK_LABEL_COLOR.to_owned(),
        }
    }
}

/// Tunables for [`crate::engine::EngineCore`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub draw_throttle_ms: f64,
    pub cursor_throttle_ms: f64,
    pub eraser_color: String,
    pub default_color: String,
    pub default_brush_size: f64,
    pub history_check: HistoryCheck,
    pub cursor: CursorStyle,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            draw_throttle_ms: DRAW_THROTTLE_MS,
            cursor_throttle_ms: CURSOR_THROTTLE_MS,
            eraser_color: ERASER_COLOR.to_owned(),
            default_color: DEFAULT_COLOR.to_owned(),
            default_brush_size: DEFAULT_BRUSH_SIZE,
            history_check: HistoryCheck::default(),
            cursor: CursorStyle::default(),
        }
    }
}

impl EngineConfig {
    /// Build config from defaults overridden by environment variables.
    ///
    /// Optional:
    /// - `SKETCH_DRAW_THROTTLE_MS`: default 20
    /// - `SKETCH_CURSOR_THROTTLE_MS`: default 20
    /// - `SKETCH_ERASER_COLOR`: default `#fff`
    /// - `SKETCH_HISTORY_CHECK`: `prefix-ids` (default) or `length`
    ///
    /// Unparseable numbers fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unknown history check.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| match std::env::var(key) {
            Ok(value) => Some(value),
            Err(_) => None,
        })
    }

    /// Build config from a JSON object. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] when the document does not match the schema.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let history_check = match lookup("SKETCH_HISTORY_CHECK") {
            Some(raw) => HistoryCheck::parse(raw.trim())?,
            None => defaults.history_check,
        };
        Ok(Self {
            draw_throttle_ms: env_parse(&lookup, "SKETCH_DRAW_THROTTLE_MS", defaults.draw_throttle_ms),
            cursor_throttle_ms: env_parse(&lookup, "SKETCH_CURSOR_THROTTLE_MS", defaults.cursor_throttle_ms),
            eraser_color: lookup("SKETCH_ERASER_COLOR").unwrap_or(defaults.eraser_color),
            history_check,
            ..defaults
        })
    }
}

fn env_parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match lookup(key).map(|v| v.trim().parse::<T>()) {
        Some(Ok(value)) => value,
        _ => default,
    }
}
