//! Value types shared by every component: points, strokes, cursors and identities.
//!
//! Nothing here has behavior beyond construction and small accessors. Live
//! strokes are owned by [`crate::store::LiveStrokeStore`], committed strokes by
//! the history the server sends, and cursors by [`crate::cursor::CursorTracker`].

#[cfg(test)]
#[path = "model_test.rs"]
mod model_test;

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::consts::{DEFAULT_BRUSH_SIZE, DEFAULT_COLOR, STROKE_ID_SUFFIX_LEN};

/// Identifier of a participant, assigned by the presence collaborator.
pub type UserId = String;

/// Globally unique identifier of one stroke.
///
/// Generated ids concatenate the author's user id, a millisecond timestamp and
/// a short random suffix. They are never reused or reassigned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrokeId(String);

impl StrokeId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Mint a fresh id for a stroke authored by `user_id` at `unix_ms`.
    #[must_use]
    pub fn generate(user_id: &str, unix_ms: i64) -> Self {
        let suffix: String = uuid::Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(STROKE_ID_SUFFIX_LEN)
            .collect();
        Self(format!("{user_id}-{unix_ms}-{suffix}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for StrokeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A position on a drawing surface, in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A point of an in-progress stroke, tagged with its author-assigned sequence number.
///
/// `seq` is the only ordering key for rebuilding a path. It says nothing about
/// network arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeqPoint {
    pub seq: u64,
    pub x: f64,
    pub y: f64,
}

impl SeqPoint {
    #[must_use]
    pub fn new(seq: u64, x: f64, y: f64) -> Self {
        Self { seq, x, y }
    }

    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Drawing tool a stroke was made with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Brush,
    /// Paints with the eraser color instead of the stroke's own color.
    Eraser,
}

impl Tool {
    /// Color actually painted for a stroke with the given recorded `color`.
    #[must_use]
    pub fn ink<'a>(self, color: &'a str, eraser_color: &'a str) -> &'a str {
        match self {
            Self::Brush => color,
            Self::Eraser => eraser_color,
        }
    }
}

/// Stroke metadata that stays fixed for the lifetime of a drawing gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeMeta {
    pub author: UserId,
    pub color: String,
    pub size: f64,
    pub tool: Tool,
}

/// An in-progress stroke tracked for preview.
///
/// `points` is kept in `seq` order; points sharing a `seq` stay in the order
/// they were received.
#[derive(Debug, Clone)]
pub struct LiveStroke {
    pub stroke_id: StrokeId,
    pub meta: StrokeMeta,
    /// Store-local counter recording when the stroke was first seen.
    pub opened: u64,
    points: Vec<SeqPoint>,
}

impl LiveStroke {
    #[must_use]
    pub fn new(stroke_id: StrokeId, meta: StrokeMeta, opened: u64) -> Self {
        Self { stroke_id, meta, opened, points: Vec::new() }
    }

    /// Insert a point after every point with a lower or equal `seq`.
    pub fn insert(&mut self, point: SeqPoint) {
        let at = self.points.partition_point(|p| p.seq <= point.seq);
        self.points.insert(at, point);
    }

    /// Points in ascending `seq` order.
    #[must_use]
    pub fn points(&self) -> &[SeqPoint] {
        &self.points
    }
}

/// A stroke the server has committed to history. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedStroke {
    pub stroke_id: StrokeId,
    #[serde(default, rename = "userId")]
    pub author: UserId,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_size")]
    pub size: f64,
    #[serde(default)]
    pub tool: Tool,
    pub path: Vec<Point>,
    #[serde(default)]
    pub server_ts: Option<f64>,
}

/// One element of an authoritative history sequence.
///
/// Entries the engine cannot read still occupy their slot so the watermark
/// stays aligned with the server's ordering; they paint nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEntry {
    Stroke(CommittedStroke),
    Malformed,
}

impl HistoryEntry {
    /// Read one entry, falling back to [`HistoryEntry::Malformed`] when it has
    /// no path or no usable stroke id.
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Self {
        match CommittedStroke::deserialize(value) {
            Ok(stroke) if stroke.stroke_id.as_str().is_empty() => {
                tracing::debug!("skipping history entry with an empty stroke id");
                Self::Malformed
            }
            Ok(stroke) => Self::Stroke(stroke),
            Err(err) => {
                tracing::debug!(%err, "skipping malformed history entry");
                Self::Malformed
            }
        }
    }

    #[must_use]
    pub fn stroke(&self) -> Option<&CommittedStroke> {
        match self {
            Self::Stroke(stroke) => Some(stroke),
            Self::Malformed => None,
        }
    }

    #[must_use]
    pub fn stroke_id(&self) -> Option<&StrokeId> {
        self.stroke().map(|s| &s.stroke_id)
    }
}

impl From<CommittedStroke> for HistoryEntry {
    fn from(stroke: CommittedStroke) -> Self {
        Self::Stroke(stroke)
    }
}

impl<'de> Deserialize<'de> for HistoryEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

/// Latest known pointer position of a remote participant.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub user_id: UserId,
    pub x: f64,
    pub y: f64,
    pub color: Option<String>,
    pub username: Option<String>,
}

/// A participant as described by the presence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default = "default_color")]
    pub color: String,
}

pub(crate) fn default_color() -> String {
    DEFAULT_COLOR.to_owned()
}

pub(crate) fn default_size() -> f64 {
    DEFAULT_BRUSH_SIZE
}
