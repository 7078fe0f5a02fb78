//! Wire messages exchanged with the session layer.
//!
//! Every message travels as a JSON envelope `{ "event": <name>, "data": <payload> }`
//! with camelCase payload fields. Outbound messages serialize straight from
//! [`Outbound`]. Inbound messages are validated here, at the boundary, so the
//! rest of the engine only ever sees well-formed [`Inbound`] values. A message
//! that fails validation is reported as a [`ProtocolError`] and the caller
//! drops it.

#[cfg(test)]
#[path = "protocol_test.rs"]
mod protocol_test;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{HistoryEntry, Identity, Point, StrokeId, Tool, UserId, default_color, default_size};

/// Error returned when an inbound message cannot be turned into an [`Inbound`].
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A field the engine cannot work without is absent, null or empty.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    /// The envelope names an event this engine does not consume.
    #[error("unknown event `{0}`")]
    UnknownEvent(String),
    /// The payload does not have the expected shape.
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// One point of an in-progress stroke, as broadcast while drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawPayload {
    pub stroke_id: StrokeId,
    pub seq: u64,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_size")]
    pub size: f64,
    #[serde(default)]
    pub tool: Tool,
    pub user_id: UserId,
    /// `false` on the final update of a gesture.
    #[serde(default = "default_true")]
    pub is_drawing: bool,
    #[serde(default)]
    pub client_ts: f64,
}

/// A finished local stroke submitted for commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeCompletePayload {
    pub stroke_id: StrokeId,
    pub user_id: UserId,
    pub path: Vec<Point>,
    pub color: String,
    pub size: f64,
    pub tool: Tool,
}

/// Pointer position of one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPayload {
    pub user_id: UserId,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Session bootstrap sent once after joining a room.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitPayload {
    #[serde(rename = "self")]
    pub self_identity: Identity,
    #[serde(default)]
    pub users: Vec<Identity>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub room_id: Option<String>,
}

fn default_true() -> bool {
    true
}

// =============================================================================
// MESSAGES
// =============================================================================

/// Messages the engine sends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum Outbound {
    #[serde(rename = "draw")]
    Draw(DrawPayload),
    #[serde(rename = "strokeComplete")]
    StrokeComplete(StrokeCompletePayload),
    #[serde(rename = "undo")]
    Undo,
    #[serde(rename = "redo")]
    Redo,
    #[serde(rename = "clear-canvas")]
    ClearCanvas,
    #[serde(rename = "cursor")]
    Cursor(CursorPayload),
}

impl Outbound {
    /// Wire name of the event.
    #[must_use]
    pub fn event(&self) -> &'static str {
        match self {
            Self::Draw(_) => "draw",
            Self::StrokeComplete(_) => "strokeComplete",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::ClearCanvas => "clear-canvas",
            Self::Cursor(_) => "cursor",
        }
    }

    /// Encode as a JSON envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Messages the engine consumes.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Draw(DrawPayload),
    Cursor(CursorPayload),
    HistoryUpdate(Vec<HistoryEntry>),
    UserLeft { user_id: UserId },
    UserJoined(Identity),
    Init(InitPayload),
}

impl Inbound {
    /// Wire name of the event.
    #[must_use]
    pub fn event(&self) -> &'static str {
        match self {
            Self::Draw(_) => "draw",
            Self::Cursor(_) => "cursor",
            Self::HistoryUpdate(_) => "historyUpdate",
            Self::UserLeft { .. } => "user-left",
            Self::UserJoined(_) => "user-joined",
            Self::Init(_) => "init",
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

// =============================================================================
// PARSING
// =============================================================================

/// Validate an inbound `event` with its `data` payload.
///
/// # Errors
///
/// Returns [`ProtocolError::UnknownEvent`] for events the engine does not
/// consume, [`ProtocolError::MissingField`] when an identifying field is absent,
/// and [`ProtocolError::Json`] when the payload has the wrong shape.
pub fn parse_inbound(event: &str, data: &Value) -> Result<Inbound, ProtocolError> {
    match event {
        "draw" => {
            require_str(data, "strokeId")?;
            require(data, "seq")?;
            require_str(data, "userId")?;
            Ok(Inbound::Draw(DrawPayload::deserialize(data)?))
        }
        "cursor" => {
            require_str(data, "userId")?;
            Ok(Inbound::Cursor(CursorPayload::deserialize(data)?))
        }
        "historyUpdate" => Ok(Inbound::HistoryUpdate(Vec::<HistoryEntry>::deserialize(data)?)),
        "user-left" => {
            let user_id = require_str(data, "userId")?;
            Ok(Inbound::UserLeft { user_id: user_id.to_owned() })
        }
        "user-joined" => {
            require_str(data, "userId")?;
            Ok(Inbound::UserJoined(Identity::deserialize(data)?))
        }
        "init" => {
            require(data, "self")?;
            Ok(Inbound::Init(InitPayload::deserialize(data)?))
        }
        other => Err(ProtocolError::UnknownEvent(other.to_owned())),
    }
}

/// Validate a complete JSON envelope.
///
/// # Errors
///
/// Same as [`parse_inbound`], plus [`ProtocolError::Json`] when `text` is not an envelope.
pub fn parse_envelope(text: &str) -> Result<Inbound, ProtocolError> {
    let envelope: Envelope = serde_json::from_str(text)?;
    parse_inbound(&envelope.event, &envelope.data)
}

fn require<'a>(data: &'a Value, field: &'static str) -> Result<&'a Value, ProtocolError> {
    match data.get(field) {
        Some(value) if !value.is_null() => Ok(value),
        _ => Err(ProtocolError::MissingField(field)),
    }
}

fn require_str<'a>(data: &'a Value, field: &'static str) -> Result<&'a str, ProtocolError> {
    match require(data, field)?.as_str() {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(ProtocolError::MissingField(field)),
    }
}
