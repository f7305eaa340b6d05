//! Browse endpoint messages
//!
//! Inbound control messages set the subscriber's viewport; outbound messages
//! carry either the visible buses or a list of errors.

use serde::Serialize;
use serde_json::Value;

use super::coerce_number;
use crate::positions::Position;
use crate::session::Viewport;

/// Control message accepted from a browser
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlMessage {
    /// Replace the session's viewport
    NewBounds(Viewport),
}

/// Reason a control message was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlError {
    /// Frame is not JSON
    InvalidJson,
    /// No `msgType` field
    MissingMsgType,
    /// `msgType` is something other than `newBounds`
    UnsupportedMsgType,
    /// `newBounds` without four numeric bounds in `data`
    InvalidBounds,
}

impl ControlError {
    /// Text sent back to the browser in the `errors` array
    pub fn message(&self) -> &'static str {
        match self {
            ControlError::InvalidJson => "Requires valid JSON",
            ControlError::MissingMsgType => "Requires msgType specified",
            ControlError::UnsupportedMsgType => "Unsupported msgType",
            ControlError::InvalidBounds => {
                "Requires numeric bounds: south_lat, north_lat, west_lng, east_lng"
            }
        }
    }
}

impl std::fmt::Display for ControlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Message sent to a browser
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "msgType")]
pub enum ServerMessage {
    /// Buses currently inside the viewport
    Buses { buses: Vec<Position> },
    /// Why the last control message was refused
    Errors { errors: Vec<String> },
}

impl ServerMessage {
    /// Build an `Errors` message for a single refusal
    pub fn error(error: ControlError) -> Self {
        ServerMessage::Errors {
            errors: vec![error.message().to_owned()],
        }
    }
}

/// Parse one inbound browse frame
pub fn parse_control(payload: &[u8]) -> Result<ControlMessage, ControlError> {
    let value: Value = serde_json::from_slice(payload).map_err(|_| ControlError::InvalidJson)?;

    let msg_type = match value.get("msgType") {
        None | Some(Value::Null) => return Err(ControlError::MissingMsgType),
        Some(msg_type) => msg_type,
    };

    match msg_type.as_str() {
        Some("newBounds") => parse_bounds(value.get("data")).map(ControlMessage::NewBounds),
        _ => Err(ControlError::UnsupportedMsgType),
    }
}

fn parse_bounds(data: Option<&Value>) -> Result<Viewport, ControlError> {
    let data = data.ok_or(ControlError::InvalidBounds)?;
    let field = |name: &str| {
        data.get(name)
            .and_then(coerce_number)
            .ok_or(ControlError::InvalidBounds)
    };

    Ok(Viewport {
        south_lat: field("south_lat")?,
        north_lat: field("north_lat")?,
        west_lng: field("west_lng")?,
        east_lng: field("east_lng")?,
    })
}
