//! JSON frame codec
//!
//! Every text frame is `{"event": <name>, "data": <payload>}`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::application::ports::ChannelInput;
use crate::domain::{AlertResolved, ChannelError, NewAlert, User};
use crate::shared::types::payload_text;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// First frame on a fresh connection.
    pub fn auth(token: &str) -> Self {
        Self::new("auth", json!({ "token": token }))
    }
}

/// Decode one text frame. Unknown events and malformed payloads are
/// logged and skipped.
pub fn decode_frame(text: &str) -> Option<ChannelInput> {
    let frame: Frame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "Malformed realtime frame");
            return None;
        }
    };

    let input = match frame.event.as_str() {
        "connect" => ChannelInput::Connect,
        "connected" => ChannelInput::Connected {
            user: frame
                .data
                .get("user")
                .cloned()
                .and_then(|u| serde_json::from_value::<User>(u).ok()),
        },
        "disconnect" => ChannelInput::Disconnect {
            reason: payload_text(&frame.data).unwrap_or_else(|| "server disconnect".to_string()),
        },
        "connect_error" => ChannelInput::ConnectError(connect_error(&frame.data)),
        "error" => ChannelInput::ServerError(frame.data),
        "new_alert" => ChannelInput::NewAlert(NewAlert::new(frame.data)),
        "alert_resolved" => match serde_json::from_value::<AlertResolved>(frame.data) {
            Ok(resolved) => ChannelInput::AlertResolved(resolved),
            Err(e) => {
                warn!(error = %e, "Malformed alert_resolved payload");
                return None;
            }
        },
        other => {
            debug!(event = other, "Ignoring unknown realtime event");
            return None;
        }
    };
    Some(input)
}

/// Split a `connect_error` payload into auth vs transport.
pub fn connect_error(data: &Value) -> ChannelError {
    ChannelError::from_payload(data, "connection error")
}
