//! Events emitted on a session's push stream.

use serde_json::{json, Value};

use crate::types::{HeartbeatParams, OutboundMessage, HEARTBEAT_METHOD};

/// One server-sent event: a name and a JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    pub kind: EventKind,
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Connected,
    Message,
    Heartbeat,
    Error,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Connected => "connected",
            EventKind::Message => "message",
            EventKind::Heartbeat => "heartbeat",
            EventKind::Error => "error",
        }
    }
}

impl StreamEvent {
    pub fn connected(session_id: &str) -> Self {
        Self {
            kind: EventKind::Connected,
            data: json!({ "session_id": session_id }),
        }
    }

    /// Wrap a queued message. Heartbeat notifications become `heartbeat`
    /// events; everything else is a `message` carrying the JSON-RPC envelope.
    pub fn from_outbound(message: &OutboundMessage) -> Result<Self, serde_json::Error> {
        if let OutboundMessage::Notification(n) = message {
            if n.method == HEARTBEAT_METHOD {
                return Ok(Self {
                    kind: EventKind::Heartbeat,
                    data: n.params.clone().unwrap_or_else(|| json!({})),
                });
            }
        }
        Ok(Self {
            kind: EventKind::Message,
            data: serde_json::to_value(message)?,
        })
    }

    pub fn heartbeat() -> Self {
        Self {
            kind: EventKind::Heartbeat,
            data: json!({ "timestamp": HeartbeatParams::now().timestamp }),
        }
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            kind: EventKind::Error,
            data: json!({ "error": message.to_string() }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    /// Render in `text/event-stream` framing.
    pub fn to_frame(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.name(), self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_format() {
        let frame = StreamEvent::connected("abc").to_frame();
        assert_eq!(frame, "event: connected\ndata: {\"session_id\":\"abc\"}\n\n");
    }

    #[test]
    fn test_heartbeat_notification_becomes_heartbeat_event() {
        let event = StreamEvent::from_outbound(&OutboundMessage::heartbeat()).unwrap();
        assert_eq!(event.kind, EventKind::Heartbeat);
        assert!(event.data["timestamp"].is_string());
    }

    #[test]
    fn test_response_becomes_message_event() {
        let response = OutboundMessage::Response(crate::types::JsonRpcResponse::new(
            crate::types::RequestId::from(7),
            json!({ "ok": true }),
        ));
        let event = StreamEvent::from_outbound(&response).unwrap();
        assert_eq!(event.name(), "message");
        assert_eq!(event.data["id"], 7);
        assert_eq!(event.data["result"]["ok"], true);
    }

    #[test]
    fn test_error_frame() {
        let frame = StreamEvent::error("failed to encode event").to_frame();
        assert_eq!(
            frame,
            "event: error\ndata: {\"error\":\"failed to encode event\"}\n\n"
        );
    }
}
