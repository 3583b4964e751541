//! Server-initiated notification types.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::message::{JsonRpcNotification, OutboundMessage};

pub const HEARTBEAT_METHOD: &str = "heartbeat";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatParams {
    pub timestamp: String,
}

impl HeartbeatParams {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl OutboundMessage {
    /// A `heartbeat` notification stamped with the current time.
    pub fn heartbeat() -> Self {
        let params = HeartbeatParams::now();
        OutboundMessage::Notification(JsonRpcNotification::new(
            HEARTBEAT_METHOD.to_string(),
            Some(json!({ "timestamp": params.timestamp })),
        ))
    }
}
