//! Decoding of JSON-RPC request bodies.

use serde_json::Value;

use crate::types::{JsonRpcMessage, McpError, McpResult, RequestId};

/// Parse a request body as a single JSON-RPC message.
///
/// Bytes that are not JSON are a parse error; JSON that is not a
/// JSON-RPC message is an invalid request.
pub fn parse_message(body: &[u8]) -> McpResult<JsonRpcMessage> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(McpError::ParseError("Empty message".to_string()));
    }

    let value: Value =
        serde_json::from_slice(body).map_err(|e| McpError::ParseError(e.to_string()))?;
    if value.is_array() {
        return Err(McpError::InvalidRequest(
            "Batch requests are not supported".to_string(),
        ));
    }

    serde_json::from_value(value)
        .map_err(|_| McpError::InvalidRequest("Not a JSON-RPC 2.0 message".to_string()))
}

/// Best-effort request id from a body that failed to parse as a message,
/// so the error reply can still be correlated.
pub fn request_id_hint(body: &[u8]) -> RequestId {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("id").cloned())
        .and_then(|id| serde_json::from_value(id).ok())
        .unwrap_or(RequestId::Null)
}
