//! JSON-RPC 2.0 envelope checks.

use serde_json::Value;

use crate::types::{JsonRpcRequest, McpError, McpResult, JSONRPC_VERSION};

/// Method names with this prefix are reserved by JSON-RPC itself.
const RESERVED_PREFIX: &str = "rpc.";

/// Validate that a request envelope is well-formed.
pub fn validate_request(request: &JsonRpcRequest) -> McpResult<()> {
    validate_envelope(&request.jsonrpc, &request.method, request.params.as_ref())
}

pub(crate) fn validate_envelope(
    version: &str,
    method: &str,
    params: Option<&Value>,
) -> McpResult<()> {
    if version != JSONRPC_VERSION {
        return Err(McpError::InvalidRequest(format!(
            "Expected jsonrpc version \"{JSONRPC_VERSION}\", got \"{version}\""
        )));
    }

    if method.is_empty() {
        return Err(McpError::InvalidRequest(
            "Method name must not be empty".to_string(),
        ));
    }

    if method.starts_with(RESERVED_PREFIX) {
        return Err(McpError::MethodNotFound(method.to_string()));
    }

    match params {
        None | Some(Value::Object(_)) | Some(Value::Array(_)) | Some(Value::Null) => Ok(()),
        Some(_) => Err(McpError::InvalidRequest(
            "params must be an object or an array".to_string(),
        )),
    }
}
