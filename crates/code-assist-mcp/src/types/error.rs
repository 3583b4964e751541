//! Error types and JSON-RPC error codes for the MCP server.

use serde_json::json;

use super::message::{JsonRpcError, RequestId};
use crate::auth::AuthError;

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Server-defined error codes (JSON-RPC reserves -32000 to -32099).
pub mod mcp_error_codes {
    /// Missing or invalid bearer token, or a session the caller may not use.
    pub const AUTHENTICATION_ERROR: i32 = -32000;
    /// A capability method was called before `initialize`.
    pub const NOT_INITIALIZED: i32 = -32002;
}

/// All errors that can occur in the MCP server.
#[derive(thiserror::Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    #[error("Server not initialized: {0} called before initialize")]
    NotInitialized(String),

    #[error("Missing session ID")]
    SessionRequired,

    #[error("Invalid session")]
    SessionInvalid,

    #[error("Session already has an open stream")]
    StreamBusy,

    #[error("Session event queue is full")]
    QueueFull,

    #[error("Session event queue is closed")]
    QueueClosed,

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl McpError {
    pub fn code(&self) -> i32 {
        use error_codes::*;
        use mcp_error_codes::*;
        match self {
            McpError::ParseError(_) => PARSE_ERROR,
            McpError::InvalidRequest(_) | McpError::SessionRequired | McpError::StreamBusy => {
                INVALID_REQUEST
            }
            McpError::MethodNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidParams(_)
            | McpError::ToolNotFound(_)
            | McpError::ResourceNotFound(_)
            | McpError::PromptNotFound(_) => INVALID_PARAMS,
            McpError::NotInitialized(_) => NOT_INITIALIZED,
            McpError::SessionInvalid | McpError::Auth(_) => AUTHENTICATION_ERROR,
            McpError::InternalError(_)
            | McpError::QueueFull
            | McpError::QueueClosed
            | McpError::Config(_)
            | McpError::Transport(_)
            | McpError::Io(_) => INTERNAL_ERROR,
        }
    }

    /// HTTP status the transport should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            McpError::Auth(_) | McpError::SessionInvalid => 401,
            McpError::StreamBusy => 409,
            McpError::InternalError(_)
            | McpError::QueueFull
            | McpError::QueueClosed
            | McpError::Config(_)
            | McpError::Transport(_)
            | McpError::Io(_) => 500,
            _ => 400,
        }
    }

    /// Whether the message is safe to show to a caller. Internal failures
    /// are reported with a fixed message; their detail stays in the logs.
    pub fn is_internal(&self) -> bool {
        self.code() == error_codes::INTERNAL_ERROR
    }

    fn public_message(&self) -> String {
        match self {
            McpError::Auth(_) => "Authentication error".to_string(),
            e if e.is_internal() => "Internal error".to_string(),
            e => e.to_string(),
        }
    }

    pub fn to_json_rpc_error(&self, id: RequestId) -> JsonRpcError {
        let error = JsonRpcError::new(id, self.code(), self.public_message());
        match self {
            McpError::Auth(auth) => error.with_data(json!({ "reason": auth.reason() })),
            _ => error,
        }
    }
}

/// Failure reported by a tool, resource, or prompt handler.
#[derive(thiserror::Error, Debug)]
pub enum HandlerError {
    /// The caller's arguments were rejected; safe to echo back.
    #[error("{0}")]
    InvalidArguments(String),

    /// The handler itself failed; never echoed to the caller.
    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    /// Convert into a protocol error, tagging internal failures with the
    /// handler's name for the logs.
    pub fn into_mcp(self, handler: &str) -> McpError {
        match self {
            HandlerError::InvalidArguments(msg) => McpError::InvalidParams(msg),
            HandlerError::Failed(msg) => McpError::InternalError(format!("{handler}: {msg}")),
        }
    }
}

impl From<code_assist::AssistError> for HandlerError {
    fn from(e: code_assist::AssistError) -> Self {
        HandlerError::InvalidArguments(e.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        HandlerError::Failed(e.to_string())
    }
}

pub type McpResult<T> = Result<T, McpError>;
