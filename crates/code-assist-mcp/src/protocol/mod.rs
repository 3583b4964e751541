//! MCP protocol handling: envelope validation, session phases, and dispatch.

pub mod handler;
pub mod negotiation;
pub mod validator;

pub use handler::{ProtocolHandler, Reply};
