//! HTTP transport: command endpoint, event stream, and health check.

pub mod framing;
pub mod sse;

pub use sse::{ServerState, SseTransport, SESSION_HEADER};
