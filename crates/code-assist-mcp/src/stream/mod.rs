//! Per-session push channel: outbound queue, heartbeats, and the event stream.

pub mod channel;
pub mod event;

pub use channel::{open, EventStream};
pub use event::{EventKind, StreamEvent};
