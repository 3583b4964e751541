//! Authenticated client sessions.

pub mod state;
pub mod store;

pub use state::{Session, SessionPhase};
pub use store::{join_sweeper, SessionStore};
