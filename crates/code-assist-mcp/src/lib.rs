//! code-assist MCP server: authenticated JSON-RPC tools and resources over
//! HTTP, with per-session event streams for asynchronous results.

pub mod auth;
pub mod config;
pub mod prompts;
pub mod protocol;
pub mod registry;
pub mod resources;
pub mod session;
pub mod stream;
pub mod tools;
pub mod transport;
pub mod types;

pub use auth::{Claims, TokenValidator};
pub use config::ServerConfig;
pub use protocol::ProtocolHandler;
pub use registry::CapabilityRegistry;
pub use session::{Session, SessionStore};
pub use transport::{ServerState, SseTransport};
