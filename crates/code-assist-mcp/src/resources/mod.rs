//! MCP resource implementations.

pub mod api_docs;
pub mod registry;

pub use api_docs::ApiDocs;
pub use registry::{ResourceHandler, ResourceRegistry};
