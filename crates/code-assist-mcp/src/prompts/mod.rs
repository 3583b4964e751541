//! MCP prompt templates.

pub mod explain_code;
pub mod registry;
pub mod review_code;

pub use explain_code::ExplainCode;
pub use registry::{PromptHandler, PromptRegistry};
pub use review_code::ReviewCode;
