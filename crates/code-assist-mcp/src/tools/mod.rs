//! MCP tool implementations.

pub mod analyze_code;
pub mod generate_code;
pub mod registry;

pub use analyze_code::AnalyzeCode;
pub use generate_code::GenerateCode;
pub use registry::{ToolHandler, ToolRegistry};
