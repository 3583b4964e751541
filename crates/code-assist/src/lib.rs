//! code-assist: core library for lightweight code analysis, code generation, and bundled docs.

pub mod analysis;
pub mod docs;
pub mod generation;
pub mod types;

pub use analysis::analyze;
pub use docs::{api_documentation, API_DOCS_URI};
pub use generation::generate;
pub use types::*;
