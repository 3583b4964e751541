//! Bundled API documentation served as a resource.

use crate::generation::SUPPORTED_LANGUAGES;

pub const API_DOCS_URI: &str = "resource://docs/api";

/// Markdown documentation for the server's tools and wire protocol.
pub fn api_documentation() -> String {
    let languages = SUPPORTED_LANGUAGES.join(", ");
    format!(
        "# API Documentation\n\n\
         All calls are JSON-RPC 2.0 over `POST /mcp/command` with an \
         `Authorization: Bearer <token>` header. The first call must be \
         `initialize`; its response carries an `X-Session-Id` header that every \
         later call must send back.\n\n\
         Asynchronous results and heartbeats are pushed over `GET /mcp/stream` \
         as server-sent events (`connected`, `message`, `heartbeat`, `error`).\n\n\
         ## Tools\n\n\
         - `analyze_code`: metrics and heuristic findings. Arguments: `code`, \
         `language`, optional `analysis_type` (security, performance, quality, \
         complexity, all).\n\
         - `generate_code`: function skeleton from a description. Arguments: \
         `description`, `language` ({languages}), optional `framework`.\n\n\
         ## Error codes\n\n\
         | Code | Meaning |\n\
         |---|---|\n\
         | -32700 | Parse error |\n\
         | -32600 | Invalid request |\n\
         | -32601 | Method not found |\n\
         | -32602 | Invalid params, unknown tool, resource or prompt |\n\
         | -32603 | Internal error |\n\
         | -32002 | Server not initialized |\n\
         | -32000 | Authentication or session error |\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docs_list_tools() {
        let docs = api_documentation();
        assert!(docs.starts_with("# API Documentation"));
        assert!(docs.contains("analyze_code"));
        assert!(docs.contains("generate_code"));
        assert!(docs.contains("rust"));
    }
}
