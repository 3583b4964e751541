//! Bundled API documentation.

use async_trait::async_trait;

use code_assist::{api_documentation, API_DOCS_URI};

use super::registry::ResourceHandler;
use crate::types::{HandlerError, ResourceDefinition};

pub struct ApiDocs;

#[async_trait]
impl ResourceHandler for ApiDocs {
    fn definition(&self) -> ResourceDefinition {
        ResourceDefinition {
            uri: API_DOCS_URI.to_string(),
            name: "API Documentation".to_string(),
            description: Some("Tools, routes and error codes of this server".to_string()),
            mime_type: Some("text/markdown".to_string()),
        }
    }

    async fn read(&self) -> Result<String, HandlerError> {
        Ok(api_documentation())
    }
}
