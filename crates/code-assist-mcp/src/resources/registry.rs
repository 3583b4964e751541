//! Resource registration and dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::types::{
    HandlerError, McpError, McpResult, ReadResourceResult, ResourceContent, ResourceDefinition,
};

/// A readable resource addressed by URI.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    fn definition(&self) -> ResourceDefinition;

    async fn read(&self) -> Result<String, HandlerError>;
}

/// URI-keyed resources, listed in registration order.
#[derive(Default)]
pub struct ResourceRegistry {
    resources: Vec<(ResourceDefinition, Arc<dyn ResourceHandler>)>,
    index: HashMap<String, usize>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn ResourceHandler>) {
        let definition = handler.definition();
        match self.index.get(&definition.uri) {
            Some(&slot) => {
                tracing::warn!(uri = %definition.uri, "Replacing registered resource");
                self.resources[slot] = (definition, handler);
            }
            None => {
                self.index.insert(definition.uri.clone(), self.resources.len());
                self.resources.push((definition, handler));
            }
        }
    }

    pub fn list_resources(&self) -> Vec<ResourceDefinition> {
        self.resources.iter().map(|(def, _)| def.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub async fn read(&self, uri: &str) -> McpResult<ReadResourceResult> {
        let (definition, handler) = self
            .index
            .get(uri)
            .map(|&slot| &self.resources[slot])
            .ok_or_else(|| McpError::ResourceNotFound(uri.to_string()))?;

        let text = handler.read().await.map_err(|e| e.into_mcp(uri))?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContent {
                uri: definition.uri.clone(),
                mime_type: definition.mime_type.clone(),
                text: Some(text),
            }],
        })
    }
}
