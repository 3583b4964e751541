//! Tool registration and dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::types::{HandlerError, McpError, McpResult, ToolCallResult, ToolDefinition};

/// A callable tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    /// Run the tool. The returned value is wrapped as `toolResult`.
    async fn invoke(&self, arguments: Value) -> Result<Value, HandlerError>;
}

/// Name-keyed tools, listed in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<(ToolDefinition, Arc<dyn ToolHandler>)>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. A later tool with the same name replaces the earlier one.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        let definition = handler.definition();
        match self.index.get(&definition.name) {
            Some(&slot) => {
                tracing::warn!(tool = %definition.name, "Replacing registered tool");
                self.tools[slot] = (definition, handler);
            }
            None => {
                self.index.insert(definition.name.clone(), self.tools.len());
                self.tools.push((definition, handler));
            }
        }
    }

    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|(def, _)| def.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.index.get(name).map(|&slot| self.tools[slot].1.clone())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn call(&self, name: &str, arguments: Option<Value>) -> McpResult<ToolCallResult> {
        let handler = self
            .get(name)
            .ok_or_else(|| McpError::ToolNotFound(name.to_string()))?;
        let args = arguments.unwrap_or(Value::Object(serde_json::Map::new()));

        let tool_result = handler.invoke(args).await.map_err(|e| e.into_mcp(name))?;
        Ok(ToolCallResult { tool_result })
    }
}
