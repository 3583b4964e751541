//! Prompt registration and dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::types::{McpError, McpResult, PromptDefinition, PromptGetResult};

/// A prompt template.
pub trait PromptHandler: Send + Sync {
    fn definition(&self) -> PromptDefinition;

    fn expand(&self, args: Value) -> McpResult<PromptGetResult>;
}

#[derive(Default)]
pub struct PromptRegistry {
    prompts: Vec<(PromptDefinition, Arc<dyn PromptHandler>)>,
    index: HashMap<String, usize>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn PromptHandler>) {
        let definition = handler.definition();
        match self.index.get(&definition.name) {
            Some(&slot) => {
                tracing::warn!(prompt = %definition.name, "Replacing registered prompt");
                self.prompts[slot] = (definition, handler);
            }
            None => {
                self.index.insert(definition.name.clone(), self.prompts.len());
                self.prompts.push((definition, handler));
            }
        }
    }

    pub fn list_prompts(&self) -> Vec<PromptDefinition> {
        self.prompts.iter().map(|(def, _)| def.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    pub fn get(&self, name: &str, arguments: Option<Value>) -> McpResult<PromptGetResult> {
        let (_, handler) = self
            .index
            .get(name)
            .map(|&slot| &self.prompts[slot])
            .ok_or_else(|| McpError::PromptNotFound(name.to_string()))?;
        handler.expand(arguments.unwrap_or(Value::Object(serde_json::Map::new())))
    }
}
