//! The `generate_code` tool: a function skeleton from a description.

use async_trait::async_trait;
use serde_json::{json, Value};

use code_assist::{generate, GenerationRequest};

use super::registry::ToolHandler;
use crate::types::{HandlerError, ToolDefinition};

pub struct GenerateCode;

#[async_trait]
impl ToolHandler for GenerateCode {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "generate_code".to_string(),
            description: Some("Generate code from a natural-language description".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "description": { "type": "string", "description": "What the code should do" },
                    "language": { "type": "string", "description": "Target language" },
                    "framework": { "type": "string", "description": "Optional framework" }
                },
                "required": ["description", "language"]
            }),
        }
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, HandlerError> {
        let request: GenerationRequest = serde_json::from_value(arguments)
            .map_err(|e| HandlerError::InvalidArguments(e.to_string()))?;
        let generated = generate(&request)?;
        Ok(serde_json::to_value(generated)?)
    }
}
