//! Prompt: explain_code.

use serde_json::Value;

use super::registry::PromptHandler;
use crate::types::{
    McpError, McpResult, PromptArgument, PromptDefinition, PromptGetResult, PromptMessage,
    ToolContent,
};

pub struct ExplainCode;

impl PromptHandler for ExplainCode {
    fn definition(&self) -> PromptDefinition {
        PromptDefinition {
            name: "explain_code".to_string(),
            description: Some("Guide for explaining what a snippet does".to_string()),
            arguments: Some(vec![
                PromptArgument {
                    name: "code".to_string(),
                    description: Some("Code to explain".to_string()),
                    required: true,
                },
                PromptArgument {
                    name: "audience".to_string(),
                    description: Some("Who the explanation is for".to_string()),
                    required: false,
                },
            ]),
        }
    }

    fn expand(&self, args: Value) -> McpResult<PromptGetResult> {
        let code = args
            .get("code")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::InvalidParams("'code' argument is required".to_string()))?;
        let audience = args
            .get("audience")
            .and_then(Value::as_str)
            .unwrap_or("an experienced developer");

        let text = format!(
            "Explain the following code for {audience}:\n\n\
             ```\n{code}\n```\n\n\
             Cover what it does, its inputs and outputs, and any surprising behavior."
        );

        Ok(PromptGetResult {
            description: Some("Explain a code snippet".to_string()),
            messages: vec![PromptMessage {
                role: "user".to_string(),
                content: ToolContent::Text { text },
            }],
        })
    }
}
