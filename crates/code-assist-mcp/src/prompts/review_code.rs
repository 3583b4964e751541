//! Prompt: review_code.

use serde_json::Value;

use super::registry::PromptHandler;
use crate::types::{
    McpError, McpResult, PromptArgument, PromptDefinition, PromptGetResult, PromptMessage,
    ToolContent,
};

const DESCRIPTION: &str = "Guide for reviewing a code snippet";

pub struct ReviewCode;

impl PromptHandler for ReviewCode {
    fn definition(&self) -> PromptDefinition {
        PromptDefinition {
            name: "review_code".to_string(),
            description: Some(DESCRIPTION.to_string()),
            arguments: Some(vec![
                PromptArgument {
                    name: "language".to_string(),
                    description: Some("Language of the code under review".to_string()),
                    required: true,
                },
                PromptArgument {
                    name: "focus".to_string(),
                    description: Some(
                        "Optional focus: security, performance, quality or complexity".to_string(),
                    ),
                    required: false,
                },
            ]),
        }
    }

    fn expand(&self, args: Value) -> McpResult<PromptGetResult> {
        let language = args
            .get("language")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::InvalidParams("'language' argument is required".to_string()))?;
        let focus = args.get("focus").and_then(Value::as_str).unwrap_or("all");

        let text = format!(
            "Review the {language} code I am about to share.\n\n\
             Please:\n\
             1. Call analyze_code with language \"{language}\" and analysis_type \"{focus}\"\n\
             2. Explain each reported issue and how to fix it\n\
             3. Point out anything the analysis missed\n\
             4. Finish with a short overall assessment"
        );

        Ok(PromptGetResult {
            description: Some(DESCRIPTION.to_string()),
            messages: vec![PromptMessage {
                role: "user".to_string(),
                content: ToolContent::Text { text },
            }],
        })
    }
}
