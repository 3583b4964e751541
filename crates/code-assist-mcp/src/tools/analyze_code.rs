//! The `analyze_code` tool: static analysis of a code snippet.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use code_assist::{analyze, AnalysisKind, AnalysisRequest};

use super::registry::ToolHandler;
use crate::types::{HandlerError, ToolDefinition};

#[derive(Debug, Deserialize)]
struct AnalyzeParams {
    code: String,
    language: String,
    #[serde(default)]
    analysis_type: AnalysisKind,
}

pub struct AnalyzeCode;

#[async_trait]
impl ToolHandler for AnalyzeCode {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "analyze_code".to_string(),
            description: Some(
                "Analyze code for security, performance, quality and complexity issues".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "code": { "type": "string", "description": "Source code to analyze" },
                    "language": { "type": "string", "description": "Programming language" },
                    "analysis_type": {
                        "type": "string",
                        "enum": ["security", "performance", "quality", "complexity", "all"],
                        "default": "all"
                    }
                },
                "required": ["code", "language"]
            }),
        }
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, HandlerError> {
        let params: AnalyzeParams = serde_json::from_value(arguments)
            .map_err(|e| HandlerError::InvalidArguments(e.to_string()))?;

        let report = analyze(&AnalysisRequest {
            code: params.code,
            language: params.language,
            analysis_type: params.analysis_type,
        })?;

        Ok(serde_json::to_value(report)?)
    }
}
