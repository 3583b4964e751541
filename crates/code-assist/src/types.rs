//! Core data types for analysis and generation requests.

use serde::{Deserialize, Serialize};

/// Which family of checks to run during analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    Security,
    Performance,
    Quality,
    Complexity,
    #[default]
    All,
}

impl AnalysisKind {
    /// Whether this kind includes the checks of `other`.
    pub fn covers(self, other: AnalysisKind) -> bool {
        self == AnalysisKind::All || self == other
    }
}

/// Input to [`crate::analyze`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub code: String,
    pub language: String,
    #[serde(default)]
    pub analysis_type: AnalysisKind,
}

/// Severity of a reported issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A single finding, anchored to a 1-based line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub line: usize,
    pub severity: Severity,
    pub category: AnalysisKind,
    pub message: String,
}

/// Coarse complexity bucket derived from branch density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
}

/// Size and shape metrics for a snippet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeMetrics {
    pub lines: usize,
    pub blank_lines: usize,
    pub comment_lines: usize,
    pub branch_points: usize,
    pub max_nesting: usize,
    pub complexity: ComplexityLevel,
}

/// Result of [`crate::analyze`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub language: String,
    pub analysis_type: AnalysisKind,
    pub issues: Vec<Issue>,
    pub suggestions: Vec<String>,
    pub metrics: CodeMetrics,
    /// 0.0 to 10.0, higher is better.
    pub score: f32,
}

/// Input to [`crate::generate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub description: String,
    pub language: String,
    #[serde(default)]
    pub framework: Option<String>,
}

/// Result of [`crate::generate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedCode {
    pub code: String,
    pub language: String,
    pub function_name: String,
    pub description: String,
}

/// Errors that can occur in the assist library.
#[derive(thiserror::Error, Debug)]
pub enum AssistError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Input too large: {size} bytes exceeds {max} bytes")]
    TooLarge { size: usize, max: usize },
}

/// Convenience result type.
pub type AssistResult<T> = Result<T, AssistError>;
