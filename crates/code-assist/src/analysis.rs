//! Line-oriented static analysis: metrics plus a handful of heuristic checks.

use crate::types::{
    AnalysisKind, AnalysisReport, AnalysisRequest, AssistError, AssistResult, CodeMetrics,
    ComplexityLevel, Issue, Severity,
};

/// Largest snippet accepted for analysis.
pub const MAX_INPUT_BYTES: usize = 1024 * 1024;

const MAX_LINE_LENGTH: usize = 120;

/// Patterns that usually indicate a security problem, per line.
const SECURITY_PATTERNS: &[(&str, &str)] = &[
    ("eval(", "Dynamic evaluation of code"),
    ("exec(", "Dynamic execution of code"),
    ("shell=True", "Shell invocation with shell=True"),
    ("os.system(", "Shell command built at runtime"),
    ("innerHTML", "Direct innerHTML assignment can enable XSS"),
    ("password =", "Possible hardcoded credential"),
    ("secret =", "Possible hardcoded credential"),
    ("unsafe {", "Unsafe block"),
];

const BRANCH_KEYWORDS: &[&str] = &[
    "if", "elif", "else if", "for", "while", "match", "case", "catch", "except", "&&", "||",
];

/// Analyze a code snippet.
pub fn analyze(request: &AnalysisRequest) -> AssistResult<AnalysisReport> {
    if request.language.trim().is_empty() {
        return Err(AssistError::InvalidInput("language must not be empty".to_string()));
    }
    if request.code.len() > MAX_INPUT_BYTES {
        return Err(AssistError::TooLarge {
            size: request.code.len(),
            max: MAX_INPUT_BYTES,
        });
    }

    let language = request.language.trim().to_lowercase();
    let comment_prefix = comment_prefix(&language);
    let kind = request.analysis_type;

    let mut issues = Vec::new();
    let mut metrics = CodeMetrics {
        lines: 0,
        blank_lines: 0,
        comment_lines: 0,
        branch_points: 0,
        max_nesting: 0,
        complexity: ComplexityLevel::Low,
    };
    let mut depth: usize = 0;

    for (idx, raw) in request.code.lines().enumerate() {
        let line_no = idx + 1;
        metrics.lines += 1;
        let line = raw.trim();

        if line.is_empty() {
            metrics.blank_lines += 1;
            continue;
        }
        if line.starts_with(comment_prefix) {
            metrics.comment_lines += 1;
            if kind.covers(AnalysisKind::Quality) && has_marker(line) {
                issues.push(Issue {
                    line: line_no,
                    severity: Severity::Info,
                    category: AnalysisKind::Quality,
                    message: "Unresolved TODO/FIXME marker".to_string(),
                });
            }
            continue;
        }

        metrics.branch_points += count_branches(line);

        let nesting = if language == "python" {
            indentation_depth(raw)
        } else {
            depth += line.matches('{').count();
            let nesting = depth;
            depth = depth.saturating_sub(line.matches('}').count());
            nesting
        };
        metrics.max_nesting = metrics.max_nesting.max(nesting);

        if kind.covers(AnalysisKind::Security) {
            for (pattern, message) in SECURITY_PATTERNS {
                if line.contains(pattern) {
                    issues.push(Issue {
                        line: line_no,
                        severity: Severity::Error,
                        category: AnalysisKind::Security,
                        message: (*message).to_string(),
                    });
                }
            }
        }

        if kind.covers(AnalysisKind::Performance)
            && (line.contains("sleep(") || line.contains("thread::sleep"))
        {
            issues.push(Issue {
                line: line_no,
                severity: Severity::Warning,
                category: AnalysisKind::Performance,
                message: "Blocking sleep call".to_string(),
            });
        }

        if kind.covers(AnalysisKind::Quality) && raw.chars().count() > MAX_LINE_LENGTH {
            issues.push(Issue {
                line: line_no,
                severity: Severity::Info,
                category: AnalysisKind::Quality,
                message: format!("Line exceeds {MAX_LINE_LENGTH} characters"),
            });
        }
    }

    metrics.complexity = complexity_level(metrics.branch_points, metrics.max_nesting);

    if kind.covers(AnalysisKind::Performance) && metrics.max_nesting >= 4 {
        issues.push(Issue {
            line: 0,
            severity: Severity::Warning,
            category: AnalysisKind::Performance,
            message: format!("Deep nesting ({} levels)", metrics.max_nesting),
        });
    }

    let suggestions = suggestions_for(&issues, &metrics);
    let score = score(&issues);

    tracing::debug!(
        language = %language,
        lines = metrics.lines,
        issues = issues.len(),
        "analysis complete"
    );

    Ok(AnalysisReport {
        language,
        analysis_type: kind,
        issues,
        suggestions,
        metrics,
        score,
    })
}

fn comment_prefix(language: &str) -> &'static str {
    match language {
        "python" | "ruby" | "shell" | "bash" | "yaml" => "#",
        "sql" | "lua" | "haskell" => "--",
        _ => "//",
    }
}

fn has_marker(line: &str) -> bool {
    line.contains("TODO") || line.contains("FIXME")
}

fn count_branches(line: &str) -> usize {
    line.split(|c: char| !(c.is_alphanumeric() || c == '&' || c == '|'))
        .filter(|token| BRANCH_KEYWORDS.contains(token))
        .count()
}

fn indentation_depth(raw: &str) -> usize {
    let spaces = raw
        .chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum::<usize>();
    spaces / 4
}

fn complexity_level(branches: usize, nesting: usize) -> ComplexityLevel {
    if branches > 20 || nesting > 5 {
        ComplexityLevel::High
    } else if branches > 8 || nesting > 3 {
        ComplexityLevel::Medium
    } else {
        ComplexityLevel::Low
    }
}

fn suggestions_for(issues: &[Issue], metrics: &CodeMetrics) -> Vec<String> {
    let mut out = Vec::new();
    if issues.iter().any(|i| i.category == AnalysisKind::Security) {
        out.push("Review flagged lines for injection and credential exposure".to_string());
    }
    if metrics.complexity != ComplexityLevel::Low {
        out.push("Consider extracting nested branches into smaller functions".to_string());
    }
    if metrics.lines > 10 && metrics.comment_lines == 0 {
        out.push("Add comments describing non-obvious behavior".to_string());
    }
    if out.is_empty() {
        out.push("Code analysis completed successfully".to_string());
    }
    out
}

fn score(issues: &[Issue]) -> f32 {
    let penalty: f32 = issues
        .iter()
        .map(|i| match i.severity {
            Severity::Error => 2.0,
            Severity::Warning => 1.0,
            Severity::Info => 0.25,
        })
        .sum();
    (10.0 - penalty).clamp(0.0, 10.0)
}
