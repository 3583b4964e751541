//! Template-based code generation.

use crate::types::{AssistError, AssistResult, GeneratedCode, GenerationRequest};

const MAX_NAME_WORDS: usize = 4;
const FALLBACK_NAME: &str = "generated_function";

/// Languages [`generate`] has templates for.
pub const SUPPORTED_LANGUAGES: &[&str] =
    &["python", "javascript", "typescript", "rust", "go", "java"];

/// Generate a function skeleton from a natural-language description.
pub fn generate(request: &GenerationRequest) -> AssistResult<GeneratedCode> {
    let description = request.description.trim();
    if description.is_empty() {
        return Err(AssistError::InvalidInput(
            "description must not be empty".to_string(),
        ));
    }

    let language = request.language.trim().to_lowercase();
    let snake = function_name(description);
    let header = match &request.framework {
        Some(fw) if !fw.trim().is_empty() => format!("{description} (framework: {})", fw.trim()),
        _ => description.to_string(),
    };

    let (code, function_name) = match language.as_str() {
        "python" => (
            format!("# {header}\ndef {snake}():\n    raise NotImplementedError\n"),
            snake,
        ),
        "rust" => (
            format!("/// {header}\npub fn {snake}() {{\n    todo!()\n}}\n"),
            snake,
        ),
        "javascript" | "typescript" => {
            let camel = camel_case(&snake);
            let ret = if language == "typescript" { ": void" } else { "" };
            (
                format!(
                    "// {header}\nfunction {camel}(){ret} {{\n    throw new Error(\"not implemented\");\n}}\n"
                ),
                camel,
            )
        }
        "go" => {
            let pascal = pascal_case(&snake);
            (
                format!("// {pascal} {header}\nfunc {pascal}() error {{\n\treturn nil\n}}\n"),
                pascal,
            )
        }
        "java" => {
            let camel = camel_case(&snake);
            (
                format!(
                    "/** {header} */\npublic static void {camel}() {{\n    throw new UnsupportedOperationException();\n}}\n"
                ),
                camel,
            )
        }
        _ => return Err(AssistError::UnsupportedLanguage(request.language.clone())),
    };

    Ok(GeneratedCode {
        code,
        language,
        function_name,
        description: "Code generated successfully".to_string(),
    })
}

fn function_name(description: &str) -> String {
    let words: Vec<String> = description
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .take(MAX_NAME_WORDS)
        .map(|w| w.to_ascii_lowercase())
        .collect();

    match words.first() {
        Some(first) if first.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) => {
            words.join("_")
        }
        _ => FALLBACK_NAME.to_string(),
    }
}

fn pascal_case(snake: &str) -> String {
    snake
        .split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn camel_case(snake: &str) -> String {
    let pascal = pascal_case(snake);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => pascal,
    }
}
