//! Content classification for captured clipboard payloads
//!
//! Best-effort heuristics; a misclassified entry is still a valid entry.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::types::ContentType;

/// Preview content for an empty text capture
pub const EMPTY_PLACEHOLDER: &str = "(Empty)";

/// Preview content for image entries
pub const IMAGE_PLACEHOLDER: &str = "Image";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("classifier regex {pattern:?} is valid: {e}"))
}

/// Keywords that only open code: declarations and imports.
static DECLARATION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?m)^\s*(?:import|export|function|fn|impl|struct|enum|def|elif|#include)\b")
});

/// `let x =`, `const name: T =`, `var y =`
static BINDING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?m)^\s*(?:let|var|const)\s+(?:mut\s+)?[A-Za-z_$][\w$]*\s*[:=]")
});

/// Words that also start prose count only on a line ending like a statement.
static STATEMENT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?m)^\s*(?:if|else|for|while|return|use|class|public|private|protected|package|match|switch|async|await)\b.*(?:;|\{|\):)\s*$",
    )
});

static FROM_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?m)^\s*from\s+[\w.]+\s+import\s"));

static BRACE_BLOCK: LazyLock<Regex> = LazyLock::new(|| compile(r"(?s)\{.*\}"));

/// Classify a captured payload. First match wins: image, then rich text with a
/// non-empty rendering, then code heuristics over the plain text.
pub fn classify(has_image: bool, has_rich_text: bool, text: Option<&str>) -> ContentType {
    if has_image {
        return ContentType::Image;
    }

    let text = text.unwrap_or("");
    if has_rich_text && !text.trim().is_empty() {
        return ContentType::RichText;
    }

    if looks_like_code(text) {
        ContentType::Code
    } else {
        ContentType::Text
    }
}

/// Heuristic code detection over plain text.
pub fn looks_like_code(text: &str) -> bool {
    if text.trim().is_empty() {
        return false;
    }

    DECLARATION_LINE.is_match(text)
        || BINDING_LINE.is_match(text)
        || STATEMENT_LINE.is_match(text)
        || FROM_IMPORT.is_match(text)
        || BRACE_BLOCK.is_match(text)
        || text.contains("=>")
        || has_shared_indent(text)
}

/// At least two non-blank lines starting with the exact same non-empty indent.
fn has_shared_indent(text: &str) -> bool {
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let trimmed_len = line.trim_start().len();
        let indent = &line[..line.len() - trimmed_len];
        if indent.is_empty() {
            continue;
        }
        let count = counts.entry(indent).or_insert(0);
        *count += 1;
        if *count >= 2 {
            return true;
        }
    }

    false
}

/// The `content` string stored for a capture of the given type.
pub fn display_content(content_type: ContentType, text: Option<&str>) -> String {
    match content_type {
        ContentType::Image => IMAGE_PLACEHOLDER.to_string(),
        _ => match text {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => EMPTY_PLACEHOLDER.to_string(),
        },
    }
}
