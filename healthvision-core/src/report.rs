//! Post-processing for the markdown the voice analysis model returns.
//!
//! The model answers with a numbered list whose items follow a fixed order of
//! topics, often with stray bold markers and empty bullets. `label_sections`
//! turns that into `### Heading` blocks the history and voice views can render.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Topic of each numbered item, in the order the model is prompted with.
pub const SECTION_LABELS: [&str; 9] = [
    "Summary",
    "Key Symptoms",
    "Duration",
    "Severity",
    "Possible Causes",
    "Red Flag Warnings",
    "Patient-Friendly Explanation",
    "Doctor Summary",
    "Recommended Next Steps",
];

static EXCESS_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("valid blank-line pattern"));

static INLINE_LABELS: Lazy<Regex> = Lazy::new(|| {
    let alternatives = SECTION_LABELS
        .iter()
        .map(|label| regex::escape(label))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)(?:{alternatives}):?\s*\*\*")).expect("valid label pattern")
});

// Item markers only count at the start of a line so decimals like "38.5" stay intact.
static ITEM_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*\d+\.[ \t]*").expect("valid item pattern"));

static LEADING_EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\*+:\*+|\*+)[ \t]*").expect("valid emphasis pattern"));

static EMPTY_BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*[-*•][ \t]*$").expect("valid bullet pattern"));

/// Split a numbered AI answer into labelled `###` sections.
///
/// Items past the known topics are titled `Section N`. Empty input yields an
/// empty string.
pub fn label_sections(markdown: &str) -> String {
    let normalized = markdown.replace('\r', "");
    let normalized = EXCESS_BLANK_LINES.replace_all(&normalized, "\n\n");
    let normalized = INLINE_LABELS.replace_all(normalized.trim(), "");

    let mut sections = Vec::new();
    for (index, part) in ITEM_MARKER
        .split(&normalized)
        .filter(|part| !part.trim().is_empty())
        .enumerate()
    {
        let label = SECTION_LABELS
            .get(index)
            .map(|label| (*label).to_string())
            .unwrap_or_else(|| format!("Section {}", index + 1));
        sections.push(format!("### {label}\n{}", clean_section(part)));
    }

    sections.join("\n\n")
}

fn clean_section(part: &str) -> String {
    let content = LEADING_EMPHASIS.replace(part.trim(), "");
    let content = EMPTY_BULLET.replace_all(&content, "");
    content.trim().to_string()
}

/// Render an arbitrary backend value as markdown text.
///
/// Strings are trimmed, null is empty, anything else is pretty JSON.
pub fn safe_markdown(value: &Value) -> String {
    match value {
        Value::String(text) => text.trim().to_string(),
        Value::Null => String::new(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
