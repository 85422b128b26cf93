//! Transcript filter — turns a raw assistant reply into displayable text.
//!
//! Rules are applied in order:
//! 1. part lists render as one `[image]` placeholder per image part;
//! 2. anything that is not a string or a list has no content;
//! 3. when both reasoning delimiters are present, only the text after the
//!    last `</think>` is kept;
//! 4. lines starting with `##` are dropped entirely;
//! 5. empty text, or text still carrying raw model tokens, has no content;
//! 6. otherwise the trimmed remainder is displayed.
//!
//! Reasoning is stripped before headings so a heading inside discarded
//! reasoning is never looked at.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::types::{ContentPart, MessageContent};

/// Placeholder shown for each image part.
pub const IMAGE_PLACEHOLDER: &str = "[image]";

/// Raw tokens that mark output as model-internal (matched case-insensitively).
const RAW_TOKENS: &[&str] = &["<think>", "</think>", "<error>", "<unk>", "<|", "</"];

static THINK_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<think>").expect("valid regex"));
static THINK_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</think>").expect("valid regex"));

/// Derive displayable text from a raw reply value, or `None` if nothing should be shown.
pub fn extract_clean_content(raw: &Value) -> Option<String> {
    match raw {
        Value::Array(items) => {
            let images = items
                .iter()
                .filter(|item| item.get("type").and_then(Value::as_str) == Some("image_url"))
                .count();
            placeholders(images)
        }
        Value::String(text) => clean_text(text),
        _ => None,
    }
}

/// Filter already-typed message content (used when replaying saved sessions).
pub fn display_content(content: &MessageContent) -> Option<String> {
    match content {
        MessageContent::Text(text) => clean_text(text),
        MessageContent::Parts(parts) => {
            let images = parts
                .iter()
                .filter(|part| matches!(part, ContentPart::ImageUrl { .. }))
                .count();
            placeholders(images)
        }
    }
}

/// Apply the text rules (3–6) to a string reply.
pub fn clean_text(text: &str) -> Option<String> {
    let answer = strip_reasoning(text);
    let without_headings = strip_heading_lines(answer);
    let trimmed = without_headings.trim();

    if trimmed.is_empty() || contains_raw_token(trimmed) {
        return None;
    }
    Some(trimmed.to_string())
}

fn placeholders(images: usize) -> Option<String> {
    if images == 0 {
        return None;
    }
    Some(vec![IMAGE_PLACEHOLDER; images].join(" "))
}

fn strip_reasoning(text: &str) -> &str {
    if !THINK_OPEN.is_match(text) {
        return text;
    }
    match THINK_CLOSE.find_iter(text).last() {
        Some(close) => text[close.end()..].trim(),
        None => text,
    }
}

/// Kept lines retain their original terminators (`\n` or `\r\n`).
fn strip_heading_lines(text: &str) -> String {
    text.split_inclusive('\n')
        .filter(|line| !line.starts_with("##"))
        .collect()
}

fn contains_raw_token(text: &str) -> bool {
    let lower = text.to_lowercase();
    RAW_TOKENS.iter().any(|token| lower.contains(token))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
