/*!
 * Structured-output parsing and salvage.
 *
 * The provider is asked for a JSON array of `{"index": n, "text": "..."}`
 * objects. Well-formed responses parse directly. When a call fails mid-stream
 * the raw buffer usually ends in an incomplete fragment; the salvage pass
 * trims trailing incomplete lines, closes the array, and re-parses, so that
 * valid prefix entries are preserved and the invalid suffix is dropped. As a
 * last resort each line is tried as a standalone object.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

// Markdown code fences some models wrap structured output in
static FENCE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").unwrap());

// A complete standalone entry object on a single line
static LINE_OBJECT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^{}]*\}").unwrap());

/// One translated line parsed from provider output
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParsedEntry {
    /// Stable 1-based index in the master sequence
    pub index: usize,

    /// Translated text; may be empty for lines the model skipped
    #[serde(default, alias = "translated_text")]
    pub text: String,
}

/// Strip a surrounding markdown code fence, if present
fn strip_fences(raw: &str) -> &str {
    match FENCE_REGEX.captures(raw) {
        Some(caps) => caps.get(1).map_or(raw, |m| m.as_str()),
        None => raw.trim(),
    }
}

/// Parse a complete, well-formed structured response
pub fn parse_entries(raw: &str) -> anyhow::Result<Vec<ParsedEntry>> {
    let body = strip_fences(raw);
    let entries: Vec<ParsedEntry> = serde_json::from_str(body)?;
    Ok(entries)
}

/// Best-effort parse of a truncated or malformed raw buffer
///
/// Returns `None` when nothing can be recovered.
pub fn salvage_entries(raw: &str) -> Option<Vec<ParsedEntry>> {
    let body = strip_fences(raw);

    // Drop trailing lines until the remainder, with the array closed, parses.
    let lines: Vec<&str> = body.lines().collect();
    for keep in (1..=lines.len()).rev() {
        let mut candidate = lines[..keep].join("\n");
        let trimmed = candidate.trim_end().trim_end_matches(',').to_string();
        if trimmed.is_empty() || !trimmed.starts_with('[') {
            continue;
        }
        candidate = if trimmed.ends_with(']') {
            trimmed
        } else {
            format!("{trimmed}\n]")
        };

        if let Ok(entries) = serde_json::from_str::<Vec<ParsedEntry>>(&candidate) {
            if !entries.is_empty() {
                return Some(entries);
            }
        }
    }

    // Last resort: collect every standalone object that parses on its own.
    let mut entries = Vec::new();
    for m in LINE_OBJECT_REGEX.find_iter(body) {
        if let Ok(entry) = serde_json::from_str::<ParsedEntry>(m.as_str()) {
            entries.push(entry);
        }
    }

    if entries.is_empty() { None } else { Some(entries) }
}
