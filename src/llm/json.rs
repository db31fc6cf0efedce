//! Recovering a JSON object from model output.

use crate::error::{Result, TaskError};

/// Strip Markdown code-fence markers (```` ```json ```` / ```` ``` ````) around a reply.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening fence line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a fenced or bare JSON reply into a value.
///
/// # Errors
///
/// Returns [`TaskError::Interpretation`] when the text is not valid JSON.
pub fn parse_json_reply(text: &str) -> Result<serde_json::Value> {
    let cleaned = strip_code_fences(text);
    serde_json::from_str(cleaned)
        .map_err(|e| TaskError::Interpretation(format!("model reply is not valid JSON: {e}")))
}
