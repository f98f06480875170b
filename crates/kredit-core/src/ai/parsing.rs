//! Parsing helpers for extractor responses
//!
//! Models are told to answer with a bare JSON array but often wrap it in a
//! markdown code fence or add a sentence around it.

use crate::error::{Error, Result};

use super::types::SpendingCandidate;

const RAW_PREVIEW_LEN: usize = 200;

/// Truncate long responses for error messages
fn preview(s: &str) -> String {
    if s.len() > RAW_PREVIEW_LEN {
        let mut end = RAW_PREVIEW_LEN;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    } else {
        s.to_string()
    }
}

/// Remove a leading ```` ```json ```` (or bare ```` ``` ````) and a trailing ```` ``` ````
pub fn strip_code_fences(response: &str) -> &str {
    let mut s = response.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Parse the candidate list out of a model response
pub fn parse_candidates(response: &str) -> Result<Vec<SpendingCandidate>> {
    let cleaned = strip_code_fences(response);
    if cleaned.is_empty() {
        return Err(Error::Extraction("empty response".into()));
    }

    // Fast path: the whole payload is the array
    if let Ok(candidates) = serde_json::from_str::<Vec<SpendingCandidate>>(cleaned) {
        return Ok(candidates);
    }

    // Otherwise look for the outermost array
    let start = cleaned.find('[');
    let end = cleaned.rfind(']');

    match (start, end) {
        (Some(s), Some(e)) if s < e => {
            let json_str = &cleaned[s..=e];
            serde_json::from_str(json_str).map_err(|e| {
                Error::Extraction(format!(
                    "Invalid JSON from extractor: {} | Raw: {}",
                    e,
                    preview(json_str)
                ))
            })
        }
        _ => Err(Error::Extraction(format!(
            "No JSON array found in extractor response | Raw: {}",
            preview(cleaned)
        ))),
    }
}
