//! Extraction prompt, embedded at compile time

use super::types::ExtractionRequest;

const EXTRACT_INVOICE: &str = include_str!("../../../../prompts/extract_invoice.md");

/// Render the extraction prompt for a request
pub fn render_extraction_prompt(request: &ExtractionRequest) -> String {
    // Simple mustache-style replacement: {{categories}}
    EXTRACT_INVOICE
        .replace("{{categories}}", &request.allowed_categories.join(", "))
        .trim()
        .to_string()
}
