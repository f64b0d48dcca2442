use super::ExtractError;

/// Concatenated text of every page, in page order.
pub(super) fn extract_text(content: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(content)
        .map_err(|e| ExtractError::Unreadable(format!("PDF parsing failed: {e}")))
}
