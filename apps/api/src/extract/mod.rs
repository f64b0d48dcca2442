//! Résumé text extraction.
//!
//! Turns an uploaded PDF or Word document into plain text. The upload stays in
//! memory for the whole request; nothing is written to disk.

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};

mod docx;
mod pdf;

/// Shortest trimmed text accepted as a real résumé. Anything shorter usually
/// means a scanned image, a password-protected file, or a corrupted upload.
pub const MIN_TEXT_CHARS: usize = 50;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_DOC: &str = "application/msword";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file type '{0}'")]
    UnsupportedMediaType(String),

    #[error("Document could not be read: {0}")]
    Unreadable(String),
}

/// Document formats we know how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    /// OOXML `.docx`. Uploads declared as legacy `application/msword` are parsed
    /// the same way and fail as unreadable if they are not OOXML.
    Word,
}

impl DocumentKind {
    /// Resolves a declared MIME type, ignoring parameters and case.
    pub fn from_mime(mime_type: &str) -> Result<Self, ExtractError> {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            MIME_PDF => Ok(DocumentKind::Pdf),
            MIME_DOCX | MIME_DOC => Ok(DocumentKind::Word),
            _ => Err(ExtractError::UnsupportedMediaType(mime_type.to_string())),
        }
    }
}

/// A résumé upload, held in memory for one request.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub content: Bytes,
    pub mime_type: String,
    pub file_name: Option<String>,
}

/// Extracts plain text from `content`, interpreting it per `mime_type`.
///
/// Fails with `UnsupportedMediaType` before touching the bytes if the type is not
/// a PDF or Word document, and with `Unreadable` if parsing fails or the cleaned
/// text is shorter than [`MIN_TEXT_CHARS`].
pub fn extract(content: &[u8], mime_type: &str) -> Result<String, ExtractError> {
    let kind = DocumentKind::from_mime(mime_type)?;

    let raw = match kind {
        DocumentKind::Pdf => pdf::extract_text(content)?,
        DocumentKind::Word => docx::extract_text(content)?,
    };

    let text = clean_text(&raw);
    let chars = text.chars().count();
    debug!(?kind, chars, "extracted document text");

    if chars < MIN_TEXT_CHARS {
        return Err(ExtractError::Unreadable(format!(
            "only {chars} characters of text found (minimum {MIN_TEXT_CHARS})"
        )));
    }

    Ok(text)
}

/// Async entry point used by the HTTP layer. Parsing is CPU-bound, so it runs on
/// the blocking pool; the upload buffer moves into the task and is dropped there.
///
/// A panic inside the parser is reported as an unreadable document rather than
/// taking the request task down with it.
pub async fn extract_document(document: UploadedDocument) -> Result<String, ExtractError> {
    let UploadedDocument {
        content,
        mime_type,
        file_name,
    } = document;

    // Reject unsupported types without spawning anything.
    DocumentKind::from_mime(&mime_type)?;

    let result = tokio::task::spawn_blocking(move || extract(&content, &mime_type)).await;

    match result {
        Ok(text) => text,
        Err(join_error) => {
            warn!(file_name = ?file_name, "document parser aborted: {join_error}");
            Err(ExtractError::Unreadable(
                "the document parser failed on this file".to_string(),
            ))
        }
    }
}

/// Removes control characters, trims line ends and collapses runs of blank lines.
fn clean_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blank_run = 0usize;

    for line in raw.lines() {
        let line: String = line
            .chars()
            .filter(|c| !c.is_control() || *c == '\t')
            .collect();
        let line = line.trim_end();

        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }

        out.push_str(line);
        out.push('\n');
    }

    out.trim().to_string()
}
