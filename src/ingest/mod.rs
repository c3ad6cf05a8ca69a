//! Ingestion collaborator: text extraction from uploaded PDFs.
//!
//! The only user-visible failure in the whole pipeline: a document that
//! cannot be opened is rejected. A document that opens but yields no text
//! (image-only scan) is valid input — downstream stages treat the empty
//! text as "no extractable identity, no extractable date".

use chrono::{DateTime, Utc};

use crate::models::RawDocument;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("could not parse uploaded document: {0}")]
    PdfParsing(String),
}

/// Extract the full text of a PDF, pages joined by newlines.
pub fn extract_text(pdf_bytes: &[u8]) -> Result<String, IngestError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
        .map_err(|e| IngestError::PdfParsing(e.to_string()))?;
    Ok(pages.join("\n"))
}

/// Build the immutable raw document for one upload.
pub fn ingest_pdf(
    pdf_bytes: &[u8],
    original_filename: &str,
    uploaded_at: DateTime<Utc>,
) -> Result<RawDocument, IngestError> {
    let text = extract_text(pdf_bytes)?;
    Ok(RawDocument {
        text,
        original_filename: original_filename.to_string(),
        uploaded_at,
    })
}
