//! PDF text extraction wrapper
//!
//! Wraps the pdf-extract crate so that every way a document can fail to decode
//! (not a PDF, encrypted, corrupted, or a panic inside the parser) comes back
//! as `GradeError::DocumentDecode`. Scanned/image-only PDFs decode to empty
//! text, which is not an error; the extractor just falls back to defaults.

use crate::error::{GradeError, Result};
use std::panic::{self, AssertUnwindSafe};

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Extract full text from PDF bytes
pub fn extract_text_from_pdf(pdf_bytes: &[u8]) -> Result<String> {
    if !looks_like_pdf(pdf_bytes) {
        return Err(GradeError::DocumentDecode(
            "missing %PDF- header, not a PDF document".to_string(),
        ));
    }

    // pdf-extract panics on some malformed inputs instead of returning Err
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(pdf_bytes)
    }));

    match outcome {
        Ok(Ok(text)) => {
            tracing::debug!(bytes = pdf_bytes.len(), chars = text.chars().count(), "decoded PDF");
            Ok(text)
        }
        Ok(Err(e)) => Err(GradeError::DocumentDecode(e.to_string())),
        Err(_) => Err(GradeError::DocumentDecode(
            "PDF parser aborted on malformed document".to_string(),
        )),
    }
}

/// Header check; tolerates leading whitespace some generators emit
fn looks_like_pdf(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes[start..].starts_with(PDF_MAGIC)
}
