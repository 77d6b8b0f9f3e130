//! Paper attribute records and how they are produced
//!
//! - `record`: the structured `PaperRecord` and its categorical domains,
//!   plus coercion from caller-supplied JSON / form fields
//! - `extractor`: pattern-based attribute extraction from linear text
//! - `pdf_extractor`: PDF bytes to text

pub mod extractor;
pub mod pdf_extractor;
pub mod record;

pub use extractor::{extract, extract_with_id};
pub use pdf_extractor::extract_text_from_pdf;
pub use record::PaperRecord;
