/// Shared utility functions

/// First `max_chars` characters of `s`, always on a UTF-8 boundary
pub fn char_preview(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// True when the file name carries a `.pdf` extension (any case)
pub fn has_pdf_extension(file_name: &str) -> bool {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_preview_ascii() {
        assert_eq!(char_preview("hello", 3), "hel");
        assert_eq!(char_preview("hello", 10), "hello");
        assert_eq!(char_preview("hello", 5), "hello");
        assert_eq!(char_preview("", 5), "");
    }

    #[test]
    fn test_char_preview_counts_chars_not_bytes() {
        // each Greek letter is two bytes
        assert_eq!(char_preview("αβγδ", 2), "αβ");
        assert_eq!(char_preview("p < 0.05 ± 0.01", 10), "p < 0.05 ±");
    }

    #[test]
    fn test_has_pdf_extension() {
        assert!(has_pdf_extension("trial.pdf"));
        assert!(has_pdf_extension("TRIAL.PDF"));
        assert!(!has_pdf_extension("trial.pdf.txt"));
        assert!(!has_pdf_extension("pdf"));
        assert!(!has_pdf_extension(""));
    }
}
