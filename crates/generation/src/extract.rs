//! PDF text extraction
//!
//! Extracts per-page text from an in-memory PDF using lopdf. Extraction is
//! best effort: a page whose content stream cannot be parsed is skipped, and
//! pages that yield no text are dropped. Zero pages out is a valid outcome
//! (the caller decides whether that means an empty document).

use crate::errors::GenerationError;
use tracing::{debug, warn};

/// Extract the text of each page from a PDF buffer.
///
/// Pages come back in document order, whitespace-normalized, with empty
/// pages filtered out.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, GenerationError> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| GenerationError::PdfParse(format!("failed to load PDF: {}", e)))?;

    let page_ids: Vec<_> = doc.page_iter().collect();
    debug!(page_count = page_ids.len(), "Extracting text from PDF");

    let mut pages = Vec::with_capacity(page_ids.len());

    for (index, page_id) in page_ids.into_iter().enumerate() {
        match doc.get_page_content(page_id) {
            Ok(content) => {
                let text = clean_text(&extract_text_from_content(&content));
                if !text.is_empty() {
                    pages.push(text);
                }
            }
            Err(e) => {
                warn!(page = index + 1, error = %e, "Failed to read page content, skipping");
            }
        }
    }

    Ok(pages)
}

/// Extract text from a PDF content stream
fn extract_text_from_content(content: &[u8]) -> String {
    // Simple text extraction - looks for text between BT and ET operators
    let content_str = String::from_utf8_lossy(content);
    let mut text = String::new();
    let mut in_text_block = false;
    let mut current_text = String::new();

    for line in content_str.lines() {
        let trimmed = line.trim();

        if trimmed == "BT" {
            in_text_block = true;
            continue;
        }

        if trimmed == "ET" {
            in_text_block = false;
            if !current_text.is_empty() {
                text.push_str(&current_text);
                text.push(' ');
                current_text.clear();
            }
            continue;
        }

        if in_text_block {
            // Look for text showing operators: Tj, TJ, ', "
            if let Some(text_content) = extract_text_from_operator(trimmed) {
                current_text.push_str(&text_content);
            }
        }
    }

    text
}

/// Extract text from a PDF text operator
fn extract_text_from_operator(line: &str) -> Option<String> {
    // Handle (text) Tj operator
    if line.ends_with("Tj") || line.ends_with("'") || line.ends_with("\"") {
        if let Some(start) = line.find('(') {
            if let Some(end) = line.rfind(')') {
                let text = &line[start + 1..end];
                return Some(decode_pdf_string(text));
            }
        }
    }

    // Handle [(text) num (text) num] TJ operator (array of text)
    if line.ends_with("TJ") {
        let mut result = String::new();
        let mut in_paren = false;
        let mut current = String::new();

        for ch in line.chars() {
            match ch {
                '(' => {
                    in_paren = true;
                }
                ')' => {
                    in_paren = false;
                    result.push_str(&decode_pdf_string(&current));
                    current.clear();
                }
                _ if in_paren => {
                    current.push(ch);
                }
                _ => {}
            }
        }

        if !result.is_empty() {
            return Some(result);
        }
    }

    None
}

/// Decode PDF string escapes
fn decode_pdf_string(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('(') => result.push('('),
                Some(')') => result.push(')'),
                Some(c) => result.push(c),
                None => {}
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Collapse whitespace runs to single spaces
fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        let input = "Hello   World\n\nTest";
        assert_eq!(clean_text(input), "Hello World Test");
    }

    #[test]
    fn test_clean_text_empty() {
        assert_eq!(clean_text("   \n\t "), "");
    }

    #[test]
    fn test_decode_pdf_string() {
        assert_eq!(decode_pdf_string("Hello\\nWorld"), "Hello\nWorld");
        assert_eq!(decode_pdf_string("Test\\(paren\\)"), "Test(paren)");
    }

    #[test]
    fn test_extract_tj_operator() {
        assert_eq!(
            extract_text_from_operator("(Hello World) Tj"),
            Some("Hello World".to_string())
        );
    }

    #[test]
    fn test_extract_tj_array_operator() {
        assert_eq!(
            extract_text_from_operator("[(Hel) -10 (lo)] TJ"),
            Some("Hello".to_string())
        );
    }

    #[test]
    fn test_extract_text_from_content() {
        let content = b"BT\n(First line) Tj\nET\nBT\n(Second) Tj\nET\n";
        let text = extract_text_from_content(content);
        assert_eq!(clean_text(&text), "First line Second");
    }

    #[test]
    fn test_extract_pages_rejects_garbage() {
        let err = extract_pages(b"not a pdf at all");
        assert!(matches!(err, Err(GenerationError::PdfParse(_))));
    }
}
