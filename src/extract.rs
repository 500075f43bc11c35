//! PDF text extraction for uploaded documents.
//!
//! Uploaded PDFs are reduced to plain UTF-8 text with `pdf-extract` and then
//! split into pseudo-pages on blank-line boundaries. The extractor does not
//! track real page breaks; paragraph blocks are close enough for citation
//! purposes and match how the ingestion pipeline numbers pages.

use crate::error::{Error, Result};

/// MIME type dispatched to the PDF path.
pub const MIME_PDF: &str = "application/pdf";

/// Whether an upload should be treated as a PDF, by MIME type or file
/// extension.
pub fn is_pdf(file_name: &str, mime_type: &str) -> bool {
    mime_type == MIME_PDF || file_name.to_lowercase().ends_with(".pdf")
}

/// Extract text from a PDF and split it into pseudo-pages.
pub fn pdf_pages(bytes: &[u8]) -> Result<Vec<String>> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| Error::Extraction(format!("PDF extraction failed: {}", e)))?;
    Ok(split_pages(&text))
}

/// Split text into blocks on blank-line boundaries. Blocks are trimmed and
/// empty blocks are dropped.
pub fn split_pages(text: &str) -> Vec<String> {
    let mut pages = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            flush_page(&mut pages, &mut current);
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    flush_page(&mut pages, &mut current);
    pages
}

fn flush_page(pages: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        pages.push(trimmed.to_string());
    }
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pdf_by_mime_or_extension() {
        assert!(is_pdf("doc.bin", MIME_PDF));
        assert!(is_pdf("Report.PDF", "application/octet-stream"));
        assert!(!is_pdf("notes.txt", "text/plain"));
    }

    #[test]
    fn test_split_pages_on_blank_lines() {
        let pages = split_pages("first block\nsecond line\n\nsecond block\n\n\nthird block");
        assert_eq!(
            pages,
            vec![
                "first block\nsecond line".to_string(),
                "second block".to_string(),
                "third block".to_string()
            ]
        );
    }

    #[test]
    fn test_split_pages_whitespace_only_separator() {
        let pages = split_pages("alpha\n   \nbeta");
        assert_eq!(pages, vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[test]
    fn test_split_pages_empty_input() {
        assert!(split_pages("").is_empty());
        assert!(split_pages("\n\n \n").is_empty());
    }

    #[test]
    fn test_invalid_pdf_returns_extraction_error() {
        let err = pdf_pages(b"not a pdf").unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }
}
