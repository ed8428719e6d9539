//! PDF text extraction.
//!
//! Wraps the `pdf-extract` crate behind a small function so the rest of the
//! corpus loader only deals with plain text. Extraction quality depends on
//! the PDF's internal text layer; scanned/image-only PDFs yield empty text,
//! which the loader reports as `CorpusError::EmptyDocument`.

use crate::error::CorpusError;
use std::path::Path;

/// Extracts the full text of a PDF file.
///
/// # Errors
///
/// Returns `CorpusError::Io` if the file cannot be read and
/// `CorpusError::PdfExtraction` if the PDF cannot be parsed.
pub fn extract_pdf_text(path: &Path) -> Result<String, CorpusError> {
    let bytes = std::fs::read(path).map_err(|source| CorpusError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let text =
        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| CorpusError::PdfExtraction {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    Ok(normalize_extracted(&text))
}

/// Collapses the whitespace artifacts PDF extraction tends to produce.
///
/// Runs of blank lines become paragraph breaks and trailing spaces are
/// stripped, which keeps the downstream splitter's sentence detection sane.
fn normalize_extracted(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;

    for line in text.lines() {
        let trimmed = line.trim_end();
        if trimmed.trim().is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            // One blank line preserves a paragraph break, more collapse to one
            out.push('\n');
            if blank_run > 0 {
                out.push('\n');
            }
        }
        blank_run = 0;
        out.push_str(trimmed);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_blank_runs() {
        let raw = "First line.  \n\n\n\nSecond line.\nThird line.";
        let normalized = normalize_extracted(raw);
        assert_eq!(normalized, "First line.\n\nSecond line.\nThird line.");
    }

    #[test]
    fn test_normalize_empty_input() {
        assert_eq!(normalize_extracted(""), "");
        assert_eq!(normalize_extracted("\n\n\n"), "");
    }

    #[test]
    fn test_extract_missing_file_is_io_error() {
        let err = extract_pdf_text(Path::new("/nonexistent/report.pdf")).unwrap_err();
        assert!(matches!(err, CorpusError::Io { .. }));
    }
}
