//! PDF detection: magic bytes and submission metadata.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// PDF header information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfFormat {
    /// PDF version (e.g., "1.7", "2.0")
    pub version: String,
}

impl std::fmt::Display for PdfFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF {}", self.version)
    }
}

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_MAGIC_LEN: usize = 5;
const VERSION_LEN: usize = 3; // e.g., "1.7"

/// Leading bytes some producers emit before the header.
const MAX_HEADER_OFFSET: usize = 1024;

/// Detect PDF format from a file path.
///
/// # Example
/// ```no_run
/// use pdftext::detect::detect_format_from_path;
///
/// let format = detect_format_from_path("document.pdf").unwrap();
/// println!("PDF version: {}", format.version);
/// ```
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<PdfFormat> {
    let file = File::open(path)?;
    let mut header = Vec::with_capacity(MAX_HEADER_OFFSET);
    BufReader::new(file)
        .take(MAX_HEADER_OFFSET as u64)
        .read_to_end(&mut header)?;
    detect_format_from_bytes(&header)
}

/// Detect PDF format from bytes.
///
/// The `%PDF-x.y` header may be preceded by up to 1 KiB of junk, which
/// readers tolerate in practice.
///
/// Returns [`Error::UnsupportedMediaType`] if no header is found.
pub fn detect_format_from_bytes(data: &[u8]) -> Result<PdfFormat> {
    let window = &data[..data.len().min(MAX_HEADER_OFFSET)];
    let start = window
        .windows(PDF_MAGIC_LEN)
        .position(|w| w == PDF_MAGIC)
        .ok_or_else(|| Error::UnsupportedMediaType("missing %PDF- header".to_string()))?;

    let version_start = start + PDF_MAGIC_LEN;
    let version_bytes = data
        .get(version_start..version_start + VERSION_LEN)
        .ok_or_else(|| Error::UnsupportedMediaType("truncated PDF header".to_string()))?;
    let version = String::from_utf8_lossy(version_bytes).to_string();

    if !is_valid_version(&version) {
        return Err(Error::UnsupportedMediaType(format!(
            "invalid PDF version '{}'",
            version
        )));
    }

    Ok(PdfFormat { version })
}

/// Check if a version string looks like `d.d`.
fn is_valid_version(version: &str) -> bool {
    let bytes = version.as_bytes();
    bytes.len() == 3 && bytes[0].is_ascii_digit() && bytes[1] == b'.' && bytes[2].is_ascii_digit()
}

/// Check if a file is a PDF.
pub fn is_pdf<P: AsRef<Path>>(path: P) -> bool {
    detect_format_from_path(path).is_ok()
}

/// Check if bytes start with a PDF header.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    detect_format_from_bytes(data).is_ok()
}

/// Decide from submission metadata whether an item should be treated as a PDF.
///
/// A content type mentioning "pdf" (any case) or a name ending in `.pdf`
/// qualifies. An item with neither a name nor a content type is assumed to
/// be a PDF and left for the parser to judge.
pub fn is_pdf_submission(name: Option<&str>, content_type: Option<&str>) -> bool {
    let name = name.filter(|n| !n.is_empty());
    let content_type = content_type.filter(|c| !c.is_empty());

    if let Some(ct) = content_type {
        if ct.to_ascii_lowercase().contains("pdf") {
            return true;
        }
    }
    if let Some(n) = name {
        if n.to_ascii_lowercase().ends_with(".pdf") {
            return true;
        }
    }
    name.is_none() && content_type.is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_binary_comment_header() {
        let format = detect_format_from_bytes(b"%PDF-2.0\r\n%\x80\x81\x82\x83").unwrap();
        assert_eq!(format.to_string(), "PDF 2.0");
    }

    #[test]
    fn test_detect_with_leading_junk() {
        let data = b"\xef\xbb\xbf\r\n%PDF-1.4\n";
        assert_eq!(detect_format_from_bytes(data).unwrap().version, "1.4");
    }

    #[test]
    fn test_detect_html_is_rejected() {
        let result = detect_format_from_bytes(b"<!DOCTYPE html>");
        assert!(matches!(result, Err(Error::UnsupportedMediaType(_))));
    }

    #[test]
    fn test_detect_truncated_header() {
        assert!(matches!(
            detect_format_from_bytes(b"%PDF-1"),
            Err(Error::UnsupportedMediaType(_))
        ));
        assert!(!is_pdf_bytes(b""));
    }

    #[test]
    fn test_version_shape() {
        assert!(is_valid_version("1.3"));
        assert!(!is_valid_version("1.x"));
        assert!(!is_valid_version("12."));
    }

    #[test]
    fn test_detect_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"%PDF-1.5\n%%EOF\n").unwrap();
        assert!(is_pdf(&path));

        let other = dir.path().join("notes.txt");
        std::fs::write(&other, b"plain text").unwrap();
        assert!(!is_pdf(&other));
    }

    #[test]
    fn test_submission_by_content_type() {
        assert!(is_pdf_submission(None, Some("application/pdf")));
        assert!(is_pdf_submission(Some("scan.bin"), Some("Application/PDF")));
        assert!(!is_pdf_submission(None, Some("image/png")));
    }

    #[test]
    fn test_submission_by_name() {
        assert!(is_pdf_submission(Some("Invoice.PDF"), None));
        assert!(is_pdf_submission(Some("invoice.pdf"), Some("application/octet-stream")));
        assert!(!is_pdf_submission(Some("invoice.docx"), None));
    }

    #[test]
    fn test_submission_without_metadata_is_assumed_pdf() {
        assert!(is_pdf_submission(None, None));
        assert!(is_pdf_submission(Some(""), Some("")));
    }
}
