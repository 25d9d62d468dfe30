//! Error types for pdftext.

use std::io;
use thiserror::Error;

/// Result type alias for pdftext operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting a document.
///
/// Page-level shortfalls are not errors: a page whose native text
/// and OCR both come back empty is reported as [`TextSource::Degraded`]
/// on the page, not as an error.
///
/// [`TextSource::Degraded`]: crate::model::TextSource::Degraded
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input bytes are not a parseable PDF document.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// The document parsed but contains no pages.
    #[error("PDF has no pages")]
    EmptyDocument,

    /// The submitted item is not recognized as a PDF.
    #[error("Not a PDF: {0}")]
    UnsupportedMediaType(String),

    /// The `contentBytes` payload is not valid base64.
    #[error("Invalid base64 content: {0}")]
    InvalidBase64(String),

    /// An extraction rule pattern failed to compile.
    #[error("Invalid extraction rule '{key}': {message}")]
    InvalidRule {
        /// Field name of the offending rule.
        key: String,
        /// Compiler error message.
        message: String,
    },

    /// Rasterizing a page for OCR failed.
    #[error("Page rendering error: {0}")]
    Render(String),

    /// The OCR engine failed on a page image.
    #[error("OCR error: {0}")]
    Ocr(String),

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// Error reading the structure of an already-loaded document.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::InvalidBase64(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::EmptyDocument;
        assert_eq!(err.to_string(), "PDF has no pages");

        let err = Error::PageOutOfRange(10, 5);
        assert_eq!(
            err.to_string(),
            "Page 10 is out of range (document has 5 pages)"
        );

        let err = Error::InvalidRule {
            key: "total".to_string(),
            message: "unclosed group".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid extraction rule 'total': unclosed group"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_base64_error_conversion() {
        use base64::Engine;
        let err: Error = base64::engine::general_purpose::STANDARD
            .decode("not base64!!")
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::InvalidBase64(_)));
    }
}
