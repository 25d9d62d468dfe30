//! # pdftext
//!
//! Hybrid PDF text extraction: native text layer first, OCR per page only
//! where a page has none, followed by key/value field and table extraction.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdftext::{DocumentPipeline, ExtractionRuleSet, OcrConfig};
//!
//! fn main() -> pdftext::Result<()> {
//!     let pipeline = DocumentPipeline::with_tesseract(OcrConfig::default());
//!     let rules = ExtractionRuleSet::new([("invoice_no", r"Invoice:\s*(\d+)")])?;
//!
//!     let data = std::fs::read("invoice.pdf")?;
//!     let result = pipeline.run(&data, Some(&rules), None)?;
//!     println!("{:?}", result.text_fields);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Hybrid text**: OCR is paid per page, only for pages without a text layer
//! - **Normalization**: whitespace runs and blank lines collapsed
//! - **Fields**: caller rules or automatic "key: value" discovery
//! - **Tables**: ruling-line and text-alignment detection with a fallback profile
//! - **Request shapes**: batch, single-file and bare-list JSON bodies
//! - **Parallel processing**: pages resolved with Rayon (`parallel` feature)

pub mod detect;
pub mod error;
pub mod extract;
pub mod model;
pub mod ocr;
pub mod parser;
pub mod service;

// Re-export commonly used types
pub use detect::{detect_format_from_bytes, detect_format_from_path, is_pdf, PdfFormat};
pub use error::{Error, Result};
pub use extract::{
    normalize, DocumentPipeline, ExtractionRuleSet, FieldExtractor, PageTextResolver,
    PipelineOptions, TableExtractor, TableScope, TextNormalizer,
};
pub use model::{
    DocumentResult, ExtractionStats, FieldMap, PageText, RawTable, TableRecord, TableRow,
    TextSource,
};
pub use ocr::{OcrConfig, OcrEngine, PageImage, PageRenderer, RenderSettings};
pub use parser::{LayoutBackend, LayoutProvider, LopdfBackend, LopdfProvider, TableSettings};
pub use service::{ExtractRequest, ExtractResponse, ExtractService, ResponseMode, Submission};

use std::path::Path;

/// Extract the text of a PDF file from its native text layer.
///
/// # Example
///
/// ```no_run
/// let text = pdftext::extract_text("document.pdf").unwrap();
/// println!("{}", text);
/// ```
pub fn extract_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let data = std::fs::read(path)?;
    Ok(DocumentPipeline::lopdf().extract_pages(&data)?.raw_text)
}

/// Resolve the pages of a PDF held in memory, native text only.
pub fn extract_bytes(data: &[u8]) -> Result<DocumentResult> {
    DocumentPipeline::lopdf().extract_pages(data)
}

/// Extract fields (and tables, if `table_settings` is given) from a PDF in memory.
///
/// # Example
///
/// ```no_run
/// use pdftext::{extract_fields, TableSettings};
///
/// let data = std::fs::read("statement.pdf").unwrap();
/// let settings = TableSettings::new().with("vertical_strategy", "text");
/// let result = extract_fields(&data, None, Some(&settings)).unwrap();
/// for (key, value) in &result.text_fields {
///     println!("{key}: {value}");
/// }
/// ```
pub fn extract_fields(
    data: &[u8],
    rules: Option<&ExtractionRuleSet>,
    table_settings: Option<&TableSettings>,
) -> Result<DocumentResult> {
    DocumentPipeline::lopdf().run(data, rules, table_settings)
}
