//! Page-level types.

use serde::{Deserialize, Serialize};

/// Where a page's resolved text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    /// Text embedded in the PDF content stream.
    Native,
    /// Text recovered by OCR of the rendered page.
    Ocr,
    /// Neither source produced text; the page resolved to an empty string.
    Degraded,
}

/// Resolved text of a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    /// Page number (1-indexed)
    pub page_number: u32,

    /// Normalized page text (empty for degraded pages)
    pub text: String,

    /// Source of the text
    pub source: TextSource,
}

impl PageText {
    /// Create a page resolved from the native text layer.
    pub fn native(page_number: u32, text: String) -> Self {
        Self {
            page_number,
            text,
            source: TextSource::Native,
        }
    }

    /// Create a page resolved by OCR.
    pub fn ocr(page_number: u32, text: String) -> Self {
        Self {
            page_number,
            text,
            source: TextSource::Ocr,
        }
    }

    /// Create an empty, degraded page.
    pub fn degraded(page_number: u32) -> Self {
        Self {
            page_number,
            text: String::new(),
            source: TextSource::Degraded,
        }
    }

    /// Check if the page resolved to no text.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
