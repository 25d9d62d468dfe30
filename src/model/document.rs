//! Document-level types.

use serde::{Deserialize, Serialize};

use super::{FieldMap, PageText, TableRecord, TextSource};

/// Everything extracted from one document in a single pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentResult {
    /// Number of pages reported by the layout backend
    pub page_count: u32,

    /// Resolved pages, in page order
    pub pages: Vec<PageText>,

    /// Non-empty page texts joined with a single newline
    pub raw_text: String,

    /// Extracted key/value fields
    pub text_fields: FieldMap,

    /// Extracted tables (empty unless table settings were supplied)
    pub tables: Vec<TableRecord>,

    /// Whether the deadline expired before every page was resolved
    pub timed_out: bool,
}

impl DocumentResult {
    /// Get a resolved page by number (1-indexed).
    pub fn get_page(&self, page_number: u32) -> Option<&PageText> {
        self.pages.iter().find(|p| p.page_number == page_number)
    }

    /// Check whether every page of the document was resolved.
    pub fn is_complete(&self) -> bool {
        !self.timed_out && self.pages.len() as u32 == self.page_count
    }

    /// Summarize how the pages were resolved.
    pub fn stats(&self) -> ExtractionStats {
        let mut stats = ExtractionStats {
            page_count: self.page_count,
            ..Default::default()
        };
        for page in &self.pages {
            match page.source {
                TextSource::Native => stats.native_pages += 1,
                TextSource::Ocr => stats.ocr_pages += 1,
                TextSource::Degraded => stats.degraded_pages += 1,
            }
        }
        stats.skipped_pages = self.page_count.saturating_sub(self.pages.len() as u32);
        stats.char_count = self.raw_text.chars().count();
        stats
    }
}

/// Per-document resolution statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Pages in the document
    pub page_count: u32,
    /// Pages resolved from the native text layer
    pub native_pages: u32,
    /// Pages resolved by OCR
    pub ocr_pages: u32,
    /// Pages that resolved to empty text
    pub degraded_pages: u32,
    /// Pages never attempted because the deadline expired
    pub skipped_pages: u32,
    /// Characters in the joined raw text
    pub char_count: usize,
}
