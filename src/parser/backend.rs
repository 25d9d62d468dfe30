//! Document layout backend abstraction.
//!
//! The extraction pipeline only needs three things from a PDF library: the
//! page count, each page's native text layer, and table regions for a page.
//! [`LayoutBackend`] captures exactly that, so the pipeline can be driven by
//! `lopdf` in production and by in-memory fakes in tests.

use std::collections::BTreeMap;

use lopdf::{Document as LopdfDocument, Object, ObjectId};

use crate::detect::detect_format_from_bytes;
use crate::error::{Error, Result};
use crate::model::RawTable;

use super::content::{decode_page, PageLayout};
use super::options::TableSettings;
use super::table_finder::TableFinder;

/// A loaded document.
pub trait LayoutBackend: Send + Sync {
    /// Number of pages.
    fn page_count(&self) -> u32;

    /// Native text layer of a page (1-indexed). May be empty.
    fn page_text(&self, page_number: u32) -> Result<String>;

    /// Raw tables found on a page (1-indexed) with the given settings.
    fn extract_tables(&self, page_number: u32, settings: &TableSettings) -> Result<Vec<RawTable>>;
}

/// Loads documents from bytes.
pub trait LayoutProvider: Send + Sync {
    /// Parse `data` into a document.
    ///
    /// Fails with [`Error::MalformedDocument`] when the bytes are not a
    /// parseable PDF.
    fn load(&self, data: &[u8]) -> Result<Box<dyn LayoutBackend>>;
}

/// [`LayoutProvider`] backed by `lopdf`.
#[derive(Debug, Clone, Default)]
pub struct LopdfProvider {
    _private: (),
}

impl LopdfProvider {
    /// Create a new provider.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl LayoutProvider for LopdfProvider {
    fn load(&self, data: &[u8]) -> Result<Box<dyn LayoutBackend>> {
        Ok(Box::new(LopdfBackend::load_bytes(data)?))
    }
}

/// Concrete [`LayoutBackend`] backed by `lopdf::Document`.
#[derive(Debug)]
pub struct LopdfBackend {
    doc: LopdfDocument,
    pages: BTreeMap<u32, ObjectId>,
}

impl LopdfBackend {
    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        detect_format_from_bytes(data)
            .map_err(|e| Error::MalformedDocument(e.to_string()))?;

        let doc = LopdfDocument::load_mem(data).map_err(|e| match e {
            lopdf::Error::Decryption(_) => {
                Error::MalformedDocument("document is encrypted".to_string())
            }
            _ => Error::MalformedDocument(e.to_string()),
        })?;

        if doc.is_encrypted() {
            log::warn!("Document is encrypted; text extraction may be incomplete");
        }

        let pages = doc.get_pages();
        Ok(Self { doc, pages })
    }

    /// Load from a file path.
    pub fn load_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::load_bytes(&data)
    }

    /// Get PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    fn page_id(&self, page_number: u32) -> Result<ObjectId> {
        self.pages
            .get(&page_number)
            .copied()
            .ok_or(Error::PageOutOfRange(page_number, self.pages.len() as u32))
    }

    /// Decompressed content stream bytes of a page.
    fn page_content(&self, page_id: ObjectId) -> Result<Vec<u8>> {
        let page_dict = self.doc.get_dictionary(page_id)?;

        let contents = match page_dict.get(b"Contents") {
            Ok(contents) => contents,
            // A page without a content stream is blank.
            Err(_) => return Ok(Vec::new()),
        };

        match contents {
            Object::Reference(r) => match self.doc.get_object(*r) {
                Ok(Object::Stream(s)) => s
                    .decompressed_content()
                    .or_else(|_| Ok(s.content.clone())),
                Ok(Object::Array(arr)) => Ok(self.concat_streams(arr)),
                _ => Err(Error::PdfParse("Invalid content stream".to_string())),
            },
            Object::Array(arr) => Ok(self.concat_streams(arr)),
            _ => Err(Error::PdfParse("Invalid content stream".to_string())),
        }
    }

    fn concat_streams(&self, refs: &[Object]) -> Vec<u8> {
        let mut content = Vec::new();
        for obj in refs {
            if let Object::Reference(r) = obj {
                if let Ok(Object::Stream(s)) = self.doc.get_object(*r) {
                    match s.decompressed_content() {
                        Ok(data) => content.extend_from_slice(&data),
                        Err(_) => content.extend_from_slice(&s.content),
                    }
                    content.push(b' ');
                }
            }
        }
        content
    }

    /// Positioned spans and ruling lines of a page.
    pub fn page_layout(&self, page_number: u32) -> Result<PageLayout> {
        let page_id = self.page_id(page_number)?;
        let fonts = self.doc.get_page_fonts(page_id)?;
        let content = self.page_content(page_id)?;
        if content.is_empty() {
            return Ok(PageLayout::default());
        }
        decode_page(&self.doc, &content, &fonts)
    }
}

impl LayoutBackend for LopdfBackend {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_text(&self, page_number: u32) -> Result<String> {
        self.page_id(page_number)?;
        self.doc
            .extract_text(&[page_number])
            .map_err(|e| Error::PdfParse(format!("Page {}: {}", page_number, e)))
    }

    fn extract_tables(&self, page_number: u32, settings: &TableSettings) -> Result<Vec<RawTable>> {
        let layout = self.page_layout(page_number)?;
        let tables = TableFinder::from_settings(settings).find_tables(&layout);
        log::debug!(
            "Page {}: {} spans, {} rulings, {} tables",
            page_number,
            layout.spans.len(),
            layout.rulings.len(),
            tables.len()
        );
        Ok(tables)
    }
}
