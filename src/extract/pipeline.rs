//! Document orchestration: load, resolve pages, extract fields and tables.

use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::model::{DocumentResult, PageText};
use crate::ocr::{
    OcrConfig, OcrEngine, PageImage, PageRenderer, PdftoppmRenderer, RenderSettings, TesseractOcr,
};
use crate::parser::{LayoutBackend, LayoutProvider, LopdfProvider, TableSettings};

use super::fields::{ExtractionRuleSet, FieldExtractor};
use super::page::PageTextResolver;
use super::tables::{BackendPage, TableExtractor};

/// Which pages are searched for tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableScope {
    /// Only the first page
    #[default]
    FirstPage,
    /// Every resolved page, in order
    AllPages,
}

/// Options for a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Resolve pages on the rayon thread pool
    pub parallel: bool,

    /// Pages not started within this time of the run start are skipped
    pub deadline: Option<Duration>,

    /// Which pages are searched for tables
    pub table_scope: TableScope,
}

impl PipelineOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable parallel page resolution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set a per-document deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set the table scope.
    pub fn with_table_scope(mut self, scope: TableScope) -> Self {
        self.table_scope = scope;
        self
    }

    /// Search every page for tables.
    pub fn all_pages_tables(mut self) -> Self {
        self.table_scope = TableScope::AllPages;
        self
    }
}

/// End-to-end extraction for one document at a time.
///
/// # Example
///
/// ```no_run
/// use pdftext::{DocumentPipeline, OcrConfig};
///
/// let pipeline = DocumentPipeline::with_tesseract(OcrConfig::default());
/// let bytes = std::fs::read("invoice.pdf").unwrap();
/// let result = pipeline.run(&bytes, None, None).unwrap();
/// println!("{}", result.raw_text);
/// ```
#[derive(Clone)]
pub struct DocumentPipeline {
    provider: Arc<dyn LayoutProvider>,
    renderer: Option<Arc<dyn PageRenderer>>,
    resolver: PageTextResolver,
    fields: FieldExtractor,
    tables: TableExtractor,
    options: PipelineOptions,
}

impl std::fmt::Debug for DocumentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentPipeline")
            .field("resolver", &self.resolver)
            .field("has_renderer", &self.renderer.is_some())
            .field("options", &self.options)
            .finish()
    }
}

impl DocumentPipeline {
    /// Create a pipeline over `provider` that uses native text only.
    pub fn new(provider: Arc<dyn LayoutProvider>) -> Self {
        Self {
            provider,
            renderer: None,
            resolver: PageTextResolver::native_only(),
            fields: FieldExtractor::new(),
            tables: TableExtractor::new(),
            options: PipelineOptions::default(),
        }
    }

    /// A native-text pipeline over `lopdf`.
    pub fn lopdf() -> Self {
        Self::new(Arc::new(LopdfProvider::new()))
    }

    /// A `lopdf` pipeline with tesseract OCR fallback, if the tools are installed.
    pub fn with_tesseract(config: OcrConfig) -> Self {
        let engine = TesseractOcr::detect(&config);
        Self::lopdf().with_ocr(Arc::new(engine), Arc::new(PdftoppmRenderer::new()), config)
    }

    /// Attach an OCR engine and the renderer that feeds it.
    pub fn with_ocr(
        mut self,
        engine: Arc<dyn OcrEngine>,
        renderer: Arc<dyn PageRenderer>,
        config: OcrConfig,
    ) -> Self {
        self.resolver = PageTextResolver::new(Some(engine), config);
        self.renderer = Some(renderer);
        self
    }

    /// Set run options.
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Run options in effect.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Whether pages without native text will be OCR'd.
    pub fn ocr_enabled(&self) -> bool {
        self.renderer.is_some() && self.resolver.ocr_enabled()
    }

    /// Extract everything from `data`: pages, raw text, fields and tables.
    ///
    /// Fields are rule-driven when `rules` is non-empty and auto-discovered
    /// otherwise. Tables are only extracted when `table_settings` is
    /// non-empty.
    pub fn run(
        &self,
        data: &[u8],
        rules: Option<&ExtractionRuleSet>,
        table_settings: Option<&TableSettings>,
    ) -> Result<DocumentResult> {
        let backend = self.provider.load(data)?;
        let mut result = self.resolve_document(backend.as_ref(), data)?;

        result.text_fields = self.fields.extract(&result.raw_text, rules);

        if table_settings.is_some_and(|s| !s.is_empty()) {
            let pages: Vec<u32> = match self.options.table_scope {
                TableScope::FirstPage => vec![1],
                TableScope::AllPages => result.pages.iter().map(|p| p.page_number).collect(),
            };
            for page_number in pages {
                let page = BackendPage::new(backend.as_ref(), page_number);
                result.tables.extend(self.tables.extract(&page, table_settings));
            }
        }

        log::info!(
            "Extracted {} fields and {} tables from {} pages",
            result.text_fields.len(),
            result.tables.len(),
            result.page_count
        );
        Ok(result)
    }

    /// Resolve page text only; fields and tables are left empty.
    pub fn extract_pages(&self, data: &[u8]) -> Result<DocumentResult> {
        let backend = self.provider.load(data)?;
        self.resolve_document(backend.as_ref(), data)
    }

    fn resolve_document(&self, backend: &dyn LayoutBackend, data: &[u8]) -> Result<DocumentResult> {
        let page_count = backend.page_count();
        if page_count == 0 {
            return Err(Error::EmptyDocument);
        }

        let started = Instant::now();
        let expired = || self.options.deadline.is_some_and(|d| started.elapsed() >= d);
        let resolve = |page_number: u32| -> Option<PageText> {
            if expired() {
                return None;
            }
            Some(self.resolve_page(backend, data, page_number))
        };

        let resolved: Vec<Option<PageText>> = if self.use_parallel() {
            #[cfg(feature = "parallel")]
            {
                (1..=page_count).into_par_iter().map(resolve).collect()
            }
            #[cfg(not(feature = "parallel"))]
            {
                (1..=page_count).map(resolve).collect()
            }
        } else {
            let mut pages = Vec::with_capacity(page_count as usize);
            for page_number in 1..=page_count {
                match resolve(page_number) {
                    Some(page) => pages.push(Some(page)),
                    None => break,
                }
            }
            pages
        };

        let pages: Vec<PageText> = resolved.into_iter().flatten().collect();
        let timed_out = pages.len() < page_count as usize;
        if timed_out {
            log::warn!(
                "Deadline expired: resolved {} of {} pages",
                pages.len(),
                page_count
            );
        }

        let raw_text = pages
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let result = DocumentResult {
            page_count,
            pages,
            raw_text,
            timed_out,
            ..Default::default()
        };

        let stats = result.stats();
        log::debug!(
            "Resolved {} pages: {} native, {} ocr, {} degraded",
            result.pages.len(),
            stats.native_pages,
            stats.ocr_pages,
            stats.degraded_pages
        );
        Ok(result)
    }

    fn use_parallel(&self) -> bool {
        if self.options.parallel && cfg!(not(feature = "parallel")) {
            log::debug!("parallel feature disabled, resolving pages sequentially");
        }
        self.options.parallel && cfg!(feature = "parallel")
    }

    fn resolve_page(&self, backend: &dyn LayoutBackend, data: &[u8], page_number: u32) -> PageText {
        let native = backend.page_text(page_number).unwrap_or_else(|e| {
            log::warn!("Native text extraction failed for page {}: {}", page_number, e);
            String::new()
        });

        self.resolver
            .resolve(page_number, Some(&native), |settings: &RenderSettings| -> Result<PageImage> {
                match &self.renderer {
                    Some(renderer) => renderer.render_page(data, page_number, settings),
                    None => Err(Error::Render("no page renderer configured".to_string())),
                }
            })
    }
}
