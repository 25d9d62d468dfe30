//! Per-page text resolution: native text layer first, OCR as fallback.

use std::sync::Arc;

use crate::error::Result;
use crate::model::PageText;
use crate::ocr::{OcrConfig, OcrEngine, PageImage, RenderSettings};

use super::normalize::TextNormalizer;

/// Decides, per page, where its text comes from.
///
/// OCR is attempted only for pages whose normalized native text is empty,
/// and only when the configuration enables it and the injected engine
/// reports itself available. Render and OCR failures are logged and the
/// page is reported as degraded; they never surface as errors.
#[derive(Clone)]
pub struct PageTextResolver {
    ocr: Option<Arc<dyn OcrEngine>>,
    config: OcrConfig,
    normalizer: TextNormalizer,
}

impl std::fmt::Debug for PageTextResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageTextResolver")
            .field("ocr", &self.ocr.as_ref().map(|e| e.is_available()))
            .field("config", &self.config)
            .finish()
    }
}

impl PageTextResolver {
    /// Create a resolver with an optional OCR engine.
    pub fn new(ocr: Option<Arc<dyn OcrEngine>>, config: OcrConfig) -> Self {
        Self {
            ocr,
            config,
            normalizer: TextNormalizer::new(),
        }
    }

    /// A resolver that never attempts OCR.
    pub fn native_only() -> Self {
        Self::new(None, OcrConfig::disabled())
    }

    /// OCR configuration in effect.
    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Whether a page without native text would be sent to OCR.
    pub fn ocr_enabled(&self) -> bool {
        self.config.enabled && self.ocr.as_ref().is_some_and(|e| e.is_available())
    }

    /// Resolve the text of page `page_number`.
    ///
    /// `render_page` rasterizes exactly this page; it is called at most once
    /// and only when OCR is needed.
    pub fn resolve<F>(&self, page_number: u32, native_text: Option<&str>, render_page: F) -> PageText
    where
        F: FnOnce(&RenderSettings) -> Result<PageImage>,
    {
        let native = native_text
            .map(|t| self.normalizer.normalize(t))
            .unwrap_or_default();
        if !native.is_empty() {
            log::debug!("Page {}: native text ({} chars)", page_number, native.len());
            return PageText::native(page_number, native);
        }

        let engine = match &self.ocr {
            Some(engine) if self.config.enabled && engine.is_available() => engine,
            _ => {
                log::debug!("Page {}: no native text and OCR unavailable", page_number);
                return PageText::degraded(page_number);
            }
        };

        log::debug!(
            "Page {}: no native text, running OCR at {} dpi",
            page_number,
            self.config.dpi
        );
        let recognized = render_page(&self.config.render_settings())
            .and_then(|image| engine.image_to_text(&image));

        match recognized {
            Ok(text) => {
                let text = self.normalizer.normalize(&text);
                if text.is_empty() {
                    log::debug!("Page {}: OCR produced no text", page_number);
                    PageText::degraded(page_number)
                } else {
                    PageText::ocr(page_number, text)
                }
            }
            Err(e) => {
                log::warn!("OCR failed for page {}: {}", page_number, e);
                PageText::degraded(page_number)
            }
        }
    }
}
