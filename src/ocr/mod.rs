//! OCR capability used when a page has no native text layer.
//!
//! Two seams are defined here: a [`PageRenderer`] that rasterizes a single
//! page of a PDF, and an [`OcrEngine`] that turns that image into text. Both
//! are injected into the pipeline, so deployments without OCR tooling simply
//! pass no engine (or one that reports itself unavailable).

mod tesseract;

pub use tesseract::{PdftoppmRenderer, TesseractOcr};

use crate::error::Result;

/// Default rendering resolution for OCR.
///
/// Higher values improve recognition accuracy at the cost of render and
/// OCR latency.
pub const DEFAULT_OCR_DPI: u32 = 300;

/// OCR configuration, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrConfig {
    /// Whether OCR fallback is enabled at all
    pub enabled: bool,

    /// Rendering resolution in dots per inch
    pub dpi: u32,

    /// Tesseract language codes (e.g. "eng", "eng+deu")
    pub language: String,

    /// Tesseract page segmentation mode
    pub page_segmentation_mode: u32,
}

impl OcrConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// A configuration with OCR switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Set the rendering resolution.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi.max(1);
        self
    }

    /// Set the OCR language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the page segmentation mode.
    pub fn with_page_segmentation_mode(mut self, psm: u32) -> Self {
        self.page_segmentation_mode = psm;
        self
    }

    /// Rendering parameters derived from this configuration.
    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings { dpi: self.dpi }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dpi: DEFAULT_OCR_DPI,
            language: "eng".to_string(),
            page_segmentation_mode: 3, // fully automatic, no OSD
        }
    }
}

/// Parameters passed to a single page render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    /// Rendering resolution in dots per inch
    pub dpi: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_OCR_DPI,
        }
    }
}

/// A rasterized page.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// Page number (1-indexed)
    pub page_number: u32,

    /// Resolution the page was rendered at
    pub dpi: u32,

    /// Encoded image bytes (PNG)
    pub data: Vec<u8>,
}

impl PageImage {
    /// Create a new page image.
    pub fn new(page_number: u32, dpi: u32, data: Vec<u8>) -> Self {
        Self {
            page_number,
            dpi,
            data,
        }
    }
}

/// Rasterizes one page of a PDF.
pub trait PageRenderer: Send + Sync {
    /// Render exactly `page_number` (1-indexed) of `pdf`.
    fn render_page(
        &self,
        pdf: &[u8],
        page_number: u32,
        settings: &RenderSettings,
    ) -> Result<PageImage>;
}

/// Recognizes text in a page image.
pub trait OcrEngine: Send + Sync {
    /// Whether the engine can be used in this deployment.
    fn is_available(&self) -> bool;

    /// Recognize the text in `image`.
    fn image_to_text(&self, image: &PageImage) -> Result<String>;
}
