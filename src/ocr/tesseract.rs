//! OCR via the `tesseract` and `pdftoppm` command-line tools.
//!
//! Requires tesseract-ocr and poppler-utils on `PATH`. Each call works in its
//! own temporary directory, so concurrent pages never share files.

use std::io::Write;
use std::process::Command;

use tempfile::{Builder, TempDir};

use crate::error::{Error, Result};

use super::{OcrConfig, OcrEngine, PageImage, PageRenderer, RenderSettings};

fn scratch_dir() -> Result<TempDir> {
    Ok(Builder::new().prefix("pdftext-ocr").tempdir()?)
}

/// Check whether a command-line tool can be spawned.
fn tool_available(program: &str, version_flag: &str) -> bool {
    let found = Command::new(program).arg(version_flag).output().is_ok();
    if !found {
        log::debug!("{} not found on PATH", program);
    }
    found
}

/// Renders single PDF pages to PNG with `pdftoppm`.
#[derive(Debug, Clone, Default)]
pub struct PdftoppmRenderer {
    _private: (),
}

impl PdftoppmRenderer {
    /// Create a new renderer.
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Check whether `pdftoppm` is installed.
    pub fn is_available() -> bool {
        tool_available("pdftoppm", "-v")
    }
}

impl PageRenderer for PdftoppmRenderer {
    fn render_page(
        &self,
        pdf: &[u8],
        page_number: u32,
        settings: &RenderSettings,
    ) -> Result<PageImage> {
        let dir = scratch_dir()?;
        let input = dir.path().join("input.pdf");
        std::fs::File::create(&input)?.write_all(pdf)?;
        let output_prefix = dir.path().join("page");

        let page = page_number.to_string();
        let output = Command::new("pdftoppm")
            .arg("-png")
            .arg("-r")
            .arg(settings.dpi.to_string())
            .arg("-f")
            .arg(&page)
            .arg("-l")
            .arg(&page)
            .arg("-singlefile")
            .arg(&input)
            .arg(&output_prefix)
            .output()
            .map_err(|e| Error::Render(format!("failed to run pdftoppm: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Render(format!(
                "pdftoppm failed on page {}: {}",
                page_number,
                stderr.trim()
            )));
        }

        let data = std::fs::read(output_prefix.with_extension("png")).map_err(|e| {
            Error::Render(format!("pdftoppm produced no image for page {}: {}", page_number, e))
        })?;

        Ok(PageImage::new(page_number, settings.dpi, data))
    }
}

/// OCR engine backed by the `tesseract` binary.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    language: String,
    page_segmentation_mode: u32,
    available: bool,
}

impl TesseractOcr {
    /// Create an engine from configuration, trusting `config.enabled`.
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            language: config.language.clone(),
            page_segmentation_mode: config.page_segmentation_mode,
            available: config.enabled,
        }
    }

    /// Create an engine, probing once for `tesseract` and `pdftoppm`.
    pub fn detect(config: &OcrConfig) -> Self {
        let available =
            config.enabled && tool_available("tesseract", "--version") && PdftoppmRenderer::is_available();
        if config.enabled && !available {
            log::warn!("OCR disabled: install tesseract-ocr and poppler-utils for OCR support");
        }
        Self {
            available,
            ..Self::new(config)
        }
    }

    /// Tesseract language codes in use.
    pub fn language(&self) -> &str {
        &self.language
    }
}

impl OcrEngine for TesseractOcr {
    fn is_available(&self) -> bool {
        self.available
    }

    fn image_to_text(&self, image: &PageImage) -> Result<String> {
        let dir = scratch_dir()?;
        let image_path = dir.path().join("page.png");
        std::fs::File::create(&image_path)?.write_all(&image.data)?;

        let output = Command::new("tesseract")
            .arg(&image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.page_segmentation_mode.to_string())
            .arg("--dpi")
            .arg(image.dpi.to_string())
            .output()
            .map_err(|e| {
                Error::Ocr(format!(
                    "failed to run tesseract on page {}: {}",
                    image.page_number, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Ocr(format!(
                "tesseract failed on page {}: {}",
                image.page_number,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
