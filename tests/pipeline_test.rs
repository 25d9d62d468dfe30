//! Integration tests for the document pipeline with in-memory providers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pdftext::error::{Error, Result};
use pdftext::{
    DocumentPipeline, ExtractionRuleSet, LayoutBackend, LayoutProvider, OcrConfig, OcrEngine,
    PageImage, PageRenderer, PipelineOptions, RawTable, RenderSettings, TableRecord, TableScope,
    TableSettings, TextSource,
};

const PDF: &[u8] = b"%PDF-1.7\n";

fn grid(rows: &[&[&str]]) -> RawTable {
    rows.iter()
        .map(|r| r.iter().map(|c| Some(c.to_string())).collect())
        .collect()
}

/// A document whose pages and tables are given up front.
#[derive(Clone, Default)]
struct FakeDocument {
    pages: Vec<String>,
    /// Tables per page, found with any settings
    tables: Vec<(u32, RawTable)>,
    /// Tables on page 1 found only with text-aligned rows
    text_aligned_tables: Vec<RawTable>,
    text_calls: Arc<AtomicUsize>,
    table_calls: Arc<Mutex<Vec<(u32, TableSettings)>>>,
}

impl FakeDocument {
    fn with_pages(pages: &[&str]) -> Self {
        Self {
            pages: pages.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }
}

impl LayoutBackend for FakeDocument {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_text(&self, page_number: u32) -> Result<String> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(page_number as usize - 1)
            .cloned()
            .ok_or(Error::PageOutOfRange(page_number, self.page_count()))
    }

    fn extract_tables(&self, page_number: u32, settings: &TableSettings) -> Result<Vec<RawTable>> {
        self.table_calls
            .lock()
            .unwrap()
            .push((page_number, settings.clone()));

        let mut found: Vec<RawTable> = self
            .tables
            .iter()
            .filter(|(page, _)| *page == page_number)
            .map(|(_, table)| table.clone())
            .collect();
        let text_rows = settings.get("horizontal_strategy").and_then(|v| v.as_str()) == Some("text");
        if page_number == 1 && text_rows {
            found.extend(self.text_aligned_tables.iter().cloned());
        }
        Ok(found)
    }
}

struct FakeProvider {
    document: FakeDocument,
}

impl LayoutProvider for FakeProvider {
    fn load(&self, data: &[u8]) -> Result<Box<dyn LayoutBackend>> {
        if !data.starts_with(b"%PDF") {
            return Err(Error::MalformedDocument("no PDF header".to_string()));
        }
        Ok(Box::new(self.document.clone()))
    }
}

/// OCR that reads "scanned page N", or fails on selected pages.
#[derive(Default)]
struct FakeOcr {
    failing_pages: Vec<u32>,
    calls: Mutex<Vec<u32>>,
}

impl OcrEngine for FakeOcr {
    fn is_available(&self) -> bool {
        true
    }

    fn image_to_text(&self, image: &PageImage) -> Result<String> {
        self.calls.lock().unwrap().push(image.page_number);
        if self.failing_pages.contains(&image.page_number) {
            return Err(Error::Ocr(format!("cannot read page {}", image.page_number)));
        }
        Ok(format!("scanned   page {}\n\n\n", image.page_number))
    }
}

struct FakeRenderer;

impl PageRenderer for FakeRenderer {
    fn render_page(&self, pdf: &[u8], page_number: u32, settings: &RenderSettings) -> Result<PageImage> {
        assert_eq!(pdf, PDF);
        Ok(PageImage::new(page_number, settings.dpi, Vec::new()))
    }
}

fn pipeline(document: FakeDocument) -> DocumentPipeline {
    DocumentPipeline::new(Arc::new(FakeProvider { document }))
}

fn pipeline_with_ocr(document: FakeDocument, ocr: Arc<FakeOcr>) -> DocumentPipeline {
    pipeline(document).with_ocr(ocr, Arc::new(FakeRenderer), OcrConfig::default())
}

#[test]
fn test_pages_are_numbered_one_to_n() {
    let document = FakeDocument::with_pages(&["one", "two", "three", "four", "five"]);
    let result = pipeline(document).run(PDF, None, None).unwrap();

    assert_eq!(result.page_count, 5);
    let numbers: Vec<u32> = result.pages.iter().map(|p| p.page_number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    assert!(result.is_complete());
    assert_eq!(result.raw_text, "one\ntwo\nthree\nfour\nfive");
}

#[test]
fn test_empty_document_never_resolves_pages() {
    let document = FakeDocument::default();
    let text_calls = document.text_calls.clone();
    let ocr = Arc::new(FakeOcr::default());

    let err = pipeline_with_ocr(document, ocr.clone())
        .run(PDF, None, None)
        .unwrap_err();

    assert!(matches!(err, Error::EmptyDocument));
    assert_eq!(err.to_string(), "PDF has no pages");
    assert_eq!(text_calls.load(Ordering::SeqCst), 0);
    assert!(ocr.calls.lock().unwrap().is_empty());
}

#[test]
fn test_malformed_input() {
    let err = pipeline(FakeDocument::with_pages(&["x"]))
        .run(b"GIF89a", None, None)
        .unwrap_err();
    assert!(matches!(err, Error::MalformedDocument(_)));
}

#[test]
fn test_ocr_failure_does_not_stop_later_pages() {
    let document = FakeDocument::with_pages(&["Intro", "", "  \n ", "End"]);
    let ocr = Arc::new(FakeOcr {
        failing_pages: vec![2],
        ..Default::default()
    });

    let result = pipeline_with_ocr(document, ocr.clone())
        .run(PDF, None, None)
        .unwrap();

    let sources: Vec<TextSource> = result.pages.iter().map(|p| p.source).collect();
    assert_eq!(
        sources,
        vec![TextSource::Native, TextSource::Degraded, TextSource::Ocr, TextSource::Native]
    );
    assert_eq!(result.pages[1].text, "");
    assert_eq!(result.pages[2].text, "scanned page 3");
    assert_eq!(result.raw_text, "Intro\nscanned page 3\nEnd");

    // OCR only ran for the pages without native text.
    assert_eq!(*ocr.calls.lock().unwrap(), vec![2, 3]);
}

#[test]
fn test_without_ocr_empty_pages_degrade() {
    let result = pipeline(FakeDocument::with_pages(&["", "text"]))
        .run(PDF, None, None)
        .unwrap();

    assert_eq!(result.pages[0].source, TextSource::Degraded);
    assert_eq!(result.raw_text, "text");
    assert_eq!(result.stats().degraded_pages, 1);
}

#[test]
fn test_parallel_matches_sequential() {
    let pages: Vec<String> = (1..=24)
        .map(|i| if i % 3 == 0 { String::new() } else { format!("Page {}:  body {}", i, i) })
        .collect();
    let page_refs: Vec<&str> = pages.iter().map(String::as_str).collect();
    let document = FakeDocument::with_pages(&page_refs);

    let sequential = pipeline_with_ocr(document.clone(), Arc::new(FakeOcr::default()))
        .run(PDF, None, None)
        .unwrap();

    let ocr = Arc::new(FakeOcr {
        failing_pages: vec![9],
        ..Default::default()
    });
    let parallel = pipeline_with_ocr(document, ocr.clone())
        .with_options(PipelineOptions::new().with_parallel(true))
        .run(PDF, None, None)
        .unwrap();

    let numbers: Vec<u32> = parallel.pages.iter().map(|p| p.page_number).collect();
    assert_eq!(numbers, (1..=24).collect::<Vec<_>>());
    assert_eq!(parallel.pages[8].source, TextSource::Degraded);
    for (a, b) in sequential.pages.iter().zip(&parallel.pages) {
        if b.page_number != 9 {
            assert_eq!(a, b);
        }
    }

    let mut calls = ocr.calls.lock().unwrap().clone();
    calls.sort_unstable();
    assert_eq!(calls, vec![3, 6, 9, 12, 15, 18, 21, 24]);
}

#[test]
fn test_expired_deadline_skips_pages() {
    let result = pipeline(FakeDocument::with_pages(&["a", "b", "c"]))
        .with_options(PipelineOptions::new().with_deadline(Duration::ZERO))
        .run(PDF, None, None)
        .unwrap();

    assert!(result.timed_out);
    assert!(!result.is_complete());
    assert!(result.pages.is_empty());
    assert_eq!(result.stats().skipped_pages, 3);
}

#[test]
fn test_generous_deadline_completes() {
    let result = pipeline(FakeDocument::with_pages(&["a", "b"]))
        .with_options(PipelineOptions::new().with_deadline(Duration::from_secs(60)))
        .run(PDF, None, None)
        .unwrap();
    assert!(!result.timed_out);
    assert_eq!(result.pages.len(), 2);
}

#[test]
fn test_rule_driven_fields_over_all_pages() {
    let document = FakeDocument::with_pages(&["Invoice: 1234", "Date: 2024-01-01"]);
    let rules = ExtractionRuleSet::new([
        ("invoice_no", r"Invoice:\s*(\d+)"),
        ("date", r"date:\s*(\S+)"),
        ("po", r"PO:\s*(\w+)"),
    ])
    .unwrap();

    let result = pipeline(document).run(PDF, Some(&rules), None).unwrap();

    assert_eq!(result.text_fields.len(), 2);
    assert_eq!(result.text_fields["invoice_no"], "1234");
    assert_eq!(result.text_fields["date"], "2024-01-01");
}

#[test]
fn test_auto_discovery_without_rules() {
    let document = FakeDocument::with_pages(&[
        "Name: Alice\nTotal Amount Due For This Very Long Invoice Description: 99",
    ]);
    let result = pipeline(document).run(PDF, None, None).unwrap();

    assert_eq!(result.text_fields.len(), 1);
    assert_eq!(result.text_fields["Name"], "Alice");
}

#[test]
fn test_extract_pages_skips_fields_and_tables() {
    let mut document = FakeDocument::with_pages(&["Name: Alice"]);
    document.tables = vec![(1, grid(&[&["a", "b"], &["1", "2"]]))];
    let calls = document.table_calls.clone();

    let result = pipeline(document).extract_pages(PDF).unwrap();

    assert!(result.text_fields.is_empty());
    assert!(result.tables.is_empty());
    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn test_tables_require_settings() {
    let mut document = FakeDocument::with_pages(&["x"]);
    document.tables = vec![(1, grid(&[&["Name", "Age"], &["Bob", "30"]]))];
    let calls = document.table_calls.clone();

    let result = pipeline(document).run(PDF, None, None).unwrap();

    assert!(result.tables.is_empty());
    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn test_tables_from_first_page_by_default() {
    let mut document = FakeDocument::with_pages(&["x", "y"]);
    document.tables = vec![
        (1, grid(&[&["Name", "Age"], &["Bob", "30"]])),
        (2, grid(&[&["Item"], &["Widget"]])),
    ];
    let calls = document.table_calls.clone();
    let settings = TableSettings::new().with("vertical_strategy", "lines");

    let result = pipeline(document).run(PDF, None, Some(&settings)).unwrap();

    assert_eq!(result.tables.len(), 1);
    let rows = result.tables[0].rows().unwrap();
    assert_eq!(rows[0]["name"], "Bob");
    assert_eq!(rows[0]["age"], "30");

    // Primary settings found a table, so no fallback attempt was made.
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], (1, settings));
}

#[test]
fn test_tables_from_all_pages() {
    let mut document = FakeDocument::with_pages(&["x", "y"]);
    document.tables = vec![
        (1, grid(&[&["Name", "Age"], &["Bob", "30"]])),
        (2, grid(&[&["Item"], &["Widget"]])),
    ];
    let settings = TableSettings::new().with("snap_tolerance", 2);

    let result = pipeline(document)
        .with_options(PipelineOptions::new().with_table_scope(TableScope::AllPages))
        .run(PDF, None, Some(&settings))
        .unwrap();

    assert_eq!(result.tables.len(), 2);
    assert_eq!(result.tables[1].rows().unwrap()[0]["item"], "Widget");
}

#[test]
fn test_fallback_profile_engages_when_primary_finds_nothing() {
    let mut document = FakeDocument::with_pages(&["x"]);
    document.text_aligned_tables = vec![grid(&[&["Total", "12"]])];
    let calls = document.table_calls.clone();
    let settings = TableSettings::new()
        .with("vertical_strategy", "lines")
        .with("intersection_y_tolerance", 4);

    let result = pipeline(document).run(PDF, None, Some(&settings)).unwrap();

    assert_eq!(
        result.tables,
        vec![TableRecord::Raw(vec![vec![
            Some("Total".to_string()),
            Some("12".to_string())
        ]])]
    );

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    let fallback = &calls[1].1;
    assert_eq!(fallback.get("vertical_strategy").and_then(|v| v.as_str()), Some("lines"));
    assert_eq!(fallback.get("horizontal_strategy").and_then(|v| v.as_str()), Some("text"));
    assert_eq!(fallback.get("intersection_y_tolerance").and_then(|v| v.as_i64()), Some(4));
}

#[test]
fn test_table_with_only_empty_data_rows_is_omitted() {
    let mut document = FakeDocument::with_pages(&["x"]);
    document.tables = vec![(1, grid(&[&["Name", "Age"], &["", ""]]))];
    let settings = TableSettings::new().with("vertical_strategy", "text");

    let result = pipeline(document).run(PDF, None, Some(&settings)).unwrap();
    assert!(result.tables.is_empty());
}
