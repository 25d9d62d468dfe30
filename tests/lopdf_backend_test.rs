//! Integration tests for the lopdf backend on generated documents.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use pdftext::error::Error;
use pdftext::{
    extract_bytes, extract_fields, LayoutBackend, LopdfBackend, TableSettings, TextSource,
};

/// A text placement: (x, y, text).
type Placement<'a> = (i64, i64, &'a str);

/// Build a PDF with one page per entry, each showing its placements in Courier 12.
fn build_pdf(pages: &[Vec<Placement>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for placements in pages {
        let mut operations = Vec::new();
        for &(x, y, text) in placements {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new("Td", vec![x.into(), y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(text)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn price_list() -> Vec<Placement<'static>> {
    vec![
        (72, 720, "Name"),
        (200, 720, "Qty"),
        (330, 720, "Price"),
        (72, 700, "Bolt"),
        (200, 700, "10"),
        (330, 700, "0.25"),
        (72, 680, "Nut"),
        (200, 680, "20"),
        (330, 680, "0.10"),
        (72, 660, "Washer"),
        (200, 660, "50"),
        (330, 660, "0.05"),
    ]
}

#[test]
fn test_native_text_per_page() {
    let pdf = build_pdf(&[
        vec![(72, 720, "Invoice: 1234")],
        vec![(72, 720, "Date: 2024-01-01")],
    ]);

    let result = extract_bytes(&pdf).unwrap();

    assert_eq!(result.page_count, 2);
    assert_eq!(result.pages[0].source, TextSource::Native);
    assert!(result.pages[0].text.contains("Invoice: 1234"));
    assert!(result.pages[1].text.contains("Date: 2024-01-01"));
    assert!(result.raw_text.contains('\n'));
}

#[test]
fn test_fields_from_generated_pdf() {
    let pdf = build_pdf(&[vec![(72, 720, "Invoice: 1234"), (72, 700, "Date: 2024-01-01")]]);

    let result = extract_fields(&pdf, None, None).unwrap();

    assert_eq!(result.text_fields.get("Invoice").map(String::as_str), Some("1234"));
    assert_eq!(result.text_fields.get("Date").map(String::as_str), Some("2024-01-01"));
}

#[test]
fn test_zero_page_document_is_empty() {
    let pdf = build_pdf(&[]);
    assert!(matches!(extract_bytes(&pdf), Err(Error::EmptyDocument)));
}

#[test]
fn test_blank_page_degrades() {
    let pdf = build_pdf(&[vec![], vec![(72, 720, "Second")]]);
    let result = extract_bytes(&pdf).unwrap();

    assert_eq!(result.pages[0].source, TextSource::Degraded);
    assert_eq!(result.pages[1].source, TextSource::Native);
}

#[test]
fn test_page_layout_positions() {
    let pdf = build_pdf(&[price_list()]);
    let backend = LopdfBackend::load_bytes(&pdf).unwrap();
    let layout = backend.page_layout(1).unwrap();

    assert_eq!(layout.spans.len(), 12);
    let name = &layout.spans[0];
    assert_eq!(name.text, "Name");
    assert!((name.x - 72.0).abs() < 0.01);
    assert!((name.y - 720.0).abs() < 0.01);
    assert!(layout.rulings.is_empty());
}

#[test]
fn test_text_aligned_table() {
    let pdf = build_pdf(&[price_list()]);
    let backend = LopdfBackend::load_bytes(&pdf).unwrap();

    let settings = TableSettings::new()
        .with("vertical_strategy", "text")
        .with("horizontal_strategy", "text");
    let tables = backend.extract_tables(1, &settings).unwrap();

    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].len(), 4);
    assert_eq!(
        tables[0][0],
        vec![
            Some("Name".to_string()),
            Some("Qty".to_string()),
            Some("Price".to_string())
        ]
    );
    assert_eq!(tables[0][3][0].as_deref(), Some("Washer"));
}

#[test]
fn test_fallback_finds_table_without_rulings() {
    let pdf = build_pdf(&[price_list()]);
    let settings = TableSettings::new().with("snap_tolerance", 3);

    let result = extract_fields(&pdf, None, Some(&settings)).unwrap();

    assert_eq!(result.tables.len(), 1);
    let rows = result.tables[0].rows().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["name"], "Bolt");
    assert_eq!(rows[2]["price"], "0.05");
}

#[test]
fn test_page_out_of_range() {
    let pdf = build_pdf(&[vec![(72, 720, "Only")]]);
    let backend = LopdfBackend::load_bytes(&pdf).unwrap();
    assert!(matches!(backend.page_text(2), Err(Error::PageOutOfRange(2, 1))));
}

#[test]
fn test_load_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("generated.pdf");
    std::fs::write(&path, build_pdf(&[vec![(72, 720, "On disk")]])).unwrap();

    let backend = LopdfBackend::load_file(&path).unwrap();
    assert_eq!(backend.page_count(), 1);
    assert_eq!(backend.version(), "1.5");
}
