//! Table extraction with a text-alignment fallback.

use crate::error::Result;
use crate::model::{RawTable, TableRecord, TableRow};
use crate::parser::{LayoutBackend, TableSettings};

/// Something that can find raw tables under a given geometry profile.
pub trait TableSource {
    /// Raw tables found with `settings`.
    fn extract_tables(&self, settings: &TableSettings) -> Result<Vec<RawTable>>;
}

/// One page of a loaded document as a [`TableSource`].
pub struct BackendPage<'a> {
    backend: &'a dyn LayoutBackend,
    page_number: u32,
}

impl<'a> BackendPage<'a> {
    /// Wrap page `page_number` (1-indexed) of `backend`.
    pub fn new(backend: &'a dyn LayoutBackend, page_number: u32) -> Self {
        Self {
            backend,
            page_number,
        }
    }
}

impl TableSource for BackendPage<'_> {
    fn extract_tables(&self, settings: &TableSettings) -> Result<Vec<RawTable>> {
        self.backend.extract_tables(self.page_number, settings)
    }
}

/// Turns raw table grids into [`TableRecord`]s.
#[derive(Debug, Clone)]
pub struct TableExtractor {
    fallback: TableSettings,
}

impl Default for TableExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TableExtractor {
    /// Create an extractor with the standard fallback profile.
    pub fn new() -> Self {
        Self {
            fallback: TableSettings::fallback(),
        }
    }

    /// Replace the fallback profile.
    pub fn with_fallback(mut self, fallback: TableSettings) -> Self {
        self.fallback = fallback;
        self
    }

    /// Extract table records from `source`.
    ///
    /// Nothing is attempted without settings. When the caller's settings
    /// find no table, detection is retried once with the fallback profile,
    /// with every caller key taking precedence over the fallback value.
    pub fn extract(&self, source: &dyn TableSource, settings: Option<&TableSettings>) -> Vec<TableRecord> {
        let settings = match settings {
            Some(s) if !s.is_empty() => s,
            _ => return Vec::new(),
        };

        let mut tables = Self::attempt(source, settings);
        if tables.is_empty() {
            log::debug!("No tables with caller settings, retrying with fallback profile");
            tables = Self::attempt(source, &settings.merged_over(&self.fallback));
        }

        tables.into_iter().filter_map(structure_table).collect()
    }

    fn attempt(source: &dyn TableSource, settings: &TableSettings) -> Vec<RawTable> {
        source.extract_tables(settings).unwrap_or_else(|e| {
            log::warn!("Table detection failed: {}", e);
            Vec::new()
        })
    }
}

/// Map a raw grid to a record keyed by its first row.
///
/// A single-row grid is kept verbatim. Otherwise data rows that carry no
/// text are dropped, and `None` is returned when no row survives.
pub fn structure_table(table: RawTable) -> Option<TableRecord> {
    match table.len() {
        0 => None,
        1 => Some(TableRecord::Raw(table)),
        _ => {
            let mut rows = table.into_iter();
            let headers: Vec<String> = rows
                .next()
                .unwrap_or_default()
                .iter()
                .enumerate()
                .map(|(j, h)| header_name(j, h.as_deref()))
                .collect();

            let records: Vec<TableRow> = rows
                .filter(|row| row.iter().any(|c| c.as_deref().is_some_and(|c| !c.is_empty())))
                .filter_map(|row| {
                    let mapped: TableRow = headers
                        .iter()
                        .zip(row.iter())
                        .map(|(h, c)| (h.clone(), clean_cell(c.as_deref())))
                        .collect();
                    mapped.values().any(|v| !v.is_empty()).then_some(mapped)
                })
                .collect();

            if records.is_empty() {
                None
            } else {
                Some(TableRecord::Rows(records))
            }
        }
    }
}

fn header_name(index: usize, header: Option<&str>) -> String {
    let name = clean_cell(header).to_lowercase();
    if name.is_empty() {
        format!("col_{}", index)
    } else {
        name
    }
}

fn clean_cell(cell: Option<&str>) -> String {
    cell.map(|c| c.replace('\n', " ").trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::cell::RefCell;

    fn grid(rows: &[&[Option<&str>]]) -> RawTable {
        rows.iter()
            .map(|r| r.iter().map(|c| c.map(str::to_string)).collect())
            .collect()
    }

    /// Returns canned tables for settings matching a predicate.
    struct Scripted {
        calls: RefCell<Vec<TableSettings>>,
        answer: fn(&TableSettings) -> Result<Vec<RawTable>>,
    }

    impl Scripted {
        fn new(answer: fn(&TableSettings) -> Result<Vec<RawTable>>) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                answer,
            }
        }
    }

    impl TableSource for Scripted {
        fn extract_tables(&self, settings: &TableSettings) -> Result<Vec<RawTable>> {
            self.calls.borrow_mut().push(settings.clone());
            (self.answer)(settings)
        }
    }

    #[test]
    fn test_two_row_table() {
        let record = structure_table(grid(&[
            &[Some("Name"), Some("Age")],
            &[Some("Bob"), Some("30")],
        ]))
        .unwrap();

        let rows = record.rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "Bob");
        assert_eq!(rows[0]["age"], "30");
    }

    #[test]
    fn test_empty_data_row_omits_table() {
        let table = grid(&[&[Some("Name"), Some("Age")], &[Some(""), None]]);
        assert!(structure_table(table).is_none());
    }

    #[test]
    fn test_header_normalization() {
        let record = structure_table(grid(&[
            &[Some("Unit\nPrice "), None, Some("")],
            &[Some("9.99"), Some("x"), Some("line\nbreak")],
        ]))
        .unwrap();

        let row = &record.rows().unwrap()[0];
        let keys: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["unit price", "col_1", "col_2"]);
        assert_eq!(row["col_2"], "line break");
    }

    #[test]
    fn test_extra_cells_dropped_and_blank_rows_skipped() {
        let record = structure_table(grid(&[
            &[Some("A"), Some("B")],
            &[None, None, Some("orphan")],
            &[Some("1"), Some("2"), Some("3")],
        ]))
        .unwrap();

        let rows = record.rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 2);
    }

    #[test]
    fn test_single_row_kept_verbatim() {
        let table = grid(&[&[Some("Total"), None]]);
        assert_eq!(structure_table(table.clone()), Some(TableRecord::Raw(table)));
        assert!(structure_table(Vec::new()).is_none());
    }

    #[test]
    fn test_no_settings_skips_extraction() {
        let source = Scripted::new(|_| panic!("must not be called"));
        let extractor = TableExtractor::new();
        assert!(extractor.extract(&source, None).is_empty());
        assert!(extractor.extract(&source, Some(&TableSettings::new())).is_empty());
    }

    #[test]
    fn test_fallback_not_used_when_primary_finds_tables() {
        let source = Scripted::new(|_| Ok(vec![grid(&[&[Some("k"), Some("v")], &[Some("a"), Some("b")]])]));
        let settings = TableSettings::new().with("snap_tolerance", 4);

        let records = TableExtractor::new().extract(&source, Some(&settings));

        assert_eq!(records.len(), 1);
        assert_eq!(source.calls.borrow().len(), 1);
    }

    #[test]
    fn test_fallback_merges_caller_keys() {
        let source = Scripted::new(|s| {
            if s.get("horizontal_strategy").is_some() {
                Ok(vec![grid(&[&[Some("k")], &[Some("v")]])])
            } else {
                Ok(Vec::new())
            }
        });
        let settings = TableSettings::new().with("vertical_strategy", "lines");

        let records = TableExtractor::new().extract(&source, Some(&settings));

        assert_eq!(records.len(), 1);
        let calls = source.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], settings);
        assert_eq!(calls[1].get("vertical_strategy"), Some(&"lines".into()));
        assert_eq!(calls[1].get("horizontal_strategy"), Some(&"text".into()));
        assert_eq!(calls[1].get("intersection_y_tolerance"), Some(&10.into()));
    }

    #[test]
    fn test_source_errors_yield_empty_attempts() {
        let source = Scripted::new(|_| Err(Error::PdfParse("broken page".into())));
        let settings = TableSettings::new().with("vertical_strategy", "text");
        assert!(TableExtractor::new().extract(&source, Some(&settings)).is_empty());
        assert_eq!(source.calls.borrow().len(), 2);
    }
}
