//! Table types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A raw table as returned by a layout backend: rows of nullable cells.
pub type RawTable = Vec<Vec<Option<String>>>;

/// A data row keyed by normalized header name.
pub type TableRow = IndexMap<String, String>;

/// A structured table.
///
/// Serializes untagged: a keyed table becomes a list of objects, a
/// header-less single-row table becomes a list of lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableRecord {
    /// Rows mapped from header name to cell text.
    Rows(Vec<TableRow>),

    /// A degenerate single-row table, emitted verbatim.
    Raw(RawTable),
}

impl TableRecord {
    /// Number of rows in the record.
    pub fn row_count(&self) -> usize {
        match self {
            TableRecord::Rows(rows) => rows.len(),
            TableRecord::Raw(rows) => rows.len(),
        }
    }

    /// Keyed rows, if this is not a degenerate table.
    pub fn rows(&self) -> Option<&[TableRow]> {
        match self {
            TableRecord::Rows(rows) => Some(rows),
            TableRecord::Raw(_) => None,
        }
    }
}
