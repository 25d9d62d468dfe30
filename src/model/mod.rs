//! Result model types for extracted PDF content.
//!
//! These types are what the pipeline hands back to callers. They are plain
//! data, serializable with serde, and carry no reference to the PDF backend
//! that produced them.

mod document;
mod page;
mod table;

pub use document::{DocumentResult, ExtractionStats};
pub use page::{PageText, TextSource};
pub use table::{RawTable, TableRecord, TableRow};

/// Extracted key/value fields, in discovery (or rule declaration) order.
pub type FieldMap = indexmap::IndexMap<String, String>;
