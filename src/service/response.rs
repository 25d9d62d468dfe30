//! Response envelopes.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::{DocumentResult, FieldMap, TableRecord};

/// What each item's envelope carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// `{"raw_text"}` for the whole document
    #[default]
    Text,
    /// `{"data": [{"pagenumber", "raw_text"}, ...]}`
    Pages,
    /// `{"text_fields", "tables", "raw_text"}`
    Fields,
}

/// Text of one page in a per-page envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntry {
    /// Page number (1-indexed)
    pub pagenumber: u32,
    /// Resolved page text
    pub raw_text: String,
}

/// The envelope for one submitted item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ItemResponse {
    /// Whole-document text
    Text {
        /// Joined page text
        raw_text: String,
    },
    /// Per-page text
    Pages {
        /// One entry per resolved page, in page order
        data: Vec<PageEntry>,
    },
    /// Fields, tables and text
    Fields {
        /// Extracted fields
        text_fields: FieldMap,
        /// Extracted tables
        tables: Vec<TableRecord>,
        /// Joined page text
        raw_text: String,
    },
    /// Failure of this item only
    Error {
        /// Human-readable cause
        error: String,
    },
}

impl ItemResponse {
    /// Build the envelope for a successful extraction.
    pub fn from_result(mode: ResponseMode, result: DocumentResult) -> Self {
        match mode {
            ResponseMode::Text => ItemResponse::Text {
                raw_text: result.raw_text.trim().to_string(),
            },
            ResponseMode::Pages => ItemResponse::Pages {
                data: result
                    .pages
                    .into_iter()
                    .map(|p| PageEntry {
                        pagenumber: p.page_number,
                        raw_text: p.text,
                    })
                    .collect(),
            },
            ResponseMode::Fields => ItemResponse::Fields {
                text_fields: result.text_fields,
                tables: result.tables,
                raw_text: result.raw_text,
            },
        }
    }

    /// Build the per-item error marker.
    ///
    /// Whole-text responses keep their shape and carry the cause in
    /// `raw_text`; the other modes use an `error` field.
    pub fn from_error(mode: ResponseMode, error: &Error) -> Self {
        match mode {
            ResponseMode::Text => ItemResponse::Text {
                raw_text: format!("Error: {}", error),
            },
            ResponseMode::Pages | ResponseMode::Fields => ItemResponse::Error {
                error: error.to_string(),
            },
        }
    }

    /// Check if this is an error marker.
    pub fn is_error(&self) -> bool {
        match self {
            ItemResponse::Error { .. } => true,
            ItemResponse::Text { raw_text } => raw_text.starts_with("Error: "),
            _ => false,
        }
    }
}

/// The response body: one envelope, or an array of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtractResponse {
    /// Single-file request
    Single(ItemResponse),
    /// Batch or list request, in request order
    Batch(Vec<ItemResponse>),
}

impl ExtractResponse {
    /// All item envelopes, in request order.
    pub fn items(&self) -> &[ItemResponse] {
        match self {
            ExtractResponse::Single(item) => std::slice::from_ref(item),
            ExtractResponse::Batch(items) => items,
        }
    }

    /// Serialize as JSON.
    pub fn to_json(&self, pretty: bool) -> crate::Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}
