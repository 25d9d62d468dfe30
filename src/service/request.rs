//! Request shapes accepted at the service boundary.

use std::borrow::Cow;

use base64::Engine;
use indexmap::IndexMap;
use serde::Deserialize;

use crate::detect::is_pdf_submission;
use crate::error::{Error, Result};
use crate::extract::ExtractionRuleSet;
use crate::parser::TableSettings;

/// One attachment of a batch or list request.
///
/// Unknown fields (ids, sizes, timestamps of mail attachments) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    /// File name
    #[serde(default)]
    pub name: Option<String>,

    /// MIME type
    #[serde(default, rename = "contentType")]
    pub content_type: Option<String>,

    /// Base64-encoded file content
    #[serde(rename = "contentBytes")]
    pub content_bytes: String,
}

/// Every request body shape the service understands.
///
/// Shapes are tried in declaration order: a wrapped list, then a single
/// file object, then a bare list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExtractRequest {
    /// `{"value": [attachment, ...], "extraction_rules"?, "table_settings"?}`
    Batch {
        /// Attachments
        value: Vec<Attachment>,
        /// Field rules applied to every attachment
        #[serde(default)]
        extraction_rules: Option<IndexMap<String, String>>,
        /// Table settings applied to every attachment
        #[serde(default)]
        table_settings: Option<TableSettings>,
    },

    /// `{"contentType" | "ContentType", "contentBytes", "extraction_rules"?, "table_settings"?}`
    Single {
        /// MIME type
        #[serde(rename = "contentType", alias = "ContentType")]
        content_type: String,
        /// Base64-encoded file content
        #[serde(rename = "contentBytes")]
        content_bytes: String,
        /// Field rules
        #[serde(default)]
        extraction_rules: Option<IndexMap<String, String>>,
        /// Table settings
        #[serde(default)]
        table_settings: Option<TableSettings>,
    },

    /// `[attachment, ...]`
    List(Vec<Attachment>),
}

impl ExtractRequest {
    /// Parse a JSON request body.
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// Resolve the request into canonical submissions.
    ///
    /// Rules are compiled here, so an invalid pattern fails the whole
    /// request before any document is touched.
    pub fn resolve(self) -> Result<ResolvedRequest> {
        let (submissions, rules, table_settings, single) = match self {
            ExtractRequest::Batch {
                value,
                extraction_rules,
                table_settings,
            } => (
                value.into_iter().map(Submission::from).collect(),
                extraction_rules,
                table_settings,
                false,
            ),
            ExtractRequest::Single {
                content_type,
                content_bytes,
                extraction_rules,
                table_settings,
            } => (
                vec![Submission::encoded(None, Some(content_type), content_bytes)],
                extraction_rules,
                table_settings,
                true,
            ),
            ExtractRequest::List(items) => {
                (items.into_iter().map(Submission::from).collect(), None, None, false)
            }
        };

        let rules = rules.map(ExtractionRuleSet::try_from).transpose()?;

        Ok(ResolvedRequest {
            submissions,
            rules,
            table_settings,
            single,
        })
    }
}

/// A request reduced to what the pipeline needs.
#[derive(Debug, Clone, Default)]
pub struct ResolvedRequest {
    /// Items to extract, in request order
    pub submissions: Vec<Submission>,
    /// Field rules shared by all items
    pub rules: Option<ExtractionRuleSet>,
    /// Table settings shared by all items
    pub table_settings: Option<TableSettings>,
    /// Whether the response is a single object rather than an array
    pub single: bool,
}

impl ResolvedRequest {
    /// A single binary upload.
    pub fn upload(submission: Submission) -> Self {
        Self {
            submissions: vec![submission],
            single: true,
            ..Default::default()
        }
    }

    /// Set field rules.
    pub fn with_rules(mut self, rules: ExtractionRuleSet) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Set table settings.
    pub fn with_table_settings(mut self, settings: TableSettings) -> Self {
        self.table_settings = Some(settings);
        self
    }
}

#[derive(Debug, Clone)]
enum Payload {
    Encoded(String),
    Raw(Vec<u8>),
}

/// One document to extract, independent of how it arrived.
#[derive(Debug, Clone)]
pub struct Submission {
    /// File name, if known
    pub name: Option<String>,
    /// MIME type, if known
    pub content_type: Option<String>,
    payload: Payload,
}

impl Submission {
    /// A submission carrying base64 text, decoded on demand.
    pub fn encoded(name: Option<String>, content_type: Option<String>, content_bytes: String) -> Self {
        Self {
            name,
            content_type,
            payload: Payload::Encoded(content_bytes),
        }
    }

    /// A binary file upload.
    pub fn upload(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: Some(name.into()),
            content_type: None,
            payload: Payload::Raw(bytes),
        }
    }

    /// Set the MIME type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Name for log messages.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unknown_file")
    }

    /// Whether the metadata marks this item as a PDF.
    pub fn is_pdf(&self) -> bool {
        is_pdf_submission(self.name.as_deref(), self.content_type.as_deref())
    }

    /// Fail with [`Error::UnsupportedMediaType`] unless this is a PDF.
    pub fn ensure_pdf(&self) -> Result<()> {
        if self.is_pdf() {
            return Ok(());
        }
        let described = match (&self.content_type, &self.name) {
            (Some(ct), _) if !ct.is_empty() => ct.clone(),
            (_, Some(name)) => name.clone(),
            _ => "unknown".to_string(),
        };
        Err(Error::UnsupportedMediaType(described))
    }

    /// The document bytes, decoding base64 if needed.
    pub fn bytes(&self) -> Result<Cow<'_, [u8]>> {
        match &self.payload {
            Payload::Raw(bytes) => Ok(Cow::Borrowed(bytes)),
            Payload::Encoded(text) => {
                let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
                let bytes = base64::engine::general_purpose::STANDARD.decode(compact)?;
                Ok(Cow::Owned(bytes))
            }
        }
    }
}

impl From<Attachment> for Submission {
    fn from(attachment: Attachment) -> Self {
        Self::encoded(attachment.name, attachment.content_type, attachment.content_bytes)
    }
}
