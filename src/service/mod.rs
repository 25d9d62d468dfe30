//! Transport adapter: request shapes in, response envelopes out.
//!
//! Every request shape is reduced to a list of [`Submission`]s before the
//! pipeline sees it. Items are processed independently; a failing item
//! becomes an error marker in its slot and never affects its siblings.

mod request;
mod response;

pub use request::{Attachment, ExtractRequest, ResolvedRequest, Submission};
pub use response::{ExtractResponse, ItemResponse, PageEntry, ResponseMode};

use crate::error::Result;
use crate::extract::{DocumentPipeline, ExtractionRuleSet};
use crate::model::DocumentResult;
use crate::parser::TableSettings;

/// Handles extraction requests with a shared pipeline.
#[derive(Debug, Clone)]
pub struct ExtractService {
    pipeline: DocumentPipeline,
}

impl ExtractService {
    /// Create a service over `pipeline`.
    pub fn new(pipeline: DocumentPipeline) -> Self {
        Self { pipeline }
    }

    /// The underlying pipeline.
    pub fn pipeline(&self) -> &DocumentPipeline {
        &self.pipeline
    }

    /// Parse and handle a JSON request body.
    ///
    /// Fails only when the body matches no request shape or carries an
    /// invalid rule; document failures are reported per item.
    pub fn handle_json(&self, body: &str, mode: ResponseMode) -> Result<ExtractResponse> {
        let request = ExtractRequest::from_json(body)?;
        self.handle(request, mode)
    }

    /// Handle a parsed request.
    pub fn handle(&self, request: ExtractRequest, mode: ResponseMode) -> Result<ExtractResponse> {
        Ok(self.handle_resolved(&request.resolve()?, mode))
    }

    /// Handle an already resolved request.
    pub fn handle_resolved(&self, request: &ResolvedRequest, mode: ResponseMode) -> ExtractResponse {
        let mut items: Vec<ItemResponse> = request
            .submissions
            .iter()
            .map(|submission| {
                self.handle_submission(
                    submission,
                    mode,
                    request.rules.as_ref(),
                    request.table_settings.as_ref(),
                )
            })
            .collect();

        let failed = items.iter().filter(|i| i.is_error()).count();
        if failed > 0 {
            log::warn!("{} of {} items failed", failed, items.len());
        }

        if request.single && items.len() == 1 {
            if let Some(item) = items.pop() {
                return ExtractResponse::Single(item);
            }
        }
        ExtractResponse::Batch(items)
    }

    /// Extract one submission into its envelope.
    pub fn handle_submission(
        &self,
        submission: &Submission,
        mode: ResponseMode,
        rules: Option<&ExtractionRuleSet>,
        table_settings: Option<&TableSettings>,
    ) -> ItemResponse {
        match self.extract(submission, mode, rules, table_settings) {
            Ok(result) => ItemResponse::from_result(mode, result),
            Err(e) => {
                log::warn!("{}: {}", submission.display_name(), e);
                ItemResponse::from_error(mode, &e)
            }
        }
    }

    fn extract(
        &self,
        submission: &Submission,
        mode: ResponseMode,
        rules: Option<&ExtractionRuleSet>,
        table_settings: Option<&TableSettings>,
    ) -> Result<DocumentResult> {
        submission.ensure_pdf()?;
        log::info!("Processing PDF: {}", submission.display_name());

        let bytes = submission.bytes()?;
        match mode {
            ResponseMode::Fields => self.pipeline.run(&bytes, rules, table_settings),
            ResponseMode::Text | ResponseMode::Pages => self.pipeline.extract_pages(&bytes),
        }
    }
}
