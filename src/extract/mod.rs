//! The hybrid extraction pipeline.
//!
//! Components, leaf first: [`TextNormalizer`], [`PageTextResolver`],
//! [`FieldExtractor`], [`TableExtractor`] and the [`DocumentPipeline`] that
//! ties them to a layout provider.

mod fields;
mod normalize;
mod page;
mod pipeline;
mod tables;

pub use fields::{ExtractionRuleSet, FieldExtractor, MAX_DISCOVERED_KEY_CHARS};
pub use normalize::{normalize, TextNormalizer};
pub use page::PageTextResolver;
pub use pipeline::{DocumentPipeline, PipelineOptions, TableScope};
pub use tables::{structure_table, BackendPage, TableExtractor, TableSource};
