//! Prompt enrichment: turns a raw user prompt plus conversation context
//! into the prompt the model answers.

pub mod builder;
pub mod injection;
pub mod report;
pub mod rewrite;
pub mod truncation;

pub use builder::{Enricher, Enrichment, EnrichmentInput, LocalEnricher};
pub use report::EnrichmentReport;
pub use rewrite::ModelAssistedEnricher;
