//! The audit record attached to every assistant turn.

use pl_contextpack::EnrichmentReport;
use pl_domain::config::{EnrichmentOrder, EnrichmentStrategy};
use pl_domain::error::Result;
use pl_domain::turn::Document;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    /// Bare model id, without the provider prefix.
    pub model_id: String,
    pub model_kwargs: Value,
    pub mode: String,
    pub session_id: String,
    pub user_id: String,
    /// Absent on the plain path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    /// Documents the answer was generated from, in retrieval order.
    pub documents: Vec<Document>,
    /// Every prompt sent to the completion service during the turn.
    pub prompts: Vec<String>,
    /// The user's words, when the model was given something else.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_prompt: Option<String>,
    pub enrichment: EnrichmentSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentSummary {
    pub strategy: EnrichmentStrategy,
    /// Only set on the retrieval path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<EnrichmentOrder>,
    /// The generated-from prompt differs from the raw prompt.
    pub applied: bool,
    pub fallback: bool,
}

impl EnrichmentSummary {
    pub fn new(report: &EnrichmentReport, order: Option<EnrichmentOrder>, applied: bool) -> Self {
        Self {
            strategy: report.strategy,
            order,
            applied,
            fallback: report.fallback,
        }
    }
}

impl MetadataRecord {
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
