//! Wire DTOs for the workspace query endpoint.
//!
//! Field names are `camelCase` on the wire. Document content is also
//! accepted as `pageContent`/`page_content` for backends that return
//! documents in that shape.

use pl_domain::turn::Document;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// POST /workspaces/{workspaceId}/query: request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceQueryRequest {
    pub query: String,
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
}

/// POST /workspaces/{workspaceId}/query: response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceQueryResponse {
    #[serde(default, alias = "documents")]
    pub items: Vec<RetrievedDocumentDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedDocumentDto {
    #[serde(alias = "pageContent", alias = "page_content")]
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
}

impl RetrievedDocumentDto {
    /// Fold the top-level `score`/`source` into the metadata mapping
    /// unless the backend already put them there.
    pub fn into_document(self) -> Document {
        let mut metadata = self.metadata;
        if let Some(score) = self.score {
            metadata.entry("score").or_insert_with(|| Value::from(score));
        }
        if let Some(source) = self.source {
            metadata.entry("source").or_insert_with(|| Value::String(source));
        }
        Document::new(self.content).with_metadata(Value::Object(metadata))
    }
}
