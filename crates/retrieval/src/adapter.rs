//! `RetrievalAdapter`: the orchestrator's view of document retrieval.
//!
//! Wraps any [`DocumentRetriever`] with a deadline and absorbs every
//! failure as "no documents", so a flaky retrieval backend degrades
//! answers instead of failing turns.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pl_domain::error::Error;
use pl_domain::trace::TraceEvent;
use pl_domain::turn::Document;

use crate::retriever::DocumentRetriever;

#[derive(Clone)]
pub struct RetrievalAdapter {
    retriever: Arc<dyn DocumentRetriever>,
    timeout: Duration,
}

impl RetrievalAdapter {
    pub fn new(retriever: Arc<dyn DocumentRetriever>, timeout: Duration) -> Self {
        Self { retriever, timeout }
    }

    /// Relevant documents in backend order. Never fails: errors and
    /// timeouts are logged and yield an empty list.
    pub async fn get_relevant_documents(&self, workspace_id: &str, query: &str) -> Vec<Document> {
        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.retriever.query(workspace_id, query))
            .await
            .unwrap_or_else(|_| {
                Err(Error::Timeout(format!(
                    "retrieval after {}ms",
                    self.timeout.as_millis()
                )))
            });

        let documents = match outcome {
            Ok(docs) => docs.into_iter().map(normalize).collect(),
            Err(e) => {
                tracing::warn!(
                    workspace_id = %workspace_id,
                    retriever = %self.retriever.name(),
                    error = %e,
                    "retrieval failed, continuing without documents"
                );
                Vec::new()
            }
        };

        TraceEvent::DocumentsRetrieved {
            workspace_id: workspace_id.to_owned(),
            count: documents.len(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
        .emit();

        documents
    }
}

impl std::fmt::Debug for RetrievalAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalAdapter")
            .field("retriever", &self.retriever.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Non-object metadata is kept under a `value` key so downstream
/// consumers can always treat it as a mapping.
fn normalize(mut doc: Document) -> Document {
    doc.metadata = match doc.metadata {
        serde_json::Value::Object(map) => serde_json::Value::Object(map),
        serde_json::Value::Null => serde_json::json!({}),
        other => serde_json::json!({ "value": other }),
    };
    doc
}
