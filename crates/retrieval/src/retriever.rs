//! The `DocumentRetriever` trait: the seam between the orchestrator and a
//! retrieval backend (REST service, in-memory fixture, ...).

use async_trait::async_trait;
use pl_domain::error::Result;
use pl_domain::turn::Document;

#[async_trait]
pub trait DocumentRetriever: Send + Sync {
    /// Documents from `workspace_id` relevant to `text`, most relevant
    /// first. An empty result is not an error.
    async fn query(&self, workspace_id: &str, text: &str) -> Result<Vec<Document>>;

    /// Short name for logs.
    fn name(&self) -> &str {
        "retriever"
    }
}
