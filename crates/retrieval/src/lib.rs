//! `pl-retrieval`: workspace document retrieval.
//!
//! Provides the [`DocumentRetriever`] trait, a REST implementation
//! ([`RestDocumentRetriever`]) with retry and back-off, the wire DTOs, and
//! the [`RetrievalAdapter`] the orchestrator calls, which bounds every
//! query with a timeout and turns failures into empty results.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use pl_domain::config::RetrievalConfig;
//! use pl_retrieval::{RestDocumentRetriever, RetrievalAdapter};
//!
//! # async fn example() -> pl_domain::error::Result<()> {
//! let cfg = RetrievalConfig::default();
//! let adapter = RetrievalAdapter::new(
//!     Arc::new(RestDocumentRetriever::new(&cfg)?),
//!     Duration::from_millis(cfg.timeout_ms),
//! );
//! let docs = adapter.get_relevant_documents("w1", "filing deadline").await;
//! println!("found {} documents", docs.len());
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod rest;
pub mod retriever;
pub mod types;

pub use adapter::RetrievalAdapter;
pub use rest::{from_reqwest, RestDocumentRetriever};
pub use retriever::DocumentRetriever;
pub use types::{RetrievedDocumentDto, WorkspaceQueryRequest, WorkspaceQueryResponse};
