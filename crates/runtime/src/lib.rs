//! Turn orchestration: validate, enrich, retrieve, generate, persist.
//!
//! ```no_run
//! # async fn demo(orchestrator: pl_runtime::TurnOrchestrator) -> pl_domain::error::Result<()> {
//! use pl_runtime::{CancellationToken, TurnRequest};
//!
//! let req = TurnRequest::new("s1", "u1", "When is the deadline?", "bedrock.anthropic.claude-v2")
//!     .with_workspace("w1");
//! let response = orchestrator.run(req, &CancellationToken::new()).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod metadata;
pub mod observer;
pub mod orchestrator;
pub mod phase;
pub mod request;

pub use chain::AdapterInstance;
pub use metadata::{EnrichmentSummary, MetadataRecord};
pub use observer::PromptRecorder;
pub use orchestrator::{OrchestratorSettings, TurnOrchestrator};
pub use phase::{PhaseTracker, TurnPhase};
pub use request::{ChatbotMode, Response, TurnRequest};
pub use tokio_util::sync::CancellationToken;
