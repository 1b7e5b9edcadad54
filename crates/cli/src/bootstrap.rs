//! Wires config into a ready orchestrator.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use pl_domain::config::{Config, HistoryBackend, LlmConfig, RetrievalConfig, SessionsConfig};
use pl_providers::{ModelRegistry, OpenAiCompatService};
use pl_retrieval::{RestDocumentRetriever, RetrievalAdapter};
use pl_runtime::TurnOrchestrator;
use pl_sessions::{HistoryStore, JsonlHistoryStore, MemoryHistoryStore};

/// Everything a command needs, built once per process.
pub struct App {
    pub config: Arc<Config>,
    pub registry: Arc<ModelRegistry>,
    pub history: Arc<dyn HistoryStore>,
    pub orchestrator: TurnOrchestrator,
}

pub fn build_app(config: Config) -> anyhow::Result<App> {
    let registry = Arc::new(build_registry(&config.llm));

    let service = OpenAiCompatService::from_config(
        &config.llm.service,
        Duration::from_millis(config.llm.default_timeout_ms),
    )
    .context("building completion service")?;

    let retriever = RestDocumentRetriever::new(&config.retrieval)
        .context("building retrieval client")?;
    let retrieval = RetrievalAdapter::new(Arc::new(retriever), retrieval_deadline(&config.retrieval));

    let history = build_history(&config.sessions);

    tracing::info!(
        service = %config.llm.service.id,
        retrieval = %config.retrieval.base_url,
        backend = ?config.sessions.backend,
        models = registry.descriptors().len(),
        "parley ready"
    );

    let orchestrator = TurnOrchestrator::from_config(
        &config,
        registry.clone(),
        Arc::new(service),
        history.clone(),
        Some(retrieval),
    );

    Ok(App {
        config: Arc::new(config),
        registry,
        history,
        orchestrator,
    })
}

/// Built-in families plus any catalog entries from config.
pub fn build_registry(cfg: &LlmConfig) -> ModelRegistry {
    let mut registry = ModelRegistry::with_defaults();
    registry.add_descriptors(cfg.models.iter().cloned());
    registry
}

pub fn build_history(cfg: &SessionsConfig) -> Arc<dyn HistoryStore> {
    match cfg.backend {
        HistoryBackend::Jsonl => Arc::new(JsonlHistoryStore::new(&cfg.store_dir())),
        HistoryBackend::Memory => Arc::new(MemoryHistoryStore::new()),
    }
}

/// Covers every attempt the client may make, back-off included.
fn retrieval_deadline(cfg: &RetrievalConfig) -> Duration {
    let attempts = u64::from(cfg.max_retries) + 1;
    Duration::from_millis(cfg.timeout_ms.saturating_mul(attempts)) + Duration::from_secs(1)
}
