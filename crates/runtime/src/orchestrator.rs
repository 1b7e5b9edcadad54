//! Turn orchestrator: one user message in, one persisted answer out.
//!
//! Entry point: [`TurnOrchestrator::run`]. Everything up to and including
//! generation is bounded by the caller's [`CancellationToken`] and the
//! turn deadline; persistence is not, so a turn is either written in full
//! or not at all.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pl_contextpack::{Enricher, Enrichment, EnrichmentInput};
use pl_domain::config::{Config, EnrichmentOrder};
use pl_domain::error::{Error, Result};
use pl_domain::model::{GenerationParams, ModelRef};
use pl_domain::trace::TraceEvent;
use pl_domain::turn::{Document, SessionKey, Turn};
use pl_providers::{CompletionService, ModelRegistry};
use pl_retrieval::RetrievalAdapter;
use pl_sessions::HistoryStore;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::chain::{initial_context, AdapterInstance};
use crate::metadata::{EnrichmentSummary, MetadataRecord};
use crate::observer::PromptRecorder;
use crate::phase::{PhaseTracker, TurnPhase};
use crate::request::{ChatbotMode, Response, TurnRequest};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Settings
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Retrieval-path ordering of enrichment and retrieval.
    pub order: EnrichmentOrder,
    /// Skip condensation and render the QA prompt without history when
    /// the session has at most one prior turn.
    pub first_turn_history_free: bool,
    /// Deadline for everything before persistence.
    pub turn_timeout: Duration,
    /// Per completion call.
    pub llm_timeout: Duration,
    pub rewrite_temperature: f32,
    pub rewrite_max_tokens: u32,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl OrchestratorSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            order: cfg.enrichment.order,
            first_turn_history_free: cfg.orchestrator.first_turn_history_free,
            turn_timeout: Duration::from_millis(cfg.orchestrator.turn_timeout_ms),
            llm_timeout: Duration::from_millis(cfg.llm.default_timeout_ms),
            rewrite_temperature: cfg.enrichment.rewrite_temperature,
            rewrite_max_tokens: cfg.enrichment.rewrite_max_tokens,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Orchestrator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Shared across concurrent turns; holds no per-turn state.
pub struct TurnOrchestrator {
    registry: Arc<ModelRegistry>,
    service: Arc<dyn CompletionService>,
    history: Arc<dyn HistoryStore>,
    retrieval: Option<RetrievalAdapter>,
    enricher: Enricher,
    settings: OrchestratorSettings,
}

/// A turn that has been answered but not yet written.
struct PreparedTurn {
    key: SessionKey,
    human: Turn,
    answer: String,
    metadata: MetadataRecord,
    streamed_tokens: usize,
}

impl TurnOrchestrator {
    pub fn new(
        registry: Arc<ModelRegistry>,
        service: Arc<dyn CompletionService>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        let cfg = Config::default();
        Self {
            registry,
            service,
            history,
            retrieval: None,
            enricher: Enricher::from_config(&cfg.enrichment),
            settings: OrchestratorSettings::from_config(&cfg),
        }
    }

    /// Wire everything from config. Without a retrieval adapter, turns
    /// that name a workspace are answered from zero documents.
    pub fn from_config(
        cfg: &Config,
        registry: Arc<ModelRegistry>,
        service: Arc<dyn CompletionService>,
        history: Arc<dyn HistoryStore>,
        retrieval: Option<RetrievalAdapter>,
    ) -> Self {
        Self {
            registry,
            service,
            history,
            retrieval,
            enricher: Enricher::from_config(&cfg.enrichment),
            settings: OrchestratorSettings::from_config(cfg),
        }
    }

    pub fn with_retrieval(mut self, retrieval: RetrievalAdapter) -> Self {
        self.retrieval = Some(retrieval);
        self
    }

    pub fn with_enricher(mut self, enricher: Enricher) -> Self {
        self.enricher = enricher;
        self
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    // ── Entry point ─────────────────────────────────────────────────

    /// Answer one user message and persist the exchange.
    ///
    /// Fails before any I/O on an unsupported mode, blank input or an
    /// unknown model. Cancellation and the turn deadline abort the turn
    /// without writing anything.
    pub async fn run(&self, req: TurnRequest, cancel: &CancellationToken) -> Result<Response> {
        let span = tracing::info_span!(
            "turn",
            session_id = %req.session_id,
            user_id = %req.user_id,
            model_id = %req.model_id,
            workspace_id = ?req.workspace_id,
        );

        async {
            let started = Instant::now();
            let mut phases = PhaseTracker::new(&req.session_id);

            let prepared = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(Error::Cancelled),
                outcome = tokio::time::timeout(
                    self.settings.turn_timeout,
                    self.prepare(&req, &mut phases),
                ) => outcome.unwrap_or_else(|_| {
                    Err(Error::Timeout(format!(
                        "turn exceeded {}ms",
                        self.settings.turn_timeout.as_millis()
                    )))
                }),
            };

            let prepared = match prepared {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(phase = %phases.current(), error = %e, "turn aborted, nothing persisted");
                    return Err(e);
                }
            };

            let streamed_tokens = prepared.streamed_tokens;
            let response = self.persist(prepared, &mut phases).await?;
            phases.advance(TurnPhase::Idle);

            TraceEvent::TurnCompleted {
                session_id: response.session_id.clone(),
                model_id: response.metadata.model_id.clone(),
                retrieval: response.metadata.workspace_id.is_some(),
                documents: response.metadata.documents.len(),
                prompts: response.metadata.prompts.len(),
                streamed_tokens,
                duration_ms: started.elapsed().as_millis() as u64,
            }
            .emit();

            Ok(response)
        }
        .instrument(span)
        .await
    }

    // ── Preparation (cancellable) ───────────────────────────────────

    async fn prepare(&self, req: &TurnRequest, phases: &mut PhaseTracker) -> Result<PreparedTurn> {
        let mode: ChatbotMode = req.mode.parse()?;
        validate(req)?;

        let model = ModelRef::parse(&req.model_id)
            .ok_or_else(|| Error::NoMatchingAdapter(req.model_id.clone()))?;
        let recorder = Arc::new(PromptRecorder::new());
        let instance = self.instantiate(&model, &req.model_kwargs, recorder.clone())?;

        let key = SessionKey::new(&req.session_id, &req.user_id);
        let history = self.history.get_messages(&key).await?;
        let history_text = instance.format_history(&history);
        let (initial_question, initial_documents) = initial_context(&history);
        let first_turn = history.len() <= 1 && self.settings.first_turn_history_free;

        let (answer, documents, enrichment, order) = match req.workspace_id.as_deref() {
            Some(workspace_id) => {
                let ctx = RetrievalTurn {
                    instance: &instance,
                    workspace_id,
                    prompt: &req.prompt,
                    history_text: &history_text,
                    initial_question,
                    initial_documents: &initial_documents,
                    first_turn,
                };
                let (answer, documents, enrichment) = self.run_retrieval(ctx, phases).await?;
                (answer, documents, enrichment, Some(self.settings.order))
            }
            None => {
                phases.advance(TurnPhase::EnrichingPrompt);
                let input = EnrichmentInput::new(&history_text, &req.prompt)
                    .with_initial_context(initial_question, &initial_documents);
                let enrichment = self.enrich(&instance, &input).await?;

                phases.advance(TurnPhase::Generating);
                let answer = instance.converse(&history_text, &enrichment.prompt).await?;
                (answer, Vec::new(), enrichment, None)
            }
        };

        let applied = enrichment.prompt != req.prompt;
        let metadata = MetadataRecord {
            model_id: model.model.clone(),
            model_kwargs: match &req.model_kwargs {
                serde_json::Value::Null => serde_json::json!({}),
                other => other.clone(),
            },
            mode: mode.as_str().to_string(),
            session_id: req.session_id.clone(),
            user_id: req.user_id.clone(),
            workspace_id: req.workspace_id.clone(),
            documents,
            prompts: recorder.prompts(),
            original_prompt: applied.then(|| req.prompt.clone()),
            enrichment: EnrichmentSummary::new(&enrichment.report, order, applied),
        };

        Ok(PreparedTurn {
            key,
            human: Turn::human(&req.prompt),
            answer,
            metadata,
            streamed_tokens: recorder.token_count(),
        })
    }

    /// Resolve the adapter and bind the three completion targets a turn
    /// may use, all reporting to `recorder`.
    fn instantiate(
        &self,
        model: &ModelRef,
        kwargs: &serde_json::Value,
        recorder: Arc<PromptRecorder>,
    ) -> Result<AdapterInstance> {
        let adapter = self.registry.adapter_for(model)?;

        let mut params =
            GenerationParams::from_kwargs(kwargs).map_err(|e| Error::AdapterConstruction {
                model_id: model.model.clone(),
                message: format!("invalid model kwargs: {e}"),
            })?;
        let streams = self
            .registry
            .describe(&model.qualified())
            .map(|d| d.streaming)
            .unwrap_or(true);
        if params.streaming && !streams {
            tracing::warn!(model_id = %model.qualified(), "model does not stream, answering in one piece");
            params = params.non_streaming();
        }

        let llm = adapter
            .get_llm(self.service.clone(), &params, recorder.clone())?
            .with_timeout(self.settings.llm_timeout);
        let condense_llm = llm.non_streaming();

        let rewrite_params = GenerationParams {
            temperature: Some(self.settings.rewrite_temperature),
            top_p: None,
            max_tokens: Some(self.settings.rewrite_max_tokens),
            streaming: false,
        };
        let rewrite_llm = adapter
            .get_llm(self.service.clone(), &rewrite_params, recorder)?
            .with_timeout(self.settings.llm_timeout);

        Ok(AdapterInstance {
            adapter,
            llm,
            condense_llm,
            rewrite_llm,
        })
    }

    async fn enrich(&self, instance: &AdapterInstance, input: &EnrichmentInput<'_>) -> Result<Enrichment> {
        self.enricher.enrich(&instance.rewrite_llm, input).await
    }

    async fn retrieve(&self, workspace_id: &str, query: &str) -> Vec<Document> {
        match &self.retrieval {
            Some(retrieval) => retrieval.get_relevant_documents(workspace_id, query).await,
            None => {
                tracing::warn!(workspace_id = %workspace_id, "no retrieval backend configured");
                Vec::new()
            }
        }
    }

    async fn run_retrieval(
        &self,
        ctx: RetrievalTurn<'_>,
        phases: &mut PhaseTracker,
    ) -> Result<(String, Vec<Document>, Enrichment)> {
        let RetrievalTurn {
            instance,
            workspace_id,
            prompt,
            history_text,
            initial_question,
            initial_documents,
            first_turn,
        } = ctx;

        let (documents, enrichment, standalone) = match self.settings.order {
            EnrichmentOrder::PostRetrieval => {
                phases.advance(TurnPhase::Retrieving);
                let documents = self.retrieve(workspace_id, prompt).await;

                phases.advance(TurnPhase::EnrichingPrompt);
                // The session's first retrieval supplies its own initial
                // documents.
                let seed = if initial_documents.is_empty() {
                    documents.as_slice()
                } else {
                    initial_documents
                };
                let input = EnrichmentInput::new(history_text, prompt)
                    .with_initial_context(initial_question, seed);
                let enrichment = self.enrich(instance, &input).await?;

                phases.advance(TurnPhase::Generating);
                let standalone = self
                    .standalone_question(instance, history_text, &enrichment.prompt, first_turn)
                    .await?;
                (documents, enrichment, standalone)
            }
            EnrichmentOrder::PreRetrieval => {
                phases.advance(TurnPhase::EnrichingPrompt);
                let input = EnrichmentInput::new(history_text, prompt)
                    .with_initial_context(initial_question, initial_documents);
                let enrichment = self.enrich(instance, &input).await?;
                let standalone = self
                    .standalone_question(instance, history_text, &enrichment.prompt, first_turn)
                    .await?;

                phases.advance(TurnPhase::Retrieving);
                let documents = self.retrieve(workspace_id, &standalone).await;
                phases.advance(TurnPhase::Generating);
                (documents, enrichment, standalone)
            }
        };

        let qa_history = if first_turn { "" } else { history_text };
        let answer = instance
            .answer_from_documents(qa_history, &standalone, &documents)
            .await?;
        Ok((answer, documents, enrichment))
    }

    async fn standalone_question(
        &self,
        instance: &AdapterInstance,
        history_text: &str,
        question: &str,
        first_turn: bool,
    ) -> Result<String> {
        if first_turn || history_text.is_empty() {
            return Ok(question.to_string());
        }
        instance.condense_question(history_text, question).await
    }

    // ── Persistence (not cancellable) ───────────────────────────────

    async fn persist(&self, turn: PreparedTurn, phases: &mut PhaseTracker) -> Result<Response> {
        phases.advance(TurnPhase::Persisting);

        let PreparedTurn {
            key,
            human,
            answer,
            metadata,
            ..
        } = turn;
        let assistant = Turn::assistant(&answer, metadata.to_value()?);

        if let Err(e) = self.history.append_exchange(&key, human, assistant).await {
            tracing::error!(session = %key, error = %e, "failed to persist turn");
            return Err(e);
        }

        Ok(Response {
            session_id: key.session_id,
            content_type: "text".into(),
            content: answer,
            metadata,
        })
    }
}

/// Borrowed inputs of the retrieval path.
struct RetrievalTurn<'a> {
    instance: &'a AdapterInstance,
    workspace_id: &'a str,
    prompt: &'a str,
    history_text: &'a str,
    initial_question: Option<&'a str>,
    initial_documents: &'a [Document],
    first_turn: bool,
}

fn validate(req: &TurnRequest) -> Result<()> {
    if req.session_id.trim().is_empty() {
        return Err(Error::InvalidInput("session id is empty".into()));
    }
    if req.user_id.trim().is_empty() {
        return Err(Error::InvalidInput("user id is empty".into()));
    }
    if req.prompt.trim().is_empty() {
        return Err(Error::InvalidInput("prompt is empty".into()));
    }
    if matches!(req.workspace_id.as_deref(), Some(w) if w.trim().is_empty()) {
        return Err(Error::InvalidInput("workspace id is empty".into()));
    }
    Ok(())
}
