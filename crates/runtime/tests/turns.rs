//! End-to-end turns through `TurnOrchestrator` with an in-process
//! completion service, a canned retriever and in-memory or JSONL history.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pl_contextpack::{Enricher, ModelAssistedEnricher};
use pl_domain::config::EnrichmentOrder;
use pl_domain::error::{Error, Result};
use pl_domain::model::ModelDescriptor;
use pl_domain::stream::{BoxStream, StreamEvent};
use pl_domain::turn::{Document, Role, SessionKey, Turn};
use pl_providers::{CompletionRequest, CompletionResponse, CompletionService, ModelRegistry};
use pl_retrieval::{DocumentRetriever, RetrievalAdapter};
use pl_runtime::{CancellationToken, OrchestratorSettings, TurnOrchestrator, TurnRequest};
use pl_sessions::{HistoryStore, JsonlHistoryStore, MemoryHistoryStore};
use serde_json::{json, Value};

const MODEL: &str = "bedrock.anthropic.claude-v2:1";
const ANSWER: &str = "The deadline is March 1.";
const CONDENSED: &str = "What is the late fee for the March 1 deadline?";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Fakes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Answers condensation prompts with `CONDENSED`, rewrite prompts with a
/// fixed rewrite (or an error), everything else with `ANSWER`.
#[derive(Default)]
struct ScriptedService {
    prompts: Mutex<Vec<String>>,
    streamed: AtomicUsize,
    fail_rewrite: bool,
    delay: Option<Duration>,
}

impl ScriptedService {
    async fn reply(&self, req: &CompletionRequest) -> Result<String> {
        self.prompts.lock().push(req.prompt.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if req.prompt.contains("Reformulated question:") {
            if self.fail_rewrite {
                return Err(Error::ModelInvocation {
                    service: "scripted".into(),
                    message: "throttled".into(),
                });
            }
            return Ok("When is the submission deadline?".into());
        }
        if req.prompt.contains("<followup>") {
            return Ok(CONDENSED.into());
        }
        Ok(ANSWER.into())
    }
}

#[async_trait::async_trait]
impl CompletionService for ScriptedService {
    async fn invoke(&self, req: &CompletionRequest) -> Result<CompletionResponse> {
        Ok(CompletionResponse {
            text: self.reply(req).await?,
            usage: None,
            model: req.model_id.clone(),
            finish_reason: Some("stop".into()),
        })
    }

    async fn invoke_stream(
        &self,
        req: &CompletionRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        self.streamed.fetch_add(1, Ordering::SeqCst);
        let text = self.reply(req).await?;
        let events = vec![
            Ok(StreamEvent::Token { text }),
            Ok(StreamEvent::Done { usage: None, finish_reason: Some("stop".into()) }),
        ];
        Ok(Box::pin(futures_util::stream::iter(events)))
    }

    fn service_id(&self) -> &str {
        "scripted"
    }
}

#[derive(Default)]
struct CannedRetriever {
    documents: Vec<Document>,
    queries: Mutex<Vec<(String, String)>>,
}

impl CannedRetriever {
    fn deadline() -> Self {
        Self {
            documents: vec![Document::new("Deadline is March 1.").with_metadata(json!({ "source": "doc1" }))],
            ..Default::default()
        }
    }
}

#[async_trait::async_trait]
impl DocumentRetriever for CannedRetriever {
    async fn query(&self, workspace_id: &str, text: &str) -> Result<Vec<Document>> {
        self.queries.lock().push((workspace_id.to_string(), text.to_string()));
        Ok(self.documents.clone())
    }
}

/// Counts every store call; optionally refuses writes.
#[derive(Default)]
struct CountingStore {
    inner: MemoryHistoryStore,
    calls: AtomicUsize,
    refuse_writes: bool,
}

#[async_trait::async_trait]
impl HistoryStore for CountingStore {
    async fn get_messages(&self, key: &SessionKey) -> Result<Vec<Turn>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_messages(key).await
    }

    async fn append_turn(&self, key: &SessionKey, turn: Turn) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.append_turn(key, turn).await
    }

    async fn append_exchange(&self, key: &SessionKey, human: Turn, assistant: Turn) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.refuse_writes {
            return Err(Error::Persistence("disk full".into()));
        }
        self.inner.append_exchange(key, human, assistant).await
    }

    async fn add_metadata(&self, key: &SessionKey, metadata: Value) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.add_metadata(key, metadata).await
    }
}

struct Harness {
    service: Arc<ScriptedService>,
    retriever: Arc<CannedRetriever>,
    store: Arc<CountingStore>,
    orchestrator: TurnOrchestrator,
}

fn harness_with(service: ScriptedService, retriever: CannedRetriever, store: CountingStore) -> Harness {
    let service = Arc::new(service);
    let retriever = Arc::new(retriever);
    let store = Arc::new(store);
    let orchestrator = TurnOrchestrator::new(
        Arc::new(ModelRegistry::with_defaults()),
        service.clone(),
        store.clone(),
    )
    .with_retrieval(RetrievalAdapter::new(retriever.clone(), Duration::from_secs(2)));
    Harness {
        service,
        retriever,
        store,
        orchestrator,
    }
}

fn harness() -> Harness {
    harness_with(
        ScriptedService::default(),
        CannedRetriever::deadline(),
        CountingStore::default(),
    )
}

fn key() -> SessionKey {
    SessionKey::new("s1", "u1")
}

fn deadline_request() -> TurnRequest {
    TurnRequest::new("s1", "u1", "When is the deadline?", MODEL).with_workspace("w1")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Retrieval path
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn workspace_turn_answers_from_documents() {
    let h = harness();
    let resp = h
        .orchestrator
        .run(deadline_request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(resp.session_id, "s1");
    assert_eq!(resp.content_type, "text");
    assert_eq!(resp.content, ANSWER);

    let meta = &resp.metadata;
    assert_eq!(meta.model_id, "anthropic.claude-v2:1");
    assert_eq!(meta.mode, "chain");
    assert_eq!(meta.session_id, "s1");
    assert_eq!(meta.user_id, "u1");
    assert_eq!(meta.workspace_id.as_deref(), Some("w1"));
    assert_eq!(meta.documents.len(), 1);
    assert_eq!(meta.documents[0].content, "Deadline is March 1.");

    // First turn: no condensation, a single QA prompt carrying the context.
    assert_eq!(meta.prompts.len(), 1);
    assert!(meta.prompts[0].contains("Deadline is March 1."));
    assert!(meta.prompts[0].contains("When is the deadline?"));

    // The raw prompt was queried and the enriched one was answered.
    assert_eq!(
        *h.retriever.queries.lock(),
        vec![("w1".to_string(), "When is the deadline?".to_string())]
    );
    assert!(meta.enrichment.applied);
    assert_eq!(meta.original_prompt.as_deref(), Some("When is the deadline?"));
    assert_eq!(meta.enrichment.order, Some(EnrichmentOrder::PostRetrieval));

    let turns = h.store.get_messages(&key()).await.unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::Human);
    assert_eq!(turns[0].content, "When is the deadline?");
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[1].content, ANSWER);
    let stored = turns[1].metadata.as_ref().unwrap();
    assert_eq!(stored["workspaceId"], "w1");
    assert_eq!(stored["documents"][0]["metadata"]["source"], "doc1");
}

#[tokio::test]
async fn empty_retrieval_still_answers() {
    let h = harness_with(
        ScriptedService::default(),
        CannedRetriever::default(),
        CountingStore::default(),
    );
    let resp = h
        .orchestrator
        .run(deadline_request(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(resp.content, ANSWER);
    assert!(resp.metadata.documents.is_empty());
    assert_eq!(resp.metadata.workspace_id.as_deref(), Some("w1"));
}

#[tokio::test]
async fn follow_up_condenses_against_history() {
    let h = harness();
    let cancel = CancellationToken::new();
    h.orchestrator.run(deadline_request(), &cancel).await.unwrap();

    let follow_up = TurnRequest::new("s1", "u1", "And the late fee?", MODEL).with_workspace("w1");
    let resp = h.orchestrator.run(follow_up, &cancel).await.unwrap();

    let prompts = &resp.metadata.prompts;
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("<followup>"));
    assert!(prompts[0].contains("When is the deadline?"));
    assert!(prompts[1].contains(CONDENSED));

    // Initial context comes from durable history: the first question and
    // the documents of the first answer.
    assert!(prompts[0].contains("Initial question: When is the deadline?"));
    assert!(prompts[0].contains("- Deadline is March 1."));

    assert_eq!(h.store.inner.get_messages(&key()).await.unwrap().len(), 4);
}

#[tokio::test]
async fn pre_retrieval_queries_with_standalone_question() {
    let h = harness();
    let orchestrator = h.orchestrator.with_settings(OrchestratorSettings {
        order: EnrichmentOrder::PreRetrieval,
        ..Default::default()
    });
    let cancel = CancellationToken::new();
    orchestrator.run(deadline_request(), &cancel).await.unwrap();

    let follow_up = TurnRequest::new("s1", "u1", "And the late fee?", MODEL).with_workspace("w1");
    let resp = orchestrator.run(follow_up, &cancel).await.unwrap();

    let queries = h.retriever.queries.lock();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[1].1, CONDENSED);
    assert_eq!(resp.metadata.enrichment.order, Some(EnrichmentOrder::PreRetrieval));
}

#[tokio::test]
async fn failed_rewrite_falls_back_to_raw_prompt() {
    let h = harness_with(
        ScriptedService {
            fail_rewrite: true,
            ..Default::default()
        },
        CannedRetriever::deadline(),
        CountingStore::default(),
    );
    let orchestrator = h
        .orchestrator
        .with_enricher(Enricher::ModelAssisted(ModelAssistedEnricher::new(200, 1000)));

    let resp = orchestrator
        .run(deadline_request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(resp.content, ANSWER);
    assert!(resp.metadata.enrichment.fallback);
    assert!(!resp.metadata.enrichment.applied);
    assert!(resp.metadata.original_prompt.is_none());
    // The failed rewrite is still part of the turn's prompt record.
    assert_eq!(resp.metadata.prompts.len(), 2);
    assert!(resp.metadata.prompts[0].contains("Reformulated question:"));
}

#[tokio::test]
async fn model_assisted_rewrite_is_answered() {
    let h = harness();
    let orchestrator = h
        .orchestrator
        .with_enricher(Enricher::ModelAssisted(ModelAssistedEnricher::new(200, 1000)));
    let resp = orchestrator
        .run(deadline_request(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!resp.metadata.enrichment.fallback);
    assert!(resp.metadata.enrichment.applied);
    assert!(resp.metadata.prompts[1].contains("When is the submission deadline?"));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Plain path
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn plain_turn_has_no_documents() {
    let h = harness();
    let req = TurnRequest::new("s1", "u1", "Hello there", MODEL);
    let resp = h.orchestrator.run(req, &CancellationToken::new()).await.unwrap();

    assert_eq!(resp.content, ANSWER);
    assert!(resp.metadata.documents.is_empty());
    assert!(resp.metadata.workspace_id.is_none());
    assert!(resp.metadata.enrichment.order.is_none());
    assert!(h.retriever.queries.lock().is_empty());

    let value = resp.metadata.to_value().unwrap();
    assert_eq!(value["documents"], json!([]));
    assert!(value.get("workspaceId").is_none());
}

#[tokio::test]
async fn non_streaming_model_is_not_streamed() {
    let mut registry = ModelRegistry::with_defaults();
    registry.add_descriptors([ModelDescriptor {
        provider: "bedrock".into(),
        model_id: "anthropic.claude-batch".into(),
        name: "Claude Batch".into(),
        streaming: false,
        input_modalities: vec!["TEXT".into()],
        output_modalities: vec!["TEXT".into()],
        interface: "langchain".into(),
        rag_supported: true,
    }]);
    let service = Arc::new(ScriptedService::default());
    let orchestrator = TurnOrchestrator::new(
        Arc::new(registry),
        service.clone(),
        Arc::new(MemoryHistoryStore::new()),
    );

    let req = TurnRequest::new("s1", "u1", "Hello", "bedrock.anthropic.claude-batch")
        .with_kwargs(json!({ "streaming": true }));
    let resp = orchestrator.run(req, &CancellationToken::new()).await.unwrap();
    assert_eq!(resp.content, ANSWER);
    assert_eq!(service.streamed.load(Ordering::SeqCst), 0);

    let req = TurnRequest::new("s2", "u1", "Hello", MODEL).with_kwargs(json!({ "streaming": true }));
    orchestrator.run(req, &CancellationToken::new()).await.unwrap();
    assert_eq!(service.streamed.load(Ordering::SeqCst), 1);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Rejections
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn unknown_model_fails_before_any_io() {
    let h = harness();
    let req = TurnRequest::new("s1", "u1", "Hi", "openai.gpt-4").with_workspace("w1");
    let err = h.orchestrator.run(req, &CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, Error::NoMatchingAdapter(ref id) if id == "openai.gpt-4"));
    assert_eq!(h.store.calls.load(Ordering::SeqCst), 0);
    assert!(h.retriever.queries.lock().is_empty());
    assert!(h.service.prompts.lock().is_empty());
}

#[tokio::test]
async fn unqualified_model_id_is_rejected() {
    let h = harness();
    let req = TurnRequest::new("s1", "u1", "Hi", "claude");
    let err = h.orchestrator.run(req, &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, Error::NoMatchingAdapter(_)));
}

#[tokio::test]
async fn unsupported_mode_is_rejected() {
    let h = harness();
    let req = TurnRequest::new("s1", "u1", "Hi", MODEL).with_mode("agent");
    let err = h.orchestrator.run(req, &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedMode(ref m) if m == "agent"));
    assert_eq!(h.store.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn blank_prompt_is_invalid_input() {
    let h = harness();
    let req = TurnRequest::new("s1", "u1", "   ", MODEL);
    let err = h.orchestrator.run(req, &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(h.store.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_kwargs_fail_adapter_construction() {
    let h = harness();
    let req = TurnRequest::new("s1", "u1", "Hi", MODEL).with_kwargs(json!({ "temperature": "hot" }));
    let err = h.orchestrator.run(req, &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, Error::AdapterConstruction { .. }));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Persistence
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn store_failure_fails_the_turn() {
    let h = harness_with(
        ScriptedService::default(),
        CannedRetriever::deadline(),
        CountingStore {
            refuse_writes: true,
            ..Default::default()
        },
    );
    let err = h
        .orchestrator
        .run(deadline_request(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Persistence(_)));
    assert!(h.store.inner.get_messages(&key()).await.unwrap().is_empty());
}

#[tokio::test]
async fn cancelled_turn_persists_nothing() {
    let h = harness();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = h.orchestrator.run(deadline_request(), &cancel).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert!(h.store.inner.is_empty());
}

#[tokio::test]
async fn cancellation_during_generation_persists_nothing() {
    let h = harness_with(
        ScriptedService {
            delay: Some(Duration::from_secs(5)),
            ..Default::default()
        },
        CannedRetriever::deadline(),
        CountingStore::default(),
    );
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = h.orchestrator.run(deadline_request(), &cancel).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert_eq!(h.service.prompts.lock().len(), 1);
    assert!(h.store.inner.is_empty());
}

#[tokio::test]
async fn turn_deadline_persists_nothing() {
    let h = harness_with(
        ScriptedService {
            delay: Some(Duration::from_secs(5)),
            ..Default::default()
        },
        CannedRetriever::deadline(),
        CountingStore::default(),
    );
    let orchestrator = h.orchestrator.with_settings(OrchestratorSettings {
        turn_timeout: Duration::from_millis(50),
        ..Default::default()
    });
    let err = orchestrator
        .run(deadline_request(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
    assert!(h.store.inner.is_empty());
}

#[tokio::test]
async fn jsonl_history_survives_a_new_store() {
    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(ScriptedService::default());
    let retrieval = RetrievalAdapter::new(Arc::new(CannedRetriever::deadline()), Duration::from_secs(2));

    let first = TurnOrchestrator::new(
        Arc::new(ModelRegistry::with_defaults()),
        service.clone(),
        Arc::new(JsonlHistoryStore::new(dir.path())),
    )
    .with_retrieval(retrieval.clone());
    first
        .run(deadline_request(), &CancellationToken::new())
        .await
        .unwrap();

    let reopened = Arc::new(JsonlHistoryStore::new(dir.path()));
    let turns = reopened.get_messages(&key()).await.unwrap();
    assert_eq!(turns.len(), 2);
    let meta = turns[1].metadata.as_ref().unwrap();
    assert_eq!(meta["sessionId"], "s1");
    assert_eq!(meta["userId"], "u1");
    assert_eq!(meta["documents"][0]["content"], "Deadline is March 1.");

    // A second orchestrator over the reopened store condenses against it.
    let second = TurnOrchestrator::new(Arc::new(ModelRegistry::with_defaults()), service, reopened)
        .with_retrieval(retrieval);
    let follow_up = TurnRequest::new("s1", "u1", "And the late fee?", MODEL).with_workspace("w1");
    let resp = second.run(follow_up, &CancellationToken::new()).await.unwrap();
    assert_eq!(resp.metadata.prompts.len(), 2);
}
