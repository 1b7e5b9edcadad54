use pl_domain::error::Result;
use pl_domain::stream::{BoxStream, StreamEvent, Usage};
use serde_json::{Map, Value};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A single-prompt completion request.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    /// Bare model id (no provider prefix), e.g. `anthropic.claude-v2:1`.
    pub model_id: String,
    /// The fully rendered prompt.
    pub prompt: String,
    /// Generation parameters under the model family's native names
    /// (`top_p`, `maxTokenCount`, `max_gen_len`, ...).
    pub parameters: Map<String, Value>,
}

/// A completed generation.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: String,
    pub usage: Option<Usage>,
    /// The model that actually produced the response.
    pub model: String,
    pub finish_reason: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Completion service
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The external text-generation backend every adapter dispatches to.
///
/// Implementations translate a [`CompletionRequest`] to their wire format.
/// They never retry; callers decide what a failure means.
#[async_trait::async_trait]
pub trait CompletionService: Send + Sync {
    /// Generate and wait for the full text.
    async fn invoke(&self, req: &CompletionRequest) -> Result<CompletionResponse>;

    /// Generate and return a stream of events ending in `Done` or `Error`.
    async fn invoke_stream(
        &self,
        req: &CompletionRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>>;

    /// A unique identifier for this service instance.
    fn service_id(&self) -> &str;

    /// Whether the service can accept calls at all (credentials resolved,
    /// endpoint configured). Checked when an adapter builds a target.
    fn check_ready(&self) -> Result<()> {
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Observer
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Receives notifications from a [`CompletionTarget`](crate::CompletionTarget).
///
/// One observer is bound per turn; it sees every prompt the turn issues,
/// condensation and rewrite calls included.
pub trait CompletionObserver: Send + Sync {
    /// Called with the exact prompt text just before it is dispatched.
    fn on_prompt_issued(&self, prompt: &str);

    /// Called for every streamed token.
    fn on_token(&self, _token: &str) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl CompletionObserver for NoopObserver {
    fn on_prompt_issued(&self, _prompt: &str) {}
}
