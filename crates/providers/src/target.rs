//! A completion service bound to one model and one parameter set.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use pl_domain::error::{Error, Result};
use pl_domain::stream::{StreamEvent, Usage};
use pl_domain::trace::TraceEvent;
use serde_json::{Map, Value};

use crate::traits::{CompletionObserver, CompletionRequest, CompletionService};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// What [`ModelAdapter::get_llm`](crate::ModelAdapter::get_llm) hands back:
/// everything needed to turn a rendered prompt into text.
#[derive(Clone)]
pub struct CompletionTarget {
    service: Arc<dyn CompletionService>,
    model_id: String,
    parameters: Map<String, Value>,
    streaming: bool,
    timeout: Duration,
    observer: Arc<dyn CompletionObserver>,
}

impl CompletionTarget {
    pub fn new(
        service: Arc<dyn CompletionService>,
        model_id: impl Into<String>,
        parameters: Map<String, Value>,
        streaming: bool,
        observer: Arc<dyn CompletionObserver>,
    ) -> Self {
        Self {
            service,
            model_id: model_id.into(),
            parameters,
            streaming,
            timeout: DEFAULT_TIMEOUT,
            observer,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Native (family-specific) parameters sent with every call.
    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Same target with streaming off.
    pub fn non_streaming(&self) -> Self {
        Self {
            streaming: false,
            ..self.clone()
        }
    }

    /// Dispatch `prompt` and return the generated text.
    ///
    /// The observer sees the prompt before the request leaves. Streamed
    /// tokens are forwarded to the observer and concatenated. Timeouts
    /// surface as [`Error::Timeout`]; every other failure as
    /// [`Error::ModelInvocation`].
    pub async fn invoke(&self, prompt: &str) -> Result<String> {
        self.observer.on_prompt_issued(prompt);

        let req = CompletionRequest {
            model_id: self.model_id.clone(),
            prompt: prompt.to_string(),
            parameters: self.parameters.clone(),
        };
        let service_id = self.service.service_id().to_string();
        let started = Instant::now();

        let outcome = tokio::time::timeout(self.timeout, self.dispatch(&req))
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "{service_id}/{} after {}ms",
                    self.model_id,
                    self.timeout.as_millis()
                ))
            })?;

        let (text, usage) = outcome.map_err(|e| match e {
            Error::Timeout(_) | Error::ModelInvocation { .. } => e,
            other => Error::ModelInvocation {
                service: service_id.clone(),
                message: other.to_string(),
            },
        })?;

        TraceEvent::LlmRequest {
            service: service_id,
            model: self.model_id.clone(),
            streaming: self.streaming,
            duration_ms: started.elapsed().as_millis() as u64,
            prompt_tokens: usage.as_ref().map(|u| u.prompt_tokens),
            completion_tokens: usage.as_ref().map(|u| u.completion_tokens),
        }
        .emit();

        Ok(text)
    }

    async fn dispatch(&self, req: &CompletionRequest) -> Result<(String, Option<Usage>)> {
        if !self.streaming {
            let resp = self.service.invoke(req).await?;
            return Ok((resp.text, resp.usage));
        }

        let mut stream = self.service.invoke_stream(req).await?;
        let mut text = String::new();
        let mut usage = None;
        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::Token { text: token } => {
                    self.observer.on_token(&token);
                    text.push_str(&token);
                }
                StreamEvent::Done { usage: u, .. } => {
                    // Usage-only chunks may follow the first Done.
                    if u.is_some() {
                        usage = u;
                    }
                }
                StreamEvent::Error { message } => {
                    return Err(Error::ModelInvocation {
                        service: self.service.service_id().to_string(),
                        message,
                    });
                }
            }
        }
        Ok((text, usage))
    }
}

impl std::fmt::Debug for CompletionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionTarget")
            .field("service", &self.service.service_id())
            .field("model_id", &self.model_id)
            .field("parameters", &self.parameters)
            .field("streaming", &self.streaming)
            .field("timeout", &self.timeout)
            .finish()
    }
}
