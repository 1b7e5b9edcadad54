//! OpenAI-compatible completion service.
//!
//! Works with any gateway that follows the OpenAI chat completions
//! contract (Bedrock access gateways, LiteLLM, vLLM, Ollama, ...). The
//! rendered prompt is sent as a single user message; family-native
//! parameter names are translated to their OpenAI equivalents.

use std::time::Duration;

use pl_domain::config::{AuthMode, ServiceConfig};
use pl_domain::error::{Error, Result};
use pl_domain::stream::{BoxStream, StreamEvent, Usage};
use serde_json::{Map, Value};

use crate::traits::{CompletionRequest, CompletionResponse, CompletionService};
use crate::util::{from_reqwest, resolve_api_key};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Service struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct OpenAiCompatService {
    id: String,
    base_url: String,
    auth_header: String,
    auth_prefix: String,
    /// `Ok(None)` when auth is disabled; `Err` keeps the resolution
    /// failure so `check_ready` can report it per turn.
    api_key: std::result::Result<Option<String>, String>,
    client: reqwest::Client,
}

impl OpenAiCompatService {
    /// Build from config. A missing API key does not fail construction;
    /// it makes every adapter bound to this service fail with an
    /// adapter-construction error instead.
    pub fn from_config(cfg: &ServiceConfig, timeout: Duration) -> Result<Self> {
        let api_key = match cfg.auth.mode {
            AuthMode::None => Ok(None),
            AuthMode::ApiKey => match resolve_api_key(&cfg.auth) {
                Ok(key) => Ok(Some(key)),
                Err(e) => {
                    tracing::warn!(
                        service_id = %cfg.id,
                        error = %e,
                        "completion service has no usable API key"
                    );
                    Err(e.to_string())
                }
            },
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            id: cfg.id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            auth_header: cfg
                .auth
                .header
                .clone()
                .unwrap_or_else(|| "Authorization".into()),
            auth_prefix: cfg.auth.prefix.clone().unwrap_or_else(|| "Bearer ".into()),
            api_key,
            client,
        })
    }

    // ── Internal: build authenticated request builder ──────────────

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .post(url)
            .header("Content-Type", "application/json");
        match &self.api_key {
            Ok(Some(key)) => {
                builder.header(&self.auth_header, format!("{}{}", self.auth_prefix, key))
            }
            _ => builder,
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response> {
        let url = self.chat_url();
        tracing::debug!(service_id = %self.id, url = %url, "completion request");

        let resp = self
            .authed_post(&url)
            .json(body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let err_text = resp.text().await.map_err(from_reqwest)?;
            return Err(Error::ModelInvocation {
                service: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), err_text),
            });
        }
        Ok(resp)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request body
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// OpenAI name for a family-native parameter, `None` for parameters the
/// wire format has no slot for.
fn openai_param_name(native: &str) -> Option<&'static str> {
    match native {
        "temperature" => Some("temperature"),
        "top_p" | "topP" => Some("top_p"),
        "max_tokens" | "maxTokenCount" | "max_gen_len" => Some("max_tokens"),
        _ => None,
    }
}

fn build_chat_body(req: &CompletionRequest, stream: bool) -> Value {
    let mut body = serde_json::json!({
        "model": req.model_id,
        "messages": [{ "role": "user", "content": req.prompt }],
        "stream": stream,
    });

    let mut translated = Map::new();
    for (name, value) in &req.parameters {
        match openai_param_name(name) {
            Some(openai) => {
                translated.insert(openai.into(), value.clone());
            }
            None => tracing::debug!(parameter = %name, "no OpenAI equivalent, dropped"),
        }
    }
    if let Value::Object(obj) = &mut body {
        obj.extend(translated);
    }

    if stream {
        body["stream_options"] = serde_json::json!({ "include_usage": true });
    }
    body
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn parse_chat_response(service: &str, body: &Value) -> Result<CompletionResponse> {
    let invalid = |message: &str| Error::ModelInvocation {
        service: service.to_string(),
        message: message.to_string(),
    };

    let choice = body
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .ok_or_else(|| invalid("no choices in response"))?;

    let text = choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| invalid("no text content in choice"))?
        .to_string();

    Ok(CompletionResponse {
        text,
        usage: body.get("usage").and_then(parse_usage),
        model: body
            .get("model")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string(),
        finish_reason: choice
            .get("finish_reason")
            .and_then(|v| v.as_str())
            .map(String::from),
    })
}

fn parse_usage(v: &Value) -> Option<Usage> {
    Some(Usage {
        prompt_tokens: v.get("prompt_tokens")?.as_u64()? as u32,
        completion_tokens: v.get("completion_tokens")?.as_u64()? as u32,
        total_tokens: v.get("total_tokens")?.as_u64()? as u32,
    })
}

/// Parse one SSE `data:` payload.
fn parse_sse_data(data: &str) -> Vec<Result<StreamEvent>> {
    if data.trim() == "[DONE]" {
        return vec![Ok(StreamEvent::Done {
            usage: None,
            finish_reason: Some("stop".into()),
        })];
    }

    let v: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => return vec![Err(Error::Json(e))],
    };

    if let Some(err) = v.get("error") {
        let message = err
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("stream error")
            .to_string();
        return vec![Ok(StreamEvent::Error { message })];
    }

    let Some(choice) = v
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
    else {
        // Usage-only chunk (stream_options.include_usage).
        return match v.get("usage").and_then(parse_usage) {
            Some(usage) => vec![Ok(StreamEvent::Done {
                usage: Some(usage),
                finish_reason: None,
            })],
            None => Vec::new(),
        };
    };

    let mut events = Vec::new();
    if let Some(text) = choice
        .get("delta")
        .and_then(|d| d.get("content"))
        .and_then(|v| v.as_str())
    {
        if !text.is_empty() {
            events.push(Ok(StreamEvent::Token {
                text: text.to_string(),
            }));
        }
    }
    if let Some(fr) = choice.get("finish_reason").and_then(|f| f.as_str()) {
        events.push(Ok(StreamEvent::Done {
            usage: v.get("usage").and_then(parse_usage),
            finish_reason: Some(fr.to_string()),
        }));
    }
    events
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl CompletionService for OpenAiCompatService {
    async fn invoke(&self, req: &CompletionRequest) -> Result<CompletionResponse> {
        let resp = self.post(&build_chat_body(req, false)).await?;
        let resp_text = resp.text().await.map_err(from_reqwest)?;
        let resp_json: Value = serde_json::from_str(&resp_text)?;
        parse_chat_response(&self.id, &resp_json)
    }

    async fn invoke_stream(
        &self,
        req: &CompletionRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        let resp = self.post(&build_chat_body(req, true)).await?;
        Ok(crate::sse::sse_response_stream(resp, parse_sse_data))
    }

    fn service_id(&self) -> &str {
        &self.id
    }

    fn check_ready(&self) -> Result<()> {
        match &self.api_key {
            Ok(_) => Ok(()),
            Err(reason) => Err(Error::Auth(format!("service {}: {reason}", self.id))),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
