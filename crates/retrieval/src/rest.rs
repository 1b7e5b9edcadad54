//! REST implementation of [`DocumentRetriever`].
//!
//! `RestDocumentRetriever` posts the query to
//! `{base_url}/workspaces/{workspaceId}/query`, with automatic retry and
//! exponential back-off on transient (5xx / timeout / connect) failures.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use pl_domain::config::RetrievalConfig;
use pl_domain::error::{Error, Result};
use pl_domain::trace::TraceEvent;
use pl_domain::turn::Document;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use uuid::Uuid;

use crate::retriever::DocumentRetriever;
use crate::types::{WorkspaceQueryRequest, WorkspaceQueryResponse};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Created once at startup and shared; the underlying `reqwest::Client`
/// keeps a connection pool.
#[derive(Debug, Clone)]
pub struct RestDocumentRetriever {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
    limit: usize,
    threshold: Option<f32>,
    max_retries: u32,
    initial_backoff: Duration,
}

impl RestDocumentRetriever {
    pub fn new(cfg: &RetrievalConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        let base_url = Url::parse(cfg.base_url.trim_end_matches('/'))
            .map_err(|e| Error::Config(format!("retrieval.base_url {:?}: {e}", cfg.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "retrieval.base_url {:?} cannot carry a path",
                cfg.base_url
            )));
        }

        Ok(Self {
            http,
            base_url,
            api_key: resolve_api_key(cfg),
            limit: cfg.limit,
            threshold: cfg.threshold,
            max_retries: cfg.max_retries,
            initial_backoff: Duration::from_millis(100),
        })
    }

    /// Override the first retry delay (doubles per attempt).
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    // ── request helpers ──────────────────────────────────────────────

    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        let rb = rb
            .header("X-Client-Type", "parley")
            .header("X-Trace-Id", Uuid::new_v4().to_string());
        match self.api_key {
            Some(ref key) => rb.header("X-Api-Key", key),
            None => rb,
        }
    }

    /// `{base}/workspaces/{id}/query` with the id percent-encoded as one
    /// path segment.
    pub fn query_url(&self, workspace_id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["workspaces", workspace_id, "query"]);
        }
        url
    }

    // ── retry engine ─────────────────────────────────────────────────

    /// Retries on 5xx and on transport errors; 4xx are permanent. Emits a
    /// `TraceEvent::RetrievalCall` after every attempt.
    async fn execute_with_retry(
        &self,
        endpoint: &str,
        build_request: impl Fn() -> RequestBuilder,
    ) -> Result<Response> {
        let mut last_err: Option<Error> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.initial_backoff * 2u32.saturating_pow(attempt - 1);
                tokio::time::sleep(backoff).await;
            }

            let start = Instant::now();
            let result = self.decorate(build_request()).send().await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(resp) => {
                    let status = resp.status();
                    TraceEvent::RetrievalCall {
                        endpoint: endpoint.to_owned(),
                        status: status.as_u16(),
                        duration_ms,
                    }
                    .emit();

                    if status.is_server_error() {
                        let body = resp.text().await.unwrap_or_default();
                        tracing::debug!(endpoint, attempt, status = status.as_u16(), "transient retrieval failure");
                        last_err = Some(Error::Retrieval(format!(
                            "{endpoint} returned {}: {body}",
                            status.as_u16()
                        )));
                        continue;
                    }

                    if status.is_client_error() {
                        let body = resp.text().await.unwrap_or_default();
                        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                            return Err(Error::Auth(format!(
                                "{endpoint} auth failed ({}): {body}",
                                status.as_u16()
                            )));
                        }
                        return Err(Error::Retrieval(format!(
                            "{endpoint} returned {}: {body}",
                            status.as_u16()
                        )));
                    }

                    return Ok(resp);
                }
                Err(e) => {
                    TraceEvent::RetrievalCall {
                        endpoint: endpoint.to_owned(),
                        status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                        duration_ms,
                    }
                    .emit();
                    last_err = Some(from_reqwest(e));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::Retrieval(format!("{endpoint}: all retries exhausted"))))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl DocumentRetriever for RestDocumentRetriever {
    async fn query(&self, workspace_id: &str, text: &str) -> Result<Vec<Document>> {
        let url = self.query_url(workspace_id);
        let req = WorkspaceQueryRequest {
            query: text.to_owned(),
            limit: self.limit,
            threshold: self.threshold,
        };

        let resp = self
            .execute_with_retry("POST /workspaces/{id}/query", || {
                self.http.post(url.clone()).json(&req)
            })
            .await?;

        let body = resp.text().await.map_err(from_reqwest)?;
        let parsed: WorkspaceQueryResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Retrieval(format!("failed to parse query response: {e}: {body}")))?;

        Ok(parsed
            .items
            .into_iter()
            .map(|dto| dto.into_document())
            .collect())
    }

    fn name(&self) -> &str {
        "rest"
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn resolve_api_key(cfg: &RetrievalConfig) -> Option<String> {
    if let Some(ref key) = cfg.api_key {
        return Some(key.clone());
    }
    let var = cfg.api_key_env.as_deref()?;
    match std::env::var(var) {
        Ok(key) => Some(key),
        Err(_) => {
            tracing::warn!(env_var = %var, "retrieval API key variable not set, querying without a key");
            None
        }
    }
}

/// Timeouts become `Error::Timeout`; everything else `Error::Http`.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retriever(base_url: &str) -> RestDocumentRetriever {
        RestDocumentRetriever::new(&RetrievalConfig {
            base_url: base_url.into(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn query_url_appends_segments() {
        let r = retriever("http://localhost:5000/api/");
        assert_eq!(
            r.query_url("w1").as_str(),
            "http://localhost:5000/api/workspaces/w1/query"
        );
    }

    #[test]
    fn workspace_id_is_encoded() {
        let r = retriever("http://localhost:5000");
        assert_eq!(
            r.query_url("team a/b").as_str(),
            "http://localhost:5000/workspaces/team%20a%2Fb/query"
        );
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let err = RestDocumentRetriever::new(&RetrievalConfig {
            base_url: "not a url".into(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn api_key_from_env() {
        std::env::set_var("PL_TEST_RETRIEVAL_KEY_5150", "rk-1");
        let cfg = RetrievalConfig {
            api_key_env: Some("PL_TEST_RETRIEVAL_KEY_5150".into()),
            ..Default::default()
        };
        assert_eq!(resolve_api_key(&cfg).as_deref(), Some("rk-1"));
        std::env::remove_var("PL_TEST_RETRIEVAL_KEY_5150");
    }
}
