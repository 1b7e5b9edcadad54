use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Document retrieval service
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "d_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Env var holding the API key (used when `api_key` is unset).
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Per-request timeout; a query that exceeds it yields zero documents.
    #[serde(default = "d_8000")]
    pub timeout_ms: u64,
    #[serde(default = "d_3")]
    pub max_retries: u32,
    /// Maximum number of documents requested per query.
    #[serde(default = "d_limit")]
    pub limit: usize,
    /// Minimum relevance score; `None` lets the service decide.
    #[serde(default)]
    pub threshold: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            base_url: d_url(),
            api_key: None,
            api_key_env: None,
            timeout_ms: 8000,
            max_retries: 3,
            limit: d_limit(),
            threshold: None,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_url() -> String {
    "http://localhost:5000".into()
}
fn d_8000() -> u64 {
    8000
}
fn d_3() -> u32 {
    3
}
fn d_limit() -> usize {
    4
}
