use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation history storage
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where and how session histories are persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    #[serde(default)]
    pub backend: HistoryBackend,
    /// Root directory for the JSONL backend.
    #[serde(default = "d_state_path")]
    pub state_path: PathBuf,
    /// Store identifier (the table name in hosted deployments). Falls back
    /// to `store_id_env`, then to `"parley-sessions"`.
    #[serde(default)]
    pub store_id: Option<String>,
    #[serde(default = "d_store_id_env")]
    pub store_id_env: String,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            backend: HistoryBackend::Jsonl,
            state_path: d_state_path(),
            store_id: None,
            store_id_env: d_store_id_env(),
        }
    }
}

impl SessionsConfig {
    pub fn resolved_store_id(&self) -> String {
        if let Some(id) = self.store_id.as_deref().filter(|s| !s.is_empty()) {
            return id.to_string();
        }
        std::env::var(&self.store_id_env)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "parley-sessions".into())
    }

    /// Directory holding this store's transcripts.
    pub fn store_dir(&self) -> PathBuf {
        self.state_path.join(self.resolved_store_id())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    #[default]
    Jsonl,
    /// Process-local; histories vanish on exit.
    Memory,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_state_path() -> PathBuf {
    PathBuf::from("./data/sessions")
}
fn d_store_id_env() -> String {
    "SESSIONS_TABLE_NAME".into()
}
