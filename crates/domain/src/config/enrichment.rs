use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Prompt enrichment
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Controls how the raw user prompt is turned into the prompt sent to the
/// model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default)]
    pub strategy: EnrichmentStrategy,
    /// Only meaningful on the retrieval path.
    #[serde(default)]
    pub order: EnrichmentOrder,
    /// Characters of each document shown in the local preview block.
    #[serde(default = "d_200")]
    pub preview_chars: usize,
    /// Hard cap on a model-assisted rewrite.
    #[serde(default = "d_1000")]
    pub rewrite_max_chars: usize,
    /// Temperature for the rewrite call.
    #[serde(default = "d_rewrite_temperature")]
    pub rewrite_temperature: f32,
    /// Token budget for the rewrite call.
    #[serde(default = "d_rewrite_max_tokens")]
    pub rewrite_max_tokens: u32,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            strategy: EnrichmentStrategy::Local,
            order: EnrichmentOrder::PostRetrieval,
            preview_chars: 200,
            rewrite_max_chars: 1000,
            rewrite_temperature: d_rewrite_temperature(),
            rewrite_max_tokens: d_rewrite_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStrategy {
    /// Deterministic concatenation of history, initial context and the
    /// question.
    #[default]
    Local,
    /// One auxiliary completion call that rewrites the question.
    ModelAssisted,
}

impl EnrichmentStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::ModelAssisted => "model_assisted",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentOrder {
    /// Retrieve with the raw prompt, then enrich with the results.
    #[default]
    PostRetrieval,
    /// Enrich first and retrieve with the standalone question.
    PreRetrieval,
}

impl EnrichmentOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PostRetrieval => "post_retrieval",
            Self::PreRetrieval => "pre_retrieval",
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_200() -> usize {
    200
}
fn d_1000() -> usize {
    1000
}
fn d_rewrite_temperature() -> f32 {
    0.1
}
fn d_rewrite_max_tokens() -> u32 {
    512
}
