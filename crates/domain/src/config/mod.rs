mod enrichment;
mod llm;
mod observability;
mod retrieval;
mod sessions;

pub use enrichment::*;
pub use llm::*;
pub use observability::*;
pub use retrieval::*;
pub use sessions::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Orchestrator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Render the QA prompt with an empty history while the session has at
    /// most one stored turn, and skip the condense step.
    #[serde(default = "d_true")]
    pub first_turn_history_free: bool,
    /// Upper bound for a whole turn, persistence excluded.
    #[serde(default = "d_turn_timeout")]
    pub turn_timeout_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            first_turn_history_free: true,
            turn_timeout_ms: d_turn_timeout(),
        }
    }
}

fn d_true() -> bool {
    true
}
fn d_turn_timeout() -> u64 {
    180_000
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut push = |severity, field: &str, message: &str| {
            errors.push(ConfigError {
                severity,
                field: field.into(),
                message: message.into(),
            })
        };

        if self.llm.service.base_url.is_empty() {
            push(
                ConfigSeverity::Error,
                "llm.service.base_url",
                "base_url must not be empty",
            );
        }
        if self.llm.default_timeout_ms == 0 {
            push(
                ConfigSeverity::Error,
                "llm.default_timeout_ms",
                "timeout must be greater than 0",
            );
        }
        if self.llm.service.auth.mode == AuthMode::ApiKey
            && self.llm.service.auth.key.is_none()
            && self.llm.service.auth.env.is_none()
            && self.llm.service.auth.service.is_none()
        {
            push(
                ConfigSeverity::Warning,
                "llm.service.auth",
                "api_key mode without key, env or keychain entry; calls will fail",
            );
        }

        if self.retrieval.base_url.is_empty() {
            push(
                ConfigSeverity::Error,
                "retrieval.base_url",
                "base_url must not be empty",
            );
        }
        if self.retrieval.limit == 0 {
            push(
                ConfigSeverity::Warning,
                "retrieval.limit",
                "limit 0 means every retrieval turn runs without documents",
            );
        }

        if self.enrichment.preview_chars == 0 {
            push(
                ConfigSeverity::Warning,
                "enrichment.preview_chars",
                "document previews will be empty",
            );
        }
        if self.enrichment.rewrite_max_chars == 0 {
            push(
                ConfigSeverity::Error,
                "enrichment.rewrite_max_chars",
                "rewrite cap must be greater than 0",
            );
        }

        if !(0.0..=1.0).contains(&self.observability.sample_rate) {
            push(
                ConfigSeverity::Error,
                "observability.sample_rate",
                "sample rate must be between 0.0 and 1.0",
            );
        }

        errors
    }
}
