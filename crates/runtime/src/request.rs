//! What a caller hands the orchestrator, and what it gets back.

use std::fmt;
use std::str::FromStr;

use pl_domain::error::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::metadata::MetadataRecord;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Mode
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Orchestration modes. Only the conversational chain exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatbotMode {
    #[default]
    Chain,
}

impl ChatbotMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chain => "chain",
        }
    }
}

impl FromStr for ChatbotMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chain" => Ok(Self::Chain),
            other => Err(Error::UnsupportedMode(other.to_string())),
        }
    }
}

impl fmt::Display for ChatbotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One user message to answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub session_id: String,
    pub user_id: String,
    pub prompt: String,
    /// Set to answer from a workspace's documents.
    #[serde(default)]
    pub workspace_id: Option<String>,
    /// Provider-qualified model id, e.g. `bedrock.anthropic.claude-v2:1`.
    pub model_id: String,
    /// Caller generation parameters (`temperature`, `topP`, `maxTokens`,
    /// `streaming`); unknown keys are ignored.
    #[serde(default)]
    pub model_kwargs: Value,
    /// Kept as text so an unknown mode surfaces as `UnsupportedMode`
    /// rather than a parse failure.
    #[serde(default = "d_mode")]
    pub mode: String,
}

fn d_mode() -> String {
    ChatbotMode::Chain.as_str().to_string()
}

impl TurnRequest {
    pub fn new(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        prompt: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            prompt: prompt.into(),
            workspace_id: None,
            model_id: model_id.into(),
            model_kwargs: Value::Object(Default::default()),
            mode: d_mode(),
        }
    }

    pub fn with_workspace(mut self, workspace_id: impl Into<String>) -> Self {
        self.workspace_id = Some(workspace_id.into());
        self
    }

    pub fn with_kwargs(mut self, kwargs: Value) -> Self {
        self.model_kwargs = kwargs;
        self
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub session_id: String,
    /// Always `"text"`.
    #[serde(rename = "type")]
    pub content_type: String,
    pub content: String,
    pub metadata: MetadataRecord,
}
