use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Model identity
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A provider-qualified model id such as `bedrock.anthropic.claude-v2`.
///
/// The registry matches on the full qualified string; the completion
/// service only ever sees the bare `model` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRef {
    pub provider: String,
    pub model: String,
}

impl ModelRef {
    /// Split at the first `.`. Returns `None` when either half is empty.
    pub fn parse(qualified: &str) -> Option<Self> {
        let (provider, model) = qualified.split_once('.')?;
        if provider.is_empty() || model.is_empty() {
            return None;
        }
        Some(Self {
            provider: provider.to_string(),
            model: model.to_string(),
        })
    }

    pub fn qualified(&self) -> String {
        format!("{}.{}", self.provider, self.model)
    }
}

/// Catalog entry describing a model the deployment can serve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    pub provider: String,
    pub model_id: String,
    pub name: String,
    #[serde(default)]
    pub streaming: bool,
    #[serde(default = "d_text")]
    pub input_modalities: Vec<String>,
    #[serde(default = "d_text")]
    pub output_modalities: Vec<String>,
    #[serde(default = "d_interface")]
    pub interface: String,
    #[serde(default = "d_true")]
    pub rag_supported: bool,
}

impl ModelDescriptor {
    pub fn qualified_id(&self) -> String {
        format!("{}.{}", self.provider, self.model_id)
    }
}

fn d_text() -> Vec<String> {
    vec!["TEXT".into()]
}
fn d_interface() -> String {
    "langchain".into()
}
fn d_true() -> bool {
    true
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Generation parameters
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Caller-supplied generation settings, parsed once per turn from the
/// request's `model_kwargs`. Unknown keys are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub streaming: bool,
}

impl GenerationParams {
    /// `null` yields the defaults; anything else must be a JSON object
    /// whose known keys carry the right types.
    pub fn from_kwargs(kwargs: &serde_json::Value) -> Result<Self, serde_json::Error> {
        if kwargs.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(kwargs.clone())
    }

    /// Same settings with streaming forced off (used for auxiliary calls
    /// whose output is consumed whole).
    pub fn non_streaming(self) -> Self {
        Self {
            streaming: false,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn model_ref_splits_on_first_dot() {
        let r = ModelRef::parse("bedrock.anthropic.claude-v2:1").unwrap();
        assert_eq!(r.provider, "bedrock");
        assert_eq!(r.model, "anthropic.claude-v2:1");
        assert_eq!(r.qualified(), "bedrock.anthropic.claude-v2:1");
    }

    #[test]
    fn model_ref_rejects_unqualified() {
        assert!(ModelRef::parse("claude").is_none());
        assert!(ModelRef::parse(".claude").is_none());
        assert!(ModelRef::parse("bedrock.").is_none());
    }

    #[test]
    fn params_ignore_unknown_keys() {
        let p = GenerationParams::from_kwargs(&json!({
            "temperature": 0.2,
            "maxTokens": 512,
            "streaming": true,
            "frobnicate": "yes"
        }))
        .unwrap();
        assert_eq!(p.temperature, Some(0.2));
        assert_eq!(p.max_tokens, Some(512));
        assert!(p.streaming);
        assert!(p.top_p.is_none());
    }

    #[test]
    fn params_null_is_default() {
        let p = GenerationParams::from_kwargs(&serde_json::Value::Null).unwrap();
        assert_eq!(p, GenerationParams::default());
    }

    #[test]
    fn params_reject_wrong_types() {
        assert!(GenerationParams::from_kwargs(&json!({ "temperature": "hot" })).is_err());
    }

    #[test]
    fn descriptor_defaults() {
        let d: ModelDescriptor = serde_json::from_value(json!({
            "provider": "bedrock",
            "modelId": "amazon.titan-text-lite-v1",
            "name": "Titan Lite"
        }))
        .unwrap();
        assert_eq!(d.input_modalities, vec!["TEXT".to_string()]);
        assert!(d.rag_supported);
        assert!(!d.streaming);
        assert_eq!(d.qualified_id(), "bedrock.amazon.titan-text-lite-v1");
    }
}
