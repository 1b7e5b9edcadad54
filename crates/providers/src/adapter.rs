//! The per-family adapter contract.
//!
//! An adapter knows three things about a model family: how caller
//! parameters map onto the family's native names, which prompt templates
//! the family answers best to, and how prior turns are framed inside those
//! templates.

use std::sync::Arc;

use pl_domain::error::{Error, Result};
use pl_domain::model::GenerationParams;
use pl_domain::turn::{Role, Turn};
use serde_json::{Map, Value};

use crate::prompt::PromptTemplate;
use crate::target::CompletionTarget;
use crate::traits::{CompletionObserver, CompletionService};

pub trait ModelAdapter: Send + Sync {
    /// Stable family name (`claude`, `titan`, ...).
    fn family(&self) -> &'static str;

    /// Bare model id this adapter was created for.
    fn model_id(&self) -> &str;

    /// Bind `service` to this model with `params`. Fails with
    /// [`Error::AdapterConstruction`] on out-of-range parameters or when the
    /// service is not ready.
    fn get_llm(
        &self,
        service: Arc<dyn CompletionService>,
        params: &GenerationParams,
        observer: Arc<dyn CompletionObserver>,
    ) -> Result<CompletionTarget>;

    /// Embeddings model paired with this family, if any.
    fn embeddings_model(&self) -> Option<&str>;

    /// Plain-path template: `{chat_history}`, `{input}`.
    fn conversation_prompt(&self) -> PromptTemplate;

    /// Answer-from-documents template: `{context}`, `{question}` and
    /// optionally `{chat_history}`.
    fn qa_prompt(&self) -> PromptTemplate;

    /// Standalone-question template: `{chat_history}`, `{question}`.
    fn condense_question_prompt(&self) -> PromptTemplate;

    /// Render prior turns for the `{chat_history}` slot.
    fn format_history(&self, turns: &[Turn]) -> String {
        turns
            .iter()
            .map(|t| match t.role {
                Role::Human => format!("Human: {}", t.content),
                Role::Assistant => format!("AI: {}", t.content),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Shared helpers for concrete adapters
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Native parameter names of one family.
pub(crate) struct NativeNames {
    pub temperature: &'static str,
    pub top_p: &'static str,
    pub max_tokens: &'static str,
    /// Highest accepted temperature.
    pub max_temperature: f32,
}

/// Validate `params` and rename them for the family. Absent parameters
/// are left out so the service applies its own defaults.
pub(crate) fn native_parameters(
    model_id: &str,
    params: &GenerationParams,
    names: &NativeNames,
) -> Result<Map<String, Value>> {
    let invalid = |message: String| Error::AdapterConstruction {
        model_id: model_id.to_string(),
        message,
    };

    let mut out = Map::new();
    if let Some(t) = params.temperature {
        if !(0.0..=names.max_temperature).contains(&t) {
            return Err(invalid(format!(
                "temperature {t} outside 0..={}",
                names.max_temperature
            )));
        }
        out.insert(names.temperature.into(), Value::from(t));
    }
    if let Some(p) = params.top_p {
        if !(0.0..=1.0).contains(&p) {
            return Err(invalid(format!("topP {p} outside 0..=1")));
        }
        out.insert(names.top_p.into(), Value::from(p));
    }
    if let Some(m) = params.max_tokens {
        if m == 0 {
            return Err(invalid("maxTokens must be greater than 0".into()));
        }
        out.insert(names.max_tokens.into(), Value::from(m));
    }
    Ok(out)
}

/// The common tail of every `get_llm`: readiness check, then bind.
pub(crate) fn bind_target(
    model_id: &str,
    service: Arc<dyn CompletionService>,
    parameters: Map<String, Value>,
    params: &GenerationParams,
    observer: Arc<dyn CompletionObserver>,
) -> Result<CompletionTarget> {
    service
        .check_ready()
        .map_err(|e| Error::AdapterConstruction {
            model_id: model_id.to_string(),
            message: e.to_string(),
        })?;
    Ok(CompletionTarget::new(
        service,
        model_id,
        parameters,
        params.streaming,
        observer,
    ))
}
