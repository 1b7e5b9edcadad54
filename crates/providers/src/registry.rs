//! Model registry.
//!
//! Maps provider-qualified model ids (`bedrock.anthropic.claude-v2:1`) to
//! adapter factories through an ordered list of regular expressions. The
//! first registered pattern that matches wins, so more specific patterns
//! must be registered before broader ones. The registry is filled at
//! startup and only read afterwards; share it behind an `Arc`.

use std::sync::Arc;

use pl_domain::error::{Error, Result};
use pl_domain::model::{ModelDescriptor, ModelRef};
use pl_domain::trace::TraceEvent;
use regex::Regex;

use crate::adapter::ModelAdapter;
use crate::catalog;
use crate::claude::ClaudeAdapter;
use crate::llama2::Llama2ChatAdapter;
use crate::llama3::Llama3InstructAdapter;
use crate::titan::TitanAdapter;

/// Builds an adapter for a bare model id.
pub type AdapterFactory = Arc<dyn Fn(&str) -> Arc<dyn ModelAdapter> + Send + Sync>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ModelRegistry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct ModelRegistry {
    entries: Vec<(Regex, AdapterFactory)>,
    catalog: Vec<ModelDescriptor>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    /// An empty registry with an empty catalog.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            catalog: Vec::new(),
        }
    }

    /// The built-in families and the Bedrock text-model catalog.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let builtins: [(&str, AdapterFactory); 4] = [
            (
                r"^bedrock\.anthropic\.claude.*",
                Arc::new(|m: &str| Arc::new(ClaudeAdapter::new(m)) as Arc<dyn ModelAdapter>),
            ),
            (
                r"^bedrock\.amazon\.titan-t.*",
                Arc::new(|m: &str| Arc::new(TitanAdapter::new(m)) as Arc<dyn ModelAdapter>),
            ),
            (
                r"^bedrock\.meta\.llama2-.*-chat.*",
                Arc::new(|m: &str| Arc::new(Llama2ChatAdapter::new(m)) as Arc<dyn ModelAdapter>),
            ),
            (
                r"^bedrock\.meta\.llama3-.*-instruct.*",
                Arc::new(|m: &str| {
                    Arc::new(Llama3InstructAdapter::new(m)) as Arc<dyn ModelAdapter>
                }),
            ),
        ];
        for (pattern, factory) in builtins {
            // Built-in patterns are literals above; a compile failure here
            // is a programming error caught by the registry tests.
            if let Ok(re) = Regex::new(pattern) {
                registry.entries.push((re, factory));
            }
        }
        registry.catalog = catalog::bedrock_text_models();
        registry
    }

    /// Append `factory` under `pattern`. Earlier registrations take
    /// precedence on overlap.
    pub fn register<F>(&mut self, pattern: &str, factory: F) -> Result<()>
    where
        F: Fn(&str) -> Arc<dyn ModelAdapter> + Send + Sync + 'static,
    {
        let re = Regex::new(pattern)
            .map_err(|e| Error::Config(format!("invalid adapter pattern {pattern:?}: {e}")))?;
        self.entries.push((re, Arc::new(factory)));
        Ok(())
    }

    /// The factory registered for a provider-qualified model id.
    pub fn resolve(&self, qualified_model_id: &str) -> Result<AdapterFactory> {
        self.entries
            .iter()
            .find(|(re, _)| re.is_match(qualified_model_id))
            .map(|(_, factory)| factory.clone())
            .ok_or_else(|| Error::NoMatchingAdapter(qualified_model_id.to_string()))
    }

    /// Resolve and instantiate in one step.
    pub fn adapter_for(&self, model: &ModelRef) -> Result<Arc<dyn ModelAdapter>> {
        let qualified = model.qualified();
        let factory = self.resolve(&qualified)?;
        let adapter = factory(&model.model);

        TraceEvent::AdapterResolved {
            model_id: qualified,
            family: adapter.family().to_string(),
        }
        .emit();

        Ok(adapter)
    }

    /// Registered patterns in precedence order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(re, _)| re.as_str())
    }

    // ── Catalog ───────────────────────────────────────────────────────

    /// Append catalog entries, replacing any with the same qualified id.
    pub fn add_descriptors(&mut self, descriptors: impl IntoIterator<Item = ModelDescriptor>) {
        for d in descriptors {
            let id = d.qualified_id();
            self.catalog.retain(|existing| existing.qualified_id() != id);
            self.catalog.push(d);
        }
    }

    pub fn descriptors(&self) -> &[ModelDescriptor] {
        &self.catalog
    }

    pub fn describe(&self, qualified_model_id: &str) -> Option<&ModelDescriptor> {
        self.catalog
            .iter()
            .find(|d| d.qualified_id() == qualified_model_id)
    }

    /// Whether a registered adapter can serve the catalog entry.
    pub fn is_servable(&self, descriptor: &ModelDescriptor) -> bool {
        self.resolve(&descriptor.qualified_id()).is_ok()
    }
}
