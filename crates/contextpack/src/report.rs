use pl_domain::config::EnrichmentStrategy;
use pl_domain::trace::TraceEvent;
use serde::{Deserialize, Serialize};

/// What one enrichment run did. Emitted as a trace event and summarized
/// in the turn's metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentReport {
    pub strategy: EnrichmentStrategy,
    pub input_chars: usize,
    pub output_chars: usize,
    pub documents_previewed: usize,
    /// Previews whose document was longer than the preview budget.
    pub previews_truncated: usize,
    /// The raw prompt was used because the strategy failed.
    pub fallback: bool,
    /// Set when a model-assisted rewrite hit the output cap.
    pub output_capped: bool,
}

impl EnrichmentReport {
    pub(crate) fn new(strategy: EnrichmentStrategy, input: &str) -> Self {
        Self {
            strategy,
            input_chars: input.chars().count(),
            output_chars: 0,
            documents_previewed: 0,
            previews_truncated: 0,
            fallback: false,
            output_capped: false,
        }
    }

    pub fn emit(&self) {
        TraceEvent::PromptEnriched {
            strategy: self.strategy.as_str().to_string(),
            input_chars: self.input_chars,
            output_chars: self.output_chars,
            documents_previewed: self.documents_previewed,
            previews_truncated: self.previews_truncated,
            fallback: self.fallback,
        }
        .emit();
    }
}
