use pl_domain::config::{EnrichmentConfig, EnrichmentStrategy};
use pl_domain::error::{Error, Result};
use pl_domain::turn::Document;
use pl_providers::CompletionTarget;

use crate::injection;
use crate::report::EnrichmentReport;
use crate::rewrite::ModelAssistedEnricher;
use crate::truncation;

/// Everything an enrichment strategy may look at. Borrowed for the
/// duration of one turn.
#[derive(Debug, Clone, Copy)]
pub struct EnrichmentInput<'a> {
    /// Prior turns, already rendered in the model family's framing.
    pub history: &'a str,
    /// The raw user prompt.
    pub input: &'a str,
    /// First question of the session, if there was one before this turn.
    pub initial_question: Option<&'a str>,
    pub initial_documents: &'a [Document],
}

impl<'a> EnrichmentInput<'a> {
    pub fn new(history: &'a str, input: &'a str) -> Self {
        Self {
            history,
            input,
            initial_question: None,
            initial_documents: &[],
        }
    }

    pub fn with_initial_context(
        mut self,
        question: Option<&'a str>,
        documents: &'a [Document],
    ) -> Self {
        self.initial_question = question;
        self.initial_documents = documents;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.input.trim().is_empty() {
            return Err(Error::InvalidInput("prompt is empty".into()));
        }
        Ok(())
    }
}

/// The prompt to generate from, and how it was produced.
#[derive(Debug, Clone)]
pub struct Enrichment {
    pub prompt: String,
    pub report: EnrichmentReport,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Local concatenation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Deterministic enrichment: history, the initial question, previews of
/// the initial documents, then the current question. No model call.
#[derive(Debug, Clone)]
pub struct LocalEnricher {
    pub preview_chars: usize,
}

impl LocalEnricher {
    pub fn new(preview_chars: usize) -> Self {
        Self { preview_chars }
    }

    pub fn enrich(&self, input: &EnrichmentInput<'_>) -> Result<Enrichment> {
        input.validate()?;

        let mut report = EnrichmentReport::new(EnrichmentStrategy::Local, input.input);
        let mut prompt = self.context_block(input, &mut report);
        prompt.push_str(&injection::format_question(input.input));

        report.output_chars = prompt.chars().count();
        Ok(Enrichment { prompt, report })
    }

    /// Everything before the question. Shared with the model-assisted
    /// strategy, which hands it to the model as context.
    pub(crate) fn context_block(
        &self,
        input: &EnrichmentInput<'_>,
        report: &mut EnrichmentReport,
    ) -> String {
        let mut out = String::from(input.history);

        if let Some(question) = input.initial_question.filter(|q| !q.is_empty()) {
            out.push_str(&injection::format_initial_question(question));
        }

        if !input.initial_documents.is_empty() {
            out.push_str(injection::INITIAL_DOCUMENTS_HEADER);
            for doc in input.initial_documents {
                let (preview, truncated) = truncation::preview(&doc.content, self.preview_chars);
                out.push_str(&injection::format_document_preview(&preview));
                report.documents_previewed += 1;
                if truncated {
                    report.previews_truncated += 1;
                }
            }
        }

        out
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Strategy selection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The configured enrichment strategy.
#[derive(Debug, Clone)]
pub enum Enricher {
    Local(LocalEnricher),
    ModelAssisted(ModelAssistedEnricher),
}

impl Enricher {
    pub fn from_config(cfg: &EnrichmentConfig) -> Self {
        match cfg.strategy {
            EnrichmentStrategy::Local => Self::Local(LocalEnricher::new(cfg.preview_chars)),
            EnrichmentStrategy::ModelAssisted => Self::ModelAssisted(ModelAssistedEnricher::new(
                cfg.preview_chars,
                cfg.rewrite_max_chars,
            )),
        }
    }

    pub fn strategy(&self) -> EnrichmentStrategy {
        match self {
            Self::Local(_) => EnrichmentStrategy::Local,
            Self::ModelAssisted(_) => EnrichmentStrategy::ModelAssisted,
        }
    }

    /// Run the strategy. `rewriter` is only used by the model-assisted
    /// strategy. Only input validation fails; every other problem falls
    /// back to the raw prompt. The report is emitted as a trace event.
    pub async fn enrich(
        &self,
        rewriter: &CompletionTarget,
        input: &EnrichmentInput<'_>,
    ) -> Result<Enrichment> {
        let enrichment = match self {
            Self::Local(local) => local.enrich(input)?,
            Self::ModelAssisted(assisted) => assisted.enrich(rewriter, input).await?,
        };
        enrichment.report.emit();
        Ok(enrichment)
    }
}
