//! Model-assisted enrichment: one auxiliary completion call rewrites the
//! question into a standalone form. The call never fails the turn; any
//! error or an empty answer falls back to the raw prompt.

use pl_domain::config::EnrichmentStrategy;
use pl_domain::error::Result;
use pl_providers::{CompletionTarget, PromptTemplate};

use crate::builder::{Enrichment, EnrichmentInput, LocalEnricher};
use crate::injection::REWRITE_TEMPLATE;
use crate::report::EnrichmentReport;
use crate::truncation;

#[derive(Debug, Clone)]
pub struct ModelAssistedEnricher {
    context: LocalEnricher,
    max_chars: usize,
}

impl ModelAssistedEnricher {
    pub fn new(preview_chars: usize, max_chars: usize) -> Self {
        Self {
            context: LocalEnricher::new(preview_chars),
            max_chars,
        }
    }

    /// The exact prompt sent to the rewriting model.
    pub fn rewrite_prompt(&self, input: &EnrichmentInput<'_>) -> Result<(String, EnrichmentReport)> {
        let mut report = EnrichmentReport::new(EnrichmentStrategy::ModelAssisted, input.input);
        let context = self.context.context_block(input, &mut report);
        let max_chars = self.max_chars.to_string();
        let prompt = PromptTemplate::from_template(REWRITE_TEMPLATE).format(&[
            ("max_chars", max_chars.as_str()),
            ("context", context.as_str()),
            ("question", input.input),
        ])?;
        Ok((prompt, report))
    }

    pub async fn enrich(
        &self,
        target: &CompletionTarget,
        input: &EnrichmentInput<'_>,
    ) -> Result<Enrichment> {
        input.validate()?;
        let (prompt, mut report) = self.rewrite_prompt(input)?;

        let rewritten = match target.invoke(&prompt).await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => {
                tracing::warn!(model = %target.model_id(), "rewrite returned empty text, using raw prompt");
                None
            }
            Err(e) => {
                tracing::warn!(model = %target.model_id(), error = %e, "rewrite failed, using raw prompt");
                None
            }
        };

        let prompt = match rewritten {
            Some(text) => {
                let (capped, was_capped) = truncation::cap_output(text.trim(), self.max_chars);
                if was_capped {
                    tracing::debug!(max_chars = self.max_chars, "rewrite exceeded budget, truncated");
                }
                report.output_capped = was_capped;
                capped
            }
            None => {
                report.fallback = true;
                input.input.to_string()
            }
        };

        report.output_chars = prompt.chars().count();
        Ok(Enrichment { prompt, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pl_domain::error::Error;
    use pl_domain::stream::{BoxStream, StreamEvent};
    use pl_domain::turn::Document;
    use pl_providers::{
        CompletionRequest, CompletionResponse, CompletionService, NoopObserver,
    };
    use serde_json::Map;
    use std::sync::Arc;

    /// Replies with a fixed text, or fails.
    struct Fixed(std::result::Result<String, ()>);

    #[async_trait::async_trait]
    impl CompletionService for Fixed {
        async fn invoke(&self, req: &CompletionRequest) -> Result<CompletionResponse> {
            match &self.0 {
                Ok(text) => Ok(CompletionResponse {
                    text: text.clone(),
                    usage: None,
                    model: req.model_id.clone(),
                    finish_reason: None,
                }),
                Err(()) => Err(Error::ModelInvocation {
                    service: "fixed".into(),
                    message: "throttled".into(),
                }),
            }
        }

        async fn invoke_stream(
            &self,
            _req: &CompletionRequest,
        ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
            Err(Error::Other("not streaming".into()))
        }

        fn service_id(&self) -> &str {
            "fixed"
        }
    }

    fn target(reply: std::result::Result<String, ()>) -> CompletionTarget {
        CompletionTarget::new(Arc::new(Fixed(reply)), "m", Map::new(), false, Arc::new(NoopObserver))
    }

    #[test]
    fn prompt_carries_instruction_and_context() {
        let docs = vec![Document::new("Deadline is March 1.")];
        let input = EnrichmentInput::new("Human: hi\nAI: hello", "And the fee?")
            .with_initial_context(Some("When is the deadline?"), &docs);
        let (prompt, report) = ModelAssistedEnricher::new(200, 1000)
            .rewrite_prompt(&input)
            .unwrap();
        assert!(prompt.contains("Do not answer the question."));
        assert!(prompt.contains("fewer than 1000 characters"));
        assert!(prompt.contains("Initial question: When is the deadline?"));
        assert!(prompt.contains("- Deadline is March 1...."));
        assert!(prompt.ends_with("Question: And the fee?\n\nReformulated question:"));
        assert_eq!(report.documents_previewed, 1);
    }

    #[tokio::test]
    async fn uses_trimmed_rewrite() {
        let out = ModelAssistedEnricher::new(200, 1000)
            .enrich(
                &target(Ok("  What is the late filing fee?  ".into())),
                &EnrichmentInput::new("", "And the fee?"),
            )
            .await
            .unwrap();
        assert_eq!(out.prompt, "What is the late filing fee?");
        assert!(!out.report.fallback);
    }

    #[tokio::test]
    async fn caps_long_rewrites() {
        let out = ModelAssistedEnricher::new(200, 1000)
            .enrich(&target(Ok("z".repeat(1500))), &EnrichmentInput::new("", "q"))
            .await
            .unwrap();
        assert_eq!(out.prompt.chars().count(), 1000);
        assert!(out.report.output_capped);
    }

    #[tokio::test]
    async fn invocation_error_falls_back_to_raw_prompt() {
        let out = ModelAssistedEnricher::new(200, 1000)
            .enrich(&target(Err(())), &EnrichmentInput::new("h", "And the fee?"))
            .await
            .unwrap();
        assert_eq!(out.prompt, "And the fee?");
        assert!(out.report.fallback);
    }

    #[tokio::test]
    async fn empty_rewrite_falls_back_to_raw_prompt() {
        let out = ModelAssistedEnricher::new(200, 1000)
            .enrich(&target(Ok("   ".into())), &EnrichmentInput::new("", "q"))
            .await
            .unwrap();
        assert_eq!(out.prompt, "q");
        assert!(out.report.fallback);
    }

    #[tokio::test]
    async fn blank_input_fails_before_calling_the_model() {
        let err = ModelAssistedEnricher::new(200, 1000)
            .enrich(&target(Ok("x".into())), &EnrichmentInput::new("", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
