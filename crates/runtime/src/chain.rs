//! The generation steps of a turn, parametrized by one model family.

use std::sync::Arc;

use pl_domain::error::Result;
use pl_domain::turn::{Document, Role, Turn};
use pl_providers::{CompletionTarget, ModelAdapter};

/// Separator between documents in the `{context}` slot.
pub const DOCUMENT_SEPARATOR: &str = "\n\n";

/// One model family bound to one turn's parameters and observer.
pub struct AdapterInstance {
    pub adapter: Arc<dyn ModelAdapter>,
    /// Answers; streams when the caller asked for it.
    pub llm: CompletionTarget,
    /// Question condensation, never streamed.
    pub condense_llm: CompletionTarget,
    /// Model-assisted enrichment, never streamed.
    pub rewrite_llm: CompletionTarget,
}

impl AdapterInstance {
    pub fn format_history(&self, turns: &[Turn]) -> String {
        self.adapter.format_history(turns)
    }

    /// Rewrite `question` into a standalone question given `history`.
    /// An empty model answer keeps the question as it was.
    pub async fn condense_question(&self, history: &str, question: &str) -> Result<String> {
        let prompt = self
            .adapter
            .condense_question_prompt()
            .format(&[("chat_history", history), ("question", question)])?;
        let standalone = self.condense_llm.invoke(&prompt).await?;
        let standalone = standalone.trim();
        if standalone.is_empty() {
            tracing::debug!("condense step returned nothing, keeping the question");
            return Ok(question.to_string());
        }
        Ok(standalone.to_string())
    }

    /// Answer `question` from `documents` with the family's QA template.
    pub async fn answer_from_documents(
        &self,
        history: &str,
        question: &str,
        documents: &[Document],
    ) -> Result<String> {
        let context = join_documents(documents);
        let prompt = self.adapter.qa_prompt().format(&[
            ("chat_history", history),
            ("context", context.as_str()),
            ("question", question),
        ])?;
        self.llm.invoke(&prompt).await
    }

    /// Plain conversational answer.
    pub async fn converse(&self, history: &str, input: &str) -> Result<String> {
        let prompt = self
            .adapter
            .conversation_prompt()
            .format(&[("chat_history", history), ("input", input)])?;
        self.llm.invoke(&prompt).await
    }
}

pub fn join_documents(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|d| d.content.as_str())
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR)
}

/// The session's first question and the documents of the first answer
/// that had any, read back from durable history.
pub fn initial_context(history: &[Turn]) -> (Option<&str>, Vec<Document>) {
    let question = history
        .iter()
        .find(|t| t.role == Role::Human)
        .map(|t| t.content.as_str());

    let documents = history
        .iter()
        .filter(|t| t.role == Role::Assistant)
        .filter_map(|t| t.metadata.as_ref()?.get("documents").cloned())
        .filter_map(|docs| serde_json::from_value::<Vec<Document>>(docs).ok())
        .find(|docs| !docs.is_empty())
        .unwrap_or_default();

    (question, documents)
}
