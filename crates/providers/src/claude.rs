//! Anthropic Claude models.

use std::sync::Arc;

use pl_domain::error::Result;
use pl_domain::model::GenerationParams;
use serde_json::Value;

use crate::adapter::{bind_target, native_parameters, ModelAdapter, NativeNames};
use crate::prompt::PromptTemplate;
use crate::target::CompletionTarget;
use crate::traits::{CompletionObserver, CompletionService};

pub const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

const NAMES: NativeNames = NativeNames {
    temperature: "temperature",
    top_p: "top_p",
    max_tokens: "max_tokens",
    max_temperature: 1.0,
};

const CONVERSATION: &str = "This is a friendly conversation between a human and an AI. \
If the AI is unsure about an answer, it will honestly state that it does not know.

Current conversation:
{chat_history}

Question:
{input}";

const QA: &str = "Please utilize the context provided below to answer the subsequent question. \
If the answer is unknown to you, simply state 'I don't know' rather than attempting to fabricate a response.

Context provided:
{context}

Question to answer:
{question}
";

const CONDENSE_QUESTION: &str = "<conv>
{chat_history}
</conv>

<followup>
{question}
</followup>

Considering the dialogue provided within the <conv></conv> tags, please reformulate the \
follow-up question located in the <followup></followup> tags into a clear, standalone question. \
Ensure the language style of the follow-up question is retained.
";

pub struct ClaudeAdapter {
    model_id: String,
}

impl ClaudeAdapter {
    pub fn new(model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
        }
    }
}

impl ModelAdapter for ClaudeAdapter {
    fn family(&self) -> &'static str {
        "claude"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn get_llm(
        &self,
        service: Arc<dyn CompletionService>,
        params: &GenerationParams,
        observer: Arc<dyn CompletionObserver>,
    ) -> Result<CompletionTarget> {
        let mut native = native_parameters(&self.model_id, params, &NAMES)?;
        native.insert(
            "anthropic_version".into(),
            Value::String(ANTHROPIC_VERSION.into()),
        );
        bind_target(&self.model_id, service, native, params, observer)
    }

    fn embeddings_model(&self) -> Option<&str> {
        None
    }

    fn conversation_prompt(&self) -> PromptTemplate {
        PromptTemplate::from_template(CONVERSATION)
    }

    fn qa_prompt(&self) -> PromptTemplate {
        PromptTemplate::from_template(QA)
    }

    fn condense_question_prompt(&self) -> PromptTemplate {
        PromptTemplate::from_template(CONDENSE_QUESTION)
    }
}
