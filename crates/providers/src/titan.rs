//! Amazon Titan text models. Only the conversation template is
//! family-specific; QA and condensation use the generic ones.

use std::sync::Arc;

use pl_domain::error::Result;
use pl_domain::model::GenerationParams;

use crate::adapter::{bind_target, native_parameters, ModelAdapter, NativeNames};
use crate::prompt::PromptTemplate;
use crate::target::CompletionTarget;
use crate::templates;
use crate::traits::{CompletionObserver, CompletionService};

const NAMES: NativeNames = NativeNames {
    temperature: "temperature",
    top_p: "topP",
    max_tokens: "maxTokenCount",
    max_temperature: 1.0,
};

const CONVERSATION: &str = "
Human: Engage in a friendly conversation with an AI. The AI is designed to be talkative and \
provide extensive details from its knowledge base. If unsure about any question, the AI will \
honestly indicate its lack of knowledge.

Current conversation:
{chat_history}

Upcoming question:
{input}

Assistant:
";

const EMBEDDINGS_MODEL: &str = "amazon.titan-embed-text-v1";

pub struct TitanAdapter {
    model_id: String,
}

impl TitanAdapter {
    pub fn new(model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
        }
    }
}

impl ModelAdapter for TitanAdapter {
    fn family(&self) -> &'static str {
        "titan"
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
        let native = native_parameters(&self.model_id, params, &NAMES)?;
        bind_target(&self.model_id, service, native, params, observer)
    }

    fn embeddings_model(&self) -> Option<&str> {
        Some(EMBEDDINGS_MODEL)
    }

    fn conversation_prompt(&self) -> PromptTemplate {
        PromptTemplate::from_template(CONVERSATION)
    }

    fn qa_prompt(&self) -> PromptTemplate {
        templates::qa()
    }

    fn condense_question_prompt(&self) -> PromptTemplate {
        templates::condense_question()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::EchoService;
    use crate::traits::NoopObserver;

    #[test]
    fn uses_titan_parameter_names() {
        let params = GenerationParams {
            top_p: Some(0.25),
            max_tokens: Some(512),
            ..Default::default()
        };
        let target = TitanAdapter::new("amazon.titan-text-express-v1")
            .get_llm(Arc::new(EchoService::default()), &params, Arc::new(NoopObserver))
            .unwrap();
        assert_eq!(target.parameters()["topP"], 0.25);
        assert_eq!(target.parameters()["maxTokenCount"], 512);
        assert!(!target.is_streaming());
    }

    #[test]
    fn conversation_prompt_ends_with_assistant_cue() {
        let out = TitanAdapter::new("m")
            .conversation_prompt()
            .format(&[("chat_history", ""), ("input", "hi")])
            .unwrap();
        assert!(out.starts_with("\nHuman: Engage"));
        assert!(out.ends_with("Upcoming question:\nhi\n\nAssistant:\n"));
    }

    #[test]
    fn pairs_with_titan_embeddings() {
        assert_eq!(
            TitanAdapter::new("m").embeddings_model(),
            Some("amazon.titan-embed-text-v1")
        );
    }
}
