//! Meta Llama 2 chat models.
//!
//! The templates carry the `[INST]`/`<<SYS>>` framing the models were tuned
//! on, and history is rendered inside that framing: the first human turn
//! continues the template's opening `[INST]`, later ones open their own.

use std::sync::Arc;

use pl_domain::error::Result;
use pl_domain::model::GenerationParams;
use pl_domain::turn::{Role, Turn};

use crate::adapter::{bind_target, native_parameters, ModelAdapter, NativeNames};
use crate::prompt::PromptTemplate;
use crate::target::CompletionTarget;
use crate::traits::{CompletionObserver, CompletionService};

pub(crate) const META_NAMES: NativeNames = NativeNames {
    temperature: "temperature",
    top_p: "top_p",
    max_tokens: "max_gen_len",
    max_temperature: 1.0,
};

const CONVERSATION: &str = "<s>[INST] <<SYS>>
You are a helpful assistant tasked with providing concise responses to user questions, using no more than three sentences per answer. Ensure you do not repeat information. You may use bullet points if necessary, but avoid using emojis.
<</SYS>>

{chat_history}<s>[INST] Context: {input} [/INST]";

const QA: &str = "<s>[INST] <<SYS>>
Utilize the provided conversation history and context to answer the following question. If the answer is unknown, simply state 'I don't know'\u{2014}do not attempt to conjecture. Ensure that you do not repeat information previously given. You may use bullet points if necessary, but avoid using emojis.
<</SYS>>

{chat_history}<s>[INST] Context: {context}

Question: {question} [/INST]";

const CONDENSE_QUESTION: &str = "<s>[INST] <<SYS>>
Based on the conversation provided, rephrase the follow-up question at the end to be a standalone question, maintaining the same linguistic style as the original input. Ensure that you do not repeat information. You may use bullet points if necessary, but avoid using emojis.
<</SYS>>

{chat_history}<s>[INST] Follow-up Question: {question} [/INST]";

pub struct Llama2ChatAdapter {
    model_id: String,
}

impl Llama2ChatAdapter {
    pub fn new(model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
        }
    }
}

impl ModelAdapter for Llama2ChatAdapter {
    fn family(&self) -> &'static str {
        "llama2-chat"
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
        let native = native_parameters(&self.model_id, params, &META_NAMES)?;
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

    fn format_history(&self, turns: &[Turn]) -> String {
        let mut out = String::new();
        let mut humans = 0;
        for turn in turns {
            match turn.role {
                Role::Human if humans == 0 => {
                    out.push_str(&format!("{} [/INST]", turn.content));
                    humans += 1;
                }
                Role::Human => {
                    out.push_str(&format!("<s>[INST] {} [/INST]", turn.content));
                    humans += 1;
                }
                Role::Assistant => out.push_str(&format!("{} </s>", turn.content)),
            }
        }
        out
    }
}
