//! Meta Llama 3 instruct models, framed with header ids and `<|eot_id|>`.

use std::sync::Arc;

use pl_domain::error::Result;
use pl_domain::model::GenerationParams;
use pl_domain::turn::{Role, Turn};

use crate::adapter::{bind_target, native_parameters, ModelAdapter};
use crate::llama2::META_NAMES;
use crate::prompt::PromptTemplate;
use crate::target::CompletionTarget;
use crate::traits::{CompletionObserver, CompletionService};

// Control tokens as literal-producing macros so `concat!` can splice
// them into the templates.
macro_rules! begin_of_text { () => { "<|begin_of_text|>" }; }
macro_rules! system_header { () => { "<|start_header_id|>system<|end_header_id|>" }; }
macro_rules! user_header { () => { "<|start_header_id|>user<|end_header_id|>" }; }
macro_rules! assistant_header { () => { "<|start_header_id|>assistant<|end_header_id|>" }; }
macro_rules! eot { () => { "<|eot_id|>" }; }

const USER_HEADER: &str = user_header!();
const ASSISTANT_HEADER: &str = assistant_header!();
const EOT: &str = eot!();

const CONVERSATION: &str = concat!(
    begin_of_text!(),
    system_header!(),
    "\nYou are a helpful assistant that provides concise answers to user questions using as few sentences as possible, up to a maximum of 3 sentences. You do not repeat yourself. You may use bullet points if necessary, but avoid emojis.",
    eot!(),
    "{chat_history}",
    user_header!(),
    "\n{input}",
    eot!(),
    assistant_header!(),
);

const QA: &str = concat!(
    begin_of_text!(),
    system_header!(),
    "\nUse the following conversation history and pieces of context to answer the question at the end. If you don't know the answer, just say that you don't know, do not attempt to conjecture. You do not repeat yourself. You may use bullet points if necessary, but avoid emojis.",
    eot!(),
    "{chat_history}",
    user_header!(),
    "\nContext: {context}\n{question}",
    eot!(),
    assistant_header!(),
);

const CONDENSE_QUESTION: &str = concat!(
    begin_of_text!(),
    system_header!(),
    "\nGiven the following conversation and the question at the end, rephrase the follow-up input to be a standalone question, in the same language as the follow-up input. You do not repeat yourself. You may use bullet points if necessary, but avoid emojis.",
    eot!(),
    "{chat_history}",
    user_header!(),
    "\n{question}",
    eot!(),
    assistant_header!(),
);

pub struct Llama3InstructAdapter {
    model_id: String,
}

impl Llama3InstructAdapter {
    pub fn new(model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
        }
    }
}

impl ModelAdapter for Llama3InstructAdapter {
    fn family(&self) -> &'static str {
        "llama3-instruct"
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
        turns
            .iter()
            .map(|t| {
                let header = match t.role {
                    Role::Human => USER_HEADER,
                    Role::Assistant => ASSISTANT_HEADER,
                };
                format!("{header}\n\n{}{EOT}", t.content)
            })
            .collect()
    }
}
