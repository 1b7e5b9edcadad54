//! Generic English templates used by families that do not ship their own.

use crate::prompt::PromptTemplate;

const CONVERSATION: &str = "The following is a friendly conversation between a human and an AI. \
If the AI does not know the answer to a question, it truthfully says it does not know.

Current conversation:
{chat_history}

Question: {input}";

const CONDENSE_QUESTION: &str = "Given the following conversation and a follow up question, \
rephrase the follow up question to be a standalone question, in its original language.

Chat History:
{chat_history}
Follow Up Input: {question}
Standalone question:";

const QA: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.

{context}

Question: {question}
Helpful Answer:";

pub fn conversation() -> PromptTemplate {
    PromptTemplate::from_template(CONVERSATION)
}

pub fn condense_question() -> PromptTemplate {
    PromptTemplate::from_template(CONDENSE_QUESTION)
}

pub fn qa() -> PromptTemplate {
    PromptTemplate::from_template(QA)
}
