//! Text blocks the enricher assembles. Kept together so the exact
//! wording stays in one place.

/// `"\nInitial question: {question}\n"`
pub fn format_initial_question(question: &str) -> String {
    format!("\nInitial question: {question}\n")
}

pub const INITIAL_DOCUMENTS_HEADER: &str = "\nInitial source documents:\n";

/// One bullet of the initial-documents block; `preview` already carries
/// its ellipsis.
pub fn format_document_preview(preview: &str) -> String {
    format!("- {preview}\n")
}

/// `"\nQuestion: {input}"`
pub fn format_question(input: &str) -> String {
    format!("\nQuestion: {input}")
}

/// Instruction for the model-assisted strategy. `{context}` receives the
/// locally assembled context block (history and initial context, no
/// question); `{max_chars}` the output budget.
pub const REWRITE_TEMPLATE: &str = "You are preparing a question for a question-answering assistant. \
Do not answer the question. Only reformulate it so it can be understood without the conversation below, \
carrying over any names, dates or references it depends on. \
Reply with the reformulated question only, in fewer than {max_chars} characters.

Conversation and context:
{context}

Question: {question}

Reformulated question:";
