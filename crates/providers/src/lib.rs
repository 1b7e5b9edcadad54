//! Model adapters, prompt templates, and the completion services they
//! dispatch to.

pub mod adapter;
pub mod catalog;
pub mod claude;
pub mod llama2;
pub mod llama3;
pub mod openai_compat;
pub mod prompt;
pub mod registry;
pub mod target;
pub mod templates;
pub mod titan;
pub mod traits;
pub(crate) mod sse;
pub(crate) mod util;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience.
pub use adapter::ModelAdapter;
pub use openai_compat::OpenAiCompatService;
pub use prompt::PromptTemplate;
pub use registry::{AdapterFactory, ModelRegistry};
pub use target::CompletionTarget;
pub use traits::{
    CompletionObserver, CompletionRequest, CompletionResponse, CompletionService, NoopObserver,
};
pub use util::resolve_api_key;
