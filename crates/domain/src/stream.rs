//! Streamed completion output, independent of the backend wire format.

use std::pin::Pin;

use serde::{Deserialize, Serialize};

pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// One item of a streamed completion. A well-formed stream ends with
/// exactly one `Done` or `Error`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Token { text: String },
    Done {
        usage: Option<Usage>,
        finish_reason: Option<String>,
    },
    /// The backend failed mid-stream; tokens seen so far are discarded.
    Error { message: String },
}

/// Token accounting reported by the backend, when it reports any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}
