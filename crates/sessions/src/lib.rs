//! Conversation history for Parley.
//!
//! Histories are keyed by `(session_id, user_id)` and are append-only:
//! turns are never rewritten, and metadata is only ever merged onto the
//! latest assistant turn. Two backends ship: JSONL files on disk and a
//! process-local map.

pub mod history;
pub mod memory;
pub mod session_key;
pub mod transcript;

pub use history::{merge_metadata, HistoryStore};
pub use memory::MemoryHistoryStore;
pub use session_key::transcript_path;
pub use transcript::JsonlHistoryStore;
