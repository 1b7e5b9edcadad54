use std::collections::HashMap;

use parking_lot::RwLock;
use pl_domain::error::{Error, Result};
use pl_domain::turn::{SessionKey, Turn};
use serde_json::Value;

use crate::history::{last_assistant_mut, merge_metadata, HistoryStore};

/// Process-local [`HistoryStore`]. Histories vanish with the process.
#[derive(Default)]
pub struct MemoryHistoryStore {
    sessions: RwLock<HashMap<SessionKey, Vec<Turn>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions with at least one turn.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn get_messages(&self, key: &SessionKey) -> Result<Vec<Turn>> {
        Ok(self.sessions.read().get(key).cloned().unwrap_or_default())
    }

    async fn append_turn(&self, key: &SessionKey, turn: Turn) -> Result<()> {
        self.sessions.write().entry(key.clone()).or_default().push(turn);
        Ok(())
    }

    async fn append_exchange(
        &self,
        key: &SessionKey,
        human: Turn,
        assistant: Turn,
    ) -> Result<()> {
        self.sessions
            .write()
            .entry(key.clone())
            .or_default()
            .extend([human, assistant]);
        Ok(())
    }

    async fn add_metadata(&self, key: &SessionKey, metadata: Value) -> Result<()> {
        let mut sessions = self.sessions.write();
        let turns = sessions.get_mut(key).map(Vec::as_mut_slice).unwrap_or_default();
        let target = last_assistant_mut(turns).ok_or_else(|| {
            Error::Persistence(format!("no assistant turn in {key} to attach metadata to"))
        })?;
        merge_metadata(&mut target.metadata, &metadata)?;
        Ok(())
    }
}
