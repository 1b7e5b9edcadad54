//! Append-only JSONL histories.
//!
//! Each session gets a `<user>/<session>.jsonl` file under the store
//! directory. Turns are appended as `{"kind":"turn",...}` lines; metadata
//! merges are appended as `{"kind":"metadata_patch",...}` lines and folded
//! onto the preceding assistant turn when the file is read back, so no
//! line is ever rewritten.
//!
//! Reads go through an in-memory write-through cache and all file I/O runs
//! on `spawn_blocking`.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use pl_domain::error::{Error, Result};
use pl_domain::trace::TraceEvent;
use pl_domain::turn::{SessionKey, Turn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::history::{last_assistant_mut, merge_metadata, HistoryStore};
use crate::session_key::transcript_path;

/// A single transcript line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum TranscriptLine {
    Turn(Turn),
    MetadataPatch {
        timestamp: DateTime<Utc>,
        metadata: Value,
    },
}

/// JSONL-backed [`HistoryStore`].
pub struct JsonlHistoryStore {
    store_dir: PathBuf,
    cache: RwLock<HashMap<SessionKey, Vec<Turn>>>,
    /// Serializes writers so a metadata conflict check and its append see
    /// the same history.
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonlHistoryStore {
    pub fn new(store_dir: &Path) -> Self {
        Self {
            store_dir: store_dir.to_path_buf(),
            cache: RwLock::new(HashMap::new()),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// Cached turns, loading the file on first access.
    async fn load(&self, key: &SessionKey) -> Result<Vec<Turn>> {
        if let Some(turns) = self.cache.read().get(key) {
            return Ok(turns.clone());
        }

        let path = transcript_path(&self.store_dir, key);
        let label = key.to_string();
        let turns = tokio::task::spawn_blocking(move || read_jsonl_file(&path, &label))
            .await
            .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))??;

        self.cache.write().insert(key.clone(), turns.clone());
        Ok(turns)
    }

    /// Append `lines` in one write. The cache is only updated once the
    /// bytes are on disk; a failed write leaves the file as it was.
    async fn write_lines(&self, key: &SessionKey, lines: Vec<TranscriptLine>) -> Result<()> {
        let buf = serialize_lines(&lines)?;
        let path = transcript_path(&self.store_dir, key);

        tokio::task::spawn_blocking(move || append_whole_lines(&path, buf.as_bytes()))
        .await
        .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))?
        .map_err(|e| Error::Persistence(format!("appending to transcript for {key}: {e}")))?;

        TraceEvent::TranscriptAppend {
            session_id: key.session_id.clone(),
            lines: lines.len(),
        }
        .emit();

        Ok(())
    }

    async fn append_turns(&self, key: &SessionKey, turns: Vec<Turn>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        // Warm the cache first so the extend below never lands on a
        // partial history.
        self.load(key).await?;

        let lines = turns.iter().cloned().map(TranscriptLine::Turn).collect();
        self.write_lines(key, lines).await?;

        self.cache
            .write()
            .entry(key.clone())
            .or_default()
            .extend(turns);
        Ok(())
    }
}

#[async_trait::async_trait]
impl HistoryStore for JsonlHistoryStore {
    async fn get_messages(&self, key: &SessionKey) -> Result<Vec<Turn>> {
        self.load(key).await
    }

    async fn append_turn(&self, key: &SessionKey, turn: Turn) -> Result<()> {
        self.append_turns(key, vec![turn]).await
    }

    async fn append_exchange(
        &self,
        key: &SessionKey,
        human: Turn,
        assistant: Turn,
    ) -> Result<()> {
        self.append_turns(key, vec![human, assistant]).await
    }

    async fn add_metadata(&self, key: &SessionKey, metadata: Value) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut turns = self.load(key).await?;

        let target = last_assistant_mut(&mut turns).ok_or_else(|| {
            Error::Persistence(format!("no assistant turn in {key} to attach metadata to"))
        })?;
        let added = merge_metadata(&mut target.metadata, &metadata)?;
        if added == 0 {
            return Ok(());
        }

        let line = TranscriptLine::MetadataPatch {
            timestamp: Utc::now(),
            metadata,
        };
        self.write_lines(key, vec![line]).await?;
        self.cache.write().insert(key.clone(), turns);

        TraceEvent::MetadataMerged {
            session_id: key.session_id.clone(),
            keys: added,
        }
        .emit();
        Ok(())
    }
}

/// Serialize transcript lines to a JSONL string.
fn serialize_lines(lines: &[TranscriptLine]) -> Result<String> {
    let mut buf = String::new();
    for line in lines {
        let json = serde_json::to_string(line)?;
        buf.push_str(&json);
        buf.push('\n');
    }
    Ok(buf)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// File I/O
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Append `buf` (complete lines) so that the file only ever grows by
/// whole lines: a torn tail left by an earlier failed write is cut first,
/// and a write that fails part way is truncated back.
fn append_whole_lines(path: &Path, buf: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?;

    let len = cut_torn_tail(&mut file)?;
    if let Err(e) = file.write_all(buf).and_then(|()| file.flush()) {
        if let Err(undo) = file.set_len(len) {
            tracing::error!(path = %path.display(), error = %undo, "could not roll back partial append");
        }
        return Err(e);
    }
    Ok(())
}

/// Truncate everything after the last `\n`. Returns the resulting length.
fn cut_torn_tail(file: &mut File) -> std::io::Result<u64> {
    const CHUNK: u64 = 4096;

    let len = file.metadata()?.len();
    let mut end = len;
    let mut chunk = vec![0u8; CHUNK as usize];
    while end > 0 {
        let start = end.saturating_sub(CHUNK);
        let window = &mut chunk[..(end - start) as usize];
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(window)?;
        if let Some(pos) = window.iter().rposition(|&b| b == b'\n') {
            end = start + pos as u64 + 1;
            break;
        }
        end = start;
    }

    if end < len {
        tracing::warn!(dropped_bytes = len - end, "cutting torn transcript tail");
        file.set_len(end)?;
    }
    Ok(end)
}

/// Read a JSONL transcript and fold metadata patches onto their turns.
fn read_jsonl_file(path: &Path, session: &str) -> Result<Vec<Turn>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::Persistence(format!("reading transcript for {session}: {e}")))?;
    let mut turns: Vec<Turn> = Vec::new();
    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<TranscriptLine>(line) {
            Ok(TranscriptLine::Turn(turn)) => turns.push(turn),
            Ok(TranscriptLine::MetadataPatch { metadata, .. }) => {
                let applied = last_assistant_mut(&mut turns)
                    .map(|t| merge_metadata(&mut t.metadata, &metadata));
                match applied {
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(session = session, error = %e, "skipping metadata patch");
                    }
                    None => {
                        tracing::warn!(session = session, "metadata patch before any assistant turn");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    session = session,
                    error = %e,
                    "skipping malformed transcript line"
                );
            }
        }
    }
    Ok(turns)
}
