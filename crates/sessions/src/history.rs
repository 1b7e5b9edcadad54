//! The history store contract and the metadata merge rule shared by every
//! backend.

use pl_domain::error::{Error, Result};
use pl_domain::turn::{Role, SessionKey, Turn};
use serde_json::Value;

/// Durable, append-only conversation history.
///
/// Implementations must be safe to share across concurrent turns of
/// different sessions; appends for one session are serialized by the
/// store.
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    /// All turns of a session in append order. Unknown sessions are empty.
    async fn get_messages(&self, key: &SessionKey) -> Result<Vec<Turn>>;

    /// Append a single turn.
    async fn append_turn(&self, key: &SessionKey, turn: Turn) -> Result<()>;

    /// Append a human turn and its assistant answer as one write: either
    /// both become visible or neither does.
    async fn append_exchange(&self, key: &SessionKey, human: Turn, assistant: Turn)
        -> Result<()>;

    /// Merge `metadata` (a JSON object) onto the latest assistant turn.
    ///
    /// New keys are added, keys already holding an equal value are left
    /// alone, and a key holding a different value fails the whole merge
    /// with [`Error::MetadataConflict`].
    async fn add_metadata(&self, key: &SessionKey, metadata: Value) -> Result<()>;
}

/// Apply a metadata patch to `target`, all-or-nothing. Returns the number
/// of keys added.
pub fn merge_metadata(target: &mut Option<Value>, patch: &Value) -> Result<usize> {
    let patch = patch
        .as_object()
        .ok_or_else(|| Error::Persistence("metadata patch must be a JSON object".into()))?;

    let current = target.get_or_insert_with(|| Value::Object(Default::default()));
    let current = current
        .as_object_mut()
        .ok_or_else(|| Error::Persistence("stored metadata is not a JSON object".into()))?;

    let mut added = Vec::new();
    for (k, v) in patch {
        match current.get(k) {
            Some(existing) if existing == v => {}
            Some(_) => return Err(Error::MetadataConflict { key: k.clone() }),
            None => added.push((k.clone(), v.clone())),
        }
    }

    let count = added.len();
    current.extend(added);
    Ok(count)
}

/// The turn `add_metadata` targets.
pub(crate) fn last_assistant_mut(turns: &mut [Turn]) -> Option<&mut Turn> {
    turns.iter_mut().rev().find(|t| t.role == Role::Assistant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_adds_new_keys() {
        let mut target = Some(json!({ "modelId": "m" }));
        let added = merge_metadata(&mut target, &json!({ "rating": 5 })).unwrap();
        assert_eq!(added, 1);
        assert_eq!(target.unwrap(), json!({ "modelId": "m", "rating": 5 }));
    }

    #[test]
    fn merge_equal_value_is_noop() {
        let mut target = Some(json!({ "modelId": "m" }));
        let added = merge_metadata(&mut target, &json!({ "modelId": "m" })).unwrap();
        assert_eq!(added, 0);
    }

    #[test]
    fn merge_conflict_leaves_target_untouched() {
        let mut target = Some(json!({ "modelId": "m" }));
        let err = merge_metadata(&mut target, &json!({ "extra": 1, "modelId": "other" }))
            .unwrap_err();
        assert!(matches!(err, Error::MetadataConflict { ref key } if key == "modelId"));
        assert_eq!(target.unwrap(), json!({ "modelId": "m" }));
    }

    #[test]
    fn merge_into_empty_creates_object() {
        let mut target = None;
        merge_metadata(&mut target, &json!({ "a": 1 })).unwrap();
        assert_eq!(target.unwrap(), json!({ "a": 1 }));
    }

    #[test]
    fn merge_rejects_non_object_patch() {
        let mut target = None;
        assert!(merge_metadata(&mut target, &json!([1, 2])).is_err());
    }
}
