//! Mapping `(session_id, user_id)` onto transcript file paths.
//!
//! Layout: `<store_dir>/<user>/<session>.jsonl`. Both ids are caller
//! supplied, so each becomes a single path segment with every byte outside
//! `[A-Za-z0-9_-]` (and any `.`) percent-encoded. Distinct ids always map to
//! distinct files and nothing can escape the store directory.

use std::path::{Path, PathBuf};

use pl_domain::turn::SessionKey;

pub fn transcript_path(store_dir: &Path, key: &SessionKey) -> PathBuf {
    store_dir
        .join(path_segment(&key.user_id))
        .join(format!("{}.jsonl", path_segment(&key.session_id)))
}

fn path_segment(raw: &str) -> String {
    if raw.is_empty() {
        return "%".into();
    }
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ids_pass_through() {
        let p = transcript_path(Path::new("/data"), &SessionKey::new("s1", "u1"));
        assert_eq!(p, PathBuf::from("/data/u1/s1.jsonl"));
    }

    #[test]
    fn traversal_is_neutralized() {
        let p = transcript_path(Path::new("/data"), &SessionKey::new("../../etc/passwd", "u1"));
        assert_eq!(p.parent().unwrap(), Path::new("/data/u1"));
        assert!(!p.to_string_lossy().contains(".."));
    }

    #[test]
    fn distinct_ids_stay_distinct() {
        let a = transcript_path(Path::new("/d"), &SessionKey::new("a/b", "u"));
        let b = transcript_path(Path::new("/d"), &SessionKey::new("a_b", "u"));
        assert_ne!(a, b);
    }

    #[test]
    fn empty_id_gets_a_name() {
        let p = transcript_path(Path::new("/d"), &SessionKey::new("", ""));
        assert_eq!(p, PathBuf::from("/d/%/%.jsonl"));
    }
}
