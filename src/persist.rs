//! Index persistence gateway.
//!
//! The index lives in memory during a pass and is flushed as one JSON
//! snapshot afterwards. Writes go to a temp file in the same directory
//! followed by a rename, so a crashed flush never leaves a torn snapshot
//! behind.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SyncError;
use crate::index::NoteIndex;

const SNAPSHOT_FILE: &str = "index.json";

fn snapshot_path(dir: &Path) -> PathBuf {
    dir.join(SNAPSHOT_FILE)
}

/// True when a snapshot exists at the persist location.
pub fn exists(dir: &Path) -> bool {
    snapshot_path(dir).is_file()
}

/// Flush the index to its persist directory.
///
/// On success the index is marked clean. On failure the in-memory index is
/// untouched (still dirty) so the caller can retry the save without
/// recomputing anything.
pub fn save(index: &mut NoteIndex, dir: &Path) -> Result<(), SyncError> {
    let target = snapshot_path(dir);
    let persist_err = |reason: String| SyncError::Persistence {
        path: target.clone(),
        reason,
    };

    fs::create_dir_all(dir).map_err(|e| persist_err(e.to_string()))?;

    let json = serde_json::to_string(&*index).map_err(|e| persist_err(e.to_string()))?;

    let tmp = dir.join(format!("{}.tmp", SNAPSHOT_FILE));
    fs::write(&tmp, json).map_err(|e| persist_err(e.to_string()))?;
    fs::rename(&tmp, &target).map_err(|e| persist_err(e.to_string()))?;

    index.mark_saved();
    Ok(())
}

/// Load the index snapshot from its persist directory.
pub fn load(dir: &Path) -> Result<NoteIndex, SyncError> {
    let target = snapshot_path(dir);
    let persist_err = |reason: String| SyncError::Persistence {
        path: target.clone(),
        reason,
    };

    let json = fs::read_to_string(&target).map_err(|e| persist_err(e.to_string()))?;
    serde_json::from_str(&json).map_err(|e| persist_err(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{PreparedChunk, PreparedDocument};
    use tempfile::TempDir;

    fn one_doc_index() -> NoteIndex {
        let mut index = NoteIndex::new();
        index.upsert_batch(vec![PreparedDocument {
            identity: "/n/a.md".to_string(),
            fingerprint: "fp1".to_string(),
            title: "a".to_string(),
            updated_at: 1_700_000_000,
            chunks: vec![PreparedChunk {
                text: "alpha".to_string(),
                hash: "h".to_string(),
                vector: None,
            }],
        }]);
        index
    }

    #[test]
    fn test_save_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("index");

        let mut index = one_doc_index();
        assert!(!exists(&dir));
        save(&mut index, &dir).unwrap();
        assert!(exists(&dir));
        assert!(!index.is_dirty());

        let restored = load(&dir).unwrap();
        assert_eq!(restored.doc_count(), 1);
        assert_eq!(
            restored.entry("/n/a.md").unwrap().fingerprint.as_deref(),
            Some("fp1")
        );
    }

    #[test]
    fn test_save_failure_keeps_index_dirty() {
        let tmp = TempDir::new().unwrap();
        // A file where the persist directory should be makes create_dir_all fail.
        let blocker = tmp.path().join("blocked");
        std::fs::write(&blocker, "not a directory").unwrap();

        let mut index = one_doc_index();
        let err = save(&mut index, &blocker).unwrap_err();
        match err {
            SyncError::Persistence { .. } => {}
            other => panic!("expected Persistence, got {:?}", other),
        }
        assert!(index.is_dirty());
    }

    #[test]
    fn test_load_missing_snapshot() {
        let tmp = TempDir::new().unwrap();
        let err = load(tmp.path()).unwrap_err();
        match err {
            SyncError::Persistence { path, .. } => {
                assert!(path.ends_with("index.json"));
            }
            other => panic!("expected Persistence, got {:?}", other),
        }
    }

    #[test]
    fn test_save_overwrites_previous_snapshot() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();

        let mut index = one_doc_index();
        save(&mut index, &dir).unwrap();

        index.upsert_batch(vec![PreparedDocument {
            identity: "/n/b.md".to_string(),
            fingerprint: "fp2".to_string(),
            title: "b".to_string(),
            updated_at: 1_700_000_001,
            chunks: Vec::new(),
        }]);
        save(&mut index, &dir).unwrap();

        let restored = load(&dir).unwrap();
        assert_eq!(restored.doc_count(), 2);
    }
}
