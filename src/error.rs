//! Error taxonomy for the synchronization engine.
//!
//! These variants are deliberately coarse: callers need to tell apart
//! "one note could not be read" (pass continues), "a whole notes root is
//! gone" (pass aborts), and "the index mutated but could not be flushed"
//! (retry the save, don't recompute). Everything else goes through
//! `anyhow` at the CLI boundary.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the sync engine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A single note's content could not be fully read. Collected per
    /// document; never aborts the pass on its own.
    #[error("cannot read note {path}: {source}")]
    UnreadableSource {
        /// Identity (absolute path) of the unreadable note.
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// An entire notes root could not be scanned. Fatal to the pass —
    /// no partial change set is acted upon.
    #[error("notes root unavailable: {root}: {reason}")]
    SourceUnavailable { root: PathBuf, reason: String },

    /// The index snapshot could not be written (or read back) from its
    /// persist location.
    #[error("index persistence failed at {path}: {reason}")]
    Persistence { path: PathBuf, reason: String },
}

impl Clone for SyncError {
    fn clone(&self) -> Self {
        match self {
            SyncError::UnreadableSource { path, source } => SyncError::UnreadableSource {
                path: path.clone(),
                // io::Error is not Clone; rebuild from kind + message.
                source: std::io::Error::new(source.kind(), source.to_string()),
            },
            SyncError::SourceUnavailable { root, reason } => SyncError::SourceUnavailable {
                root: root.clone(),
                reason: reason.clone(),
            },
            SyncError::Persistence { path, reason } => SyncError::Persistence {
                path: path.clone(),
                reason: reason.clone(),
            },
        }
    }
}

impl SyncError {
    pub fn unreadable(path: impl Into<String>, source: std::io::Error) -> Self {
        SyncError::UnreadableSource {
            path: path.into(),
            source,
        }
    }
}
