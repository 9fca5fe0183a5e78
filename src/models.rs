//! Core data models used throughout notedex.
//!
//! These types represent the notes, planned documents, and search results
//! that flow through the sync and retrieval pipeline.

use chrono::{DateTime, Utc};

use crate::error::SyncError;

/// A note discovered by scanning the configured roots, before its content
/// has been touched. Identity is the note's path string, stable across
/// repeated scans of the same roots.
#[derive(Debug, Clone)]
pub struct NoteDocument {
    /// Full path of the note, used as its identity in the index.
    pub identity: String,
    /// Path relative to its notes root, for display.
    pub rel_path: String,
    /// File name without extension.
    pub title: String,
    pub modified_at: DateTime<Utc>,
}

/// A note whose content fingerprint has been computed for the current pass.
#[derive(Debug, Clone)]
pub struct PlannedDocument {
    pub doc: NoteDocument,
    /// Hex SHA-256 of the note's content.
    pub fingerprint: String,
}

/// A note that failed fingerprinting or reading during a pass. Reported in
/// the pass result alongside (not instead of) the successful classifications.
#[derive(Debug)]
pub struct DocumentFailure {
    pub identity: String,
    pub error: SyncError,
}

/// Per-document result of an upsert batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub identity: String,
    /// True when an existing entry was replaced, false for a first insert.
    pub was_replaced: bool,
}

/// A chunk of note text produced by the chunker, not yet stored.
#[derive(Debug, Clone)]
pub struct NoteChunk {
    pub text: String,
    /// Hex SHA-256 of the chunk text, for staleness detection.
    pub hash: String,
}

/// A retrieval candidate: one stored chunk with its raw channel score.
#[derive(Debug, Clone)]
pub struct ChunkCandidate {
    pub chunk_id: String,
    pub identity: String,
    pub raw_score: f64,
    pub snippet: String,
}

/// A note excerpt handed to the LLM as grounding context.
#[derive(Debug, Clone)]
pub struct NoteExcerpt {
    pub title: String,
    pub identity: String,
    pub text: String,
}
