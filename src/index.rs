//! In-memory note index.
//!
//! Holds one entry per note identity (with its recorded fingerprint) plus
//! the note's chunks and optional embedding vectors. The whole structure
//! serializes as a single snapshot; durability is the persistence
//! gateway's job, invoked only after a successful mutation batch.
//!
//! Retrieval is brute-force: keyword scoring by term containment, vector
//! scoring by cosine similarity over all stored vectors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ChunkCandidate, UpsertOutcome};

/// Snippet length for search candidates.
const SNIPPET_CHARS: usize = 240;

/// Index metadata for one note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub doc_id: String,
    /// Fingerprint recorded at the last successful upsert. `None` only for
    /// entries written before fingerprints were recorded.
    #[serde(default)]
    pub fingerprint: Option<String>,
    pub title: String,
    pub updated_at: i64,
}

/// One stored chunk of a note, with its optional embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    pub id: String,
    pub identity: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
    #[serde(default)]
    pub vector: Option<Vec<f32>>,
}

/// A chunk prepared for insertion (embedded or pending).
#[derive(Debug, Clone)]
pub struct PreparedChunk {
    pub text: String,
    pub hash: String,
    pub vector: Option<Vec<f32>>,
}

/// A fully prepared note ready for upsert.
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    pub identity: String,
    pub fingerprint: String,
    pub title: String,
    pub updated_at: i64,
    pub chunks: Vec<PreparedChunk>,
}

/// The in-memory index over all synced notes.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NoteIndex {
    /// Identity → entry. BTreeMap keeps metadata iteration and the
    /// serialized snapshot deterministic.
    entries: BTreeMap<String, IndexEntry>,
    chunks: Vec<StoredChunk>,
    #[serde(default)]
    last_synced_at: Option<i64>,
    /// Number of live notes seen by the last scan. Can diverge from
    /// `entries.len()` when notes were deleted on disk.
    #[serde(default)]
    last_scan_count: Option<usize>,
    /// True when mutations have been applied but not yet flushed.
    #[serde(skip)]
    dirty: bool,
}

impl NoteIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn doc_count(&self) -> usize {
        self.entries.len()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn embedded_count(&self) -> usize {
        self.chunks.iter().filter(|c| c.vector.is_some()).count()
    }

    pub fn last_synced_at(&self) -> Option<i64> {
        self.last_synced_at
    }

    pub fn last_scan_count(&self) -> Option<usize> {
        self.last_scan_count
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Called by the persistence gateway after a successful flush.
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    /// (identity, recorded fingerprint) pairs for catalog construction.
    pub fn metadata(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(identity, entry)| (identity.as_str(), entry.fingerprint.as_deref()))
    }

    pub fn entry(&self, identity: &str) -> Option<&IndexEntry> {
        self.entries.get(identity)
    }

    /// Insert-or-replace a batch of prepared notes.
    ///
    /// Per identity the swap is all-or-nothing: the old chunks are dropped
    /// and the new entry, chunks, and fingerprint land together. Returns
    /// one outcome per input document, in input order.
    pub fn upsert_batch(&mut self, batch: Vec<PreparedDocument>) -> Vec<UpsertOutcome> {
        let mut outcomes = Vec::with_capacity(batch.len());

        for doc in batch {
            let was_replaced = self.entries.contains_key(&doc.identity);
            if was_replaced {
                self.chunks.retain(|c| c.identity != doc.identity);
            }

            let doc_id = Uuid::new_v4().to_string();
            for (i, chunk) in doc.chunks.into_iter().enumerate() {
                self.chunks.push(StoredChunk {
                    id: Uuid::new_v4().to_string(),
                    identity: doc.identity.clone(),
                    chunk_index: i as i64,
                    text: chunk.text,
                    hash: chunk.hash,
                    vector: chunk.vector,
                });
            }

            self.entries.insert(
                doc.identity.clone(),
                IndexEntry {
                    doc_id,
                    fingerprint: Some(doc.fingerprint),
                    title: doc.title,
                    updated_at: doc.updated_at,
                },
            );

            self.dirty = true;
            outcomes.push(UpsertOutcome {
                identity: doc.identity,
                was_replaced,
            });
        }

        outcomes
    }

    pub fn touch_synced(&mut self, ts: i64, scanned: usize) {
        self.last_synced_at = Some(ts);
        self.last_scan_count = Some(scanned);
        self.dirty = true;
    }

    /// Keyword candidates: chunks containing query terms, scored by the
    /// number of distinct terms matched.
    pub fn keyword_candidates(&self, query: &str, limit: usize) -> Vec<ChunkCandidate> {
        let query_lower = query.to_lowercase();
        let terms: Vec<&str> = query_lower.split_whitespace().collect();
        if terms.is_empty() {
            return Vec::new();
        }

        let mut candidates: Vec<ChunkCandidate> = self
            .chunks
            .iter()
            .filter_map(|chunk| {
                let text_lower = chunk.text.to_lowercase();
                let matches = terms.iter().filter(|t| text_lower.contains(*t)).count();
                if matches > 0 {
                    Some(ChunkCandidate {
                        chunk_id: chunk.id.clone(),
                        identity: chunk.identity.clone(),
                        raw_score: matches as f64,
                        snippet: snippet_of(&chunk.text),
                    })
                } else {
                    None
                }
            })
            .collect();

        sort_and_truncate(&mut candidates, limit);
        candidates
    }

    /// Vector candidates: cosine similarity of the query vector against
    /// every embedded chunk.
    pub fn vector_candidates(&self, query_vec: &[f32], limit: usize) -> Vec<ChunkCandidate> {
        let mut candidates: Vec<ChunkCandidate> = self
            .chunks
            .iter()
            .filter_map(|chunk| {
                let vector = chunk.vector.as_ref()?;
                Some(ChunkCandidate {
                    chunk_id: chunk.id.clone(),
                    identity: chunk.identity.clone(),
                    raw_score: cosine_similarity(query_vec, vector) as f64,
                    snippet: snippet_of(&chunk.text),
                })
            })
            .collect();

        sort_and_truncate(&mut candidates, limit);
        candidates
    }

    pub fn chunk_text(&self, chunk_id: &str) -> Option<&str> {
        self.chunks
            .iter()
            .find(|c| c.id == chunk_id)
            .map(|c| c.text.as_str())
    }
}

fn snippet_of(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect()
}

fn sort_and_truncate(candidates: &mut Vec<ChunkCandidate>, limit: usize) {
    candidates.sort_by(|a, b| {
        b.raw_score
            .partial_cmp(&a.raw_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.chunk_id.cmp(&b.chunk_id))
    });
    candidates.truncate(limit);
}

/// Cosine similarity between two embedding vectors. Returns `0.0` for
/// empty or mismatched-length vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}
