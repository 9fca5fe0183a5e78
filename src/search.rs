//! Search over the persisted index.
//!
//! Three modes: `keyword` (term containment), `semantic` (cosine over
//! embedded chunks), and `hybrid` (alpha-weighted merge of the two after
//! min-max normalization). Chunk scores are grouped per note with max
//! aggregation, and results are sorted deterministically.

use std::collections::HashMap;

use anyhow::{bail, Result};

use crate::config::Config;
use crate::embedding;
use crate::index::NoteIndex;
use crate::models::ChunkCandidate;
use crate::persist;

/// One ranked note in a search result.
#[derive(Debug)]
pub struct NoteResult {
    pub identity: String,
    pub title: String,
    pub score: f64,
    pub snippet: String,
}

/// Rank notes for a query. `alpha` weights the vector channel: 0.0 is
/// pure keyword, 1.0 pure semantic.
pub fn rank(
    keyword: &[ChunkCandidate],
    vector: &[ChunkCandidate],
    alpha: f64,
    index: &NoteIndex,
    limit: usize,
) -> Vec<NoteResult> {
    let kw_norm = normalize_scores(keyword);
    let vec_norm = normalize_scores(vector);

    let kw_map: HashMap<&str, f64> = kw_norm
        .iter()
        .map(|(c, s)| (c.chunk_id.as_str(), *s))
        .collect();
    let vec_map: HashMap<&str, f64> = vec_norm
        .iter()
        .map(|(c, s)| (c.chunk_id.as_str(), *s))
        .collect();

    let mut all_chunks: HashMap<&str, &ChunkCandidate> = HashMap::new();
    for c in keyword.iter().chain(vector.iter()) {
        all_chunks.entry(c.chunk_id.as_str()).or_insert(c);
    }

    // Max aggregation per note.
    struct NoteBest<'a> {
        score: f64,
        candidate: &'a ChunkCandidate,
    }
    let mut per_note: HashMap<&str, NoteBest> = HashMap::new();

    for (chunk_id, candidate) in &all_chunks {
        let k = kw_map.get(chunk_id).copied().unwrap_or(0.0);
        let v = vec_map.get(chunk_id).copied().unwrap_or(0.0);
        let score = (1.0 - alpha) * k + alpha * v;

        let entry = per_note
            .entry(candidate.identity.as_str())
            .or_insert(NoteBest { score, candidate });
        if score > entry.score {
            entry.score = score;
            entry.candidate = candidate;
        }
    }

    let mut results: Vec<NoteResult> = per_note
        .into_iter()
        .map(|(identity, best)| NoteResult {
            identity: identity.to_string(),
            title: index
                .entry(identity)
                .map(|e| e.title.clone())
                .unwrap_or_else(|| identity.to_string()),
            score: best.score,
            snippet: best.candidate.snippet.clone(),
        })
        .collect();

    // Score desc, then identity asc so ties break the same way every run.
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.identity.cmp(&b.identity))
    });
    results.truncate(limit);
    results
}

/// Min-max normalize raw channel scores into [0, 1]. A single-candidate
/// (or constant-score) channel normalizes to 1.0.
fn normalize_scores(candidates: &[ChunkCandidate]) -> Vec<(&ChunkCandidate, f64)> {
    if candidates.is_empty() {
        return Vec::new();
    }
    let min = candidates
        .iter()
        .map(|c| c.raw_score)
        .fold(f64::INFINITY, f64::min);
    let max = candidates
        .iter()
        .map(|c| c.raw_score)
        .fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    candidates
        .iter()
        .map(|c| {
            let s = if range < f64::EPSILON {
                1.0
            } else {
                (c.raw_score - min) / range
            };
            (c, s)
        })
        .collect()
}

/// CLI entry point for `ndx search`.
pub async fn run_search(
    config: &Config,
    query: &str,
    mode: &str,
    limit: Option<usize>,
) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    match mode {
        "keyword" | "semantic" | "hybrid" => {}
        _ => bail!(
            "Unknown search mode: {}. Use keyword, semantic, or hybrid.",
            mode
        ),
    }

    if (mode == "semantic" || mode == "hybrid") && !config.embedding.is_enabled() {
        bail!(
            "Mode '{}' requires embeddings. Set [embedding] provider in config.",
            mode
        );
    }

    if !persist::exists(&config.index.persist_dir) {
        bail!(
            "No index found at {}. Run `ndx sync` first.",
            config.index.persist_dir.display()
        );
    }
    let index = persist::load(&config.index.persist_dir)?;

    let k = config.retrieval.candidate_k;
    let keyword = if mode == "keyword" || mode == "hybrid" {
        index.keyword_candidates(query, k)
    } else {
        Vec::new()
    };
    let vector = if mode == "semantic" || mode == "hybrid" {
        let query_vec = embedding::embed_query(&config.embedding, query).await?;
        index.vector_candidates(&query_vec, k)
    } else {
        Vec::new()
    };

    let alpha = match mode {
        "keyword" => 0.0,
        "semantic" => 1.0,
        _ => config.retrieval.hybrid_alpha,
    };

    let final_limit = limit.unwrap_or(config.retrieval.final_limit);
    let results = rank(&keyword, &vector, alpha, &index, final_limit);

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, r) in results.iter().enumerate() {
        println!("{}. {} (score {:.3})", i + 1, r.title, r.score);
        println!("   {}", r.identity);
        let snippet = r.snippet.replace('\n', " ");
        println!("   {}", snippet);
        println!();
    }

    Ok(())
}
