//! Question answering over the index.
//!
//! Retrieves the top chunks for a question (hybrid when embeddings are
//! configured, keyword otherwise), builds a grounded prompt, and asks the
//! resolved model provider. Prints the answer followed by the notes it
//! drew from.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::embedding;
use crate::index::NoteIndex;
use crate::llm::ModelProvider;
use crate::models::NoteExcerpt;
use crate::persist;

/// CLI entry point for `ndx ask`.
pub async fn run_ask(
    config: &Config,
    question: &str,
    model_override: Option<String>,
    context: Option<String>,
) -> Result<()> {
    if question.trim().is_empty() {
        bail!("Question must not be empty");
    }

    let model = model_override.unwrap_or_else(|| config.llm.model.clone());
    // Resolve once; everything after this works with the enum.
    let provider = ModelProvider::resolve(&model)?;

    if !persist::exists(&config.index.persist_dir) {
        bail!(
            "No index found at {}. Run `ndx sync` first.",
            config.index.persist_dir.display()
        );
    }
    let index = persist::load(&config.index.persist_dir)?;

    let excerpts = retrieve_excerpts(config, &index, question).await?;

    let answer = provider
        .answer(&config.llm, &model, question, &excerpts, context.as_deref())
        .await?;

    println!("{}", answer);
    if !excerpts.is_empty() {
        println!();
        println!("Sources:");
        for excerpt in &excerpts {
            println!("  - {} ({})", excerpt.title, excerpt.identity);
        }
    }

    Ok(())
}

/// Pull the top chunks for the question, deduplicated per chunk, capped
/// at `llm.max_context_chunks`.
async fn retrieve_excerpts(
    config: &Config,
    index: &NoteIndex,
    question: &str,
) -> Result<Vec<NoteExcerpt>> {
    let k = config.retrieval.candidate_k;

    let mut candidates = index.keyword_candidates(question, k);
    if config.embedding.is_enabled() {
        let query_vec = embedding::embed_query(&config.embedding, question).await?;
        candidates.extend(index.vector_candidates(&query_vec, k));
    }

    candidates.sort_by(|a, b| {
        b.raw_score
            .partial_cmp(&a.raw_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.chunk_id.cmp(&b.chunk_id))
    });
    // The same chunk can surface on both channels; keep its best-scored hit.
    let mut seen = std::collections::HashSet::new();
    candidates.retain(|c| seen.insert(c.chunk_id.clone()));
    candidates.truncate(config.llm.max_context_chunks);

    Ok(candidates
        .into_iter()
        .map(|c| {
            let text = index
                .chunk_text(&c.chunk_id)
                .map(|t| t.to_string())
                .unwrap_or(c.snippet);
            NoteExcerpt {
                title: index
                    .entry(&c.identity)
                    .map(|e| e.title.clone())
                    .unwrap_or_else(|| c.identity.clone()),
                identity: c.identity,
                text,
            }
        })
        .collect())
}
