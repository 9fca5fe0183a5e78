//! Synchronization pass orchestration.
//!
//! One pass runs scan → plan → mutate → persist. Only notes classified
//! `to_upsert` are ever read in full, chunked, embedded, and handed to the
//! index — unchanged notes cost one streamed fingerprint and nothing else.
//!
//! The outcome distinguishes three success-adjacent states the caller must
//! be able to tell apart: nothing needed doing, everything mutated and
//! flushed, and mutated-but-not-flushed (retry the save, the fingerprints
//! are already in the in-memory index).

use anyhow::Result;
use chrono::Utc;

use crate::catalog::ReferenceCatalog;
use crate::chunk::chunk_note;
use crate::config::Config;
use crate::embedding;
use crate::error::SyncError;
use crate::index::{NoteIndex, PreparedChunk, PreparedDocument};
use crate::models::DocumentFailure;
use crate::persist;
use crate::planner::{self, ChangeSet};
use crate::source;

/// Counters for one completed mutation pass.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub scanned: usize,
    pub unchanged: usize,
    pub inserted: usize,
    pub replaced: usize,
    pub chunks_written: usize,
    pub embeddings_written: usize,
    pub embeddings_pending: usize,
    pub deferred: usize,
    pub failed: Vec<DocumentFailure>,
}

/// How a pass ended. `NoChanges` is an explicit success, never inferred
/// from the absence of an error.
#[derive(Debug)]
pub enum PassOutcome {
    /// The live set matched the index; nothing was mutated or written.
    NoChanges {
        scanned: usize,
        failed: Vec<DocumentFailure>,
    },
    /// Mutations applied and the snapshot flushed.
    Synced(SyncReport),
    /// Mutations applied in memory, but the flush failed. A retry against
    /// the same index object will skip re-upserting and only re-save.
    MutatedNotSaved {
        report: SyncReport,
        error: SyncError,
    },
}

/// Run one synchronization pass against an in-memory index.
///
/// `full` plans against an empty catalog, re-upserting every live note.
/// A `SourceUnavailable` error aborts before any mutation; per-note read
/// failures are collected into the outcome instead.
pub async fn run_pass(
    config: &Config,
    index: &mut NoteIndex,
    full: bool,
    limit: Option<usize>,
) -> Result<PassOutcome, SyncError> {
    let live_docs = source::scan_notes(config)?;
    let scanned = live_docs.len();

    let catalog = if full {
        ReferenceCatalog::empty()
    } else {
        ReferenceCatalog::from_index(index)
    };

    let mut changes = planner::plan(live_docs, &catalog).await;
    // Deferred notes stay unrecorded in the catalog and come back on the
    // next pass; the report must still account for them here.
    let mut deferred = 0;
    if let Some(lim) = limit {
        if changes.to_upsert.len() > lim {
            deferred = changes.to_upsert.len() - lim;
            changes.to_upsert.truncate(lim);
        }
    }

    if !changes.has_work() && deferred == 0 {
        // A previous pass may have mutated this index without managing to
        // flush it; a no-work pass still owes a fresh save attempt.
        if index.is_dirty() {
            let mut report = SyncReport {
                scanned,
                unchanged: changes.unchanged.len(),
                failed: changes.failed,
                ..SyncReport::default()
            };
            return Ok(match persist::save(index, &config.index.persist_dir) {
                Ok(()) => PassOutcome::Synced(report),
                Err(error) => {
                    report.failed.sort_by(|a, b| a.identity.cmp(&b.identity));
                    PassOutcome::MutatedNotSaved { report, error }
                }
            });
        }
        return Ok(PassOutcome::NoChanges {
            scanned,
            failed: changes.failed,
        });
    }

    let mut report = apply_changes(config, index, changes, scanned).await;
    report.deferred = deferred;
    index.touch_synced(Utc::now().timestamp(), scanned);

    match persist::save(index, &config.index.persist_dir) {
        Ok(()) => Ok(PassOutcome::Synced(report)),
        Err(error) => Ok(PassOutcome::MutatedNotSaved { report, error }),
    }
}

/// Read, chunk, embed, and upsert every planned note. Read failures at
/// this stage join the pass's failure list; embedding failures leave the
/// note indexed with its vectors pending.
async fn apply_changes(
    config: &Config,
    index: &mut NoteIndex,
    changes: ChangeSet,
    scanned: usize,
) -> SyncReport {
    let mut report = SyncReport {
        scanned,
        unchanged: changes.unchanged.len(),
        failed: changes.failed,
        ..SyncReport::default()
    };

    let mut batch = Vec::new();

    for planned in changes.to_upsert {
        let path = std::path::Path::new(&planned.doc.identity);
        let body = match std::fs::read_to_string(path) {
            Ok(body) => body,
            Err(e) => {
                report.failed.push(DocumentFailure {
                    identity: planned.doc.identity.clone(),
                    error: SyncError::unreadable(&planned.doc.identity, e),
                });
                continue;
            }
        };

        let chunks = chunk_note(&body, config.chunking.max_tokens);
        report.chunks_written += chunks.len();

        let vectors = if config.embedding.is_enabled() {
            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            match embedding::embed_texts(&config.embedding, &texts).await {
                Ok(vecs) => {
                    report.embeddings_written += vecs.len();
                    Some(vecs)
                }
                Err(_) => {
                    report.embeddings_pending += chunks.len();
                    None
                }
            }
        } else {
            None
        };

        let prepared_chunks = chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| PreparedChunk {
                text: chunk.text,
                hash: chunk.hash,
                vector: vectors.as_ref().and_then(|v| v.get(i).cloned()),
            })
            .collect();

        batch.push(PreparedDocument {
            identity: planned.doc.identity,
            fingerprint: planned.fingerprint,
            title: planned.doc.title,
            updated_at: planned.doc.modified_at.timestamp(),
            chunks: prepared_chunks,
        });
    }

    for outcome in index.upsert_batch(batch) {
        if outcome.was_replaced {
            report.replaced += 1;
        } else {
            report.inserted += 1;
        }
    }

    report.failed.sort_by(|a, b| a.identity.cmp(&b.identity));
    report
}

/// CLI entry point for `ndx sync`: loads (or creates) the persisted
/// index, runs a pass, and prints the summary.
pub async fn run_sync(config: &Config, full: bool, dry_run: bool, limit: Option<usize>) -> Result<()> {
    let mut index = if persist::exists(&config.index.persist_dir) {
        persist::load(&config.index.persist_dir)?
    } else {
        NoteIndex::new()
    };

    if dry_run {
        let live_docs = source::scan_notes(config)?;
        let catalog = if full {
            ReferenceCatalog::empty()
        } else {
            ReferenceCatalog::from_index(&index)
        };
        let scanned = live_docs.len();
        let changes = planner::plan(live_docs, &catalog).await;

        println!("sync notes (dry-run)");
        println!("  scanned: {} notes", scanned);
        println!("  unchanged: {}", changes.unchanged.len());
        println!("  would upsert: {}", changes.to_upsert.len());
        print_failures(&changes.failed);
        return Ok(());
    }

    let outcome = run_pass(config, &mut index, full, limit).await?;

    match outcome {
        PassOutcome::NoChanges { scanned, failed } => {
            println!("sync notes");
            println!("  scanned: {} notes", scanned);
            println!("  no changes needed");
            print_failures(&failed);
            println!("ok");
        }
        PassOutcome::Synced(report) => {
            print_report(config, &report);
            println!("ok");
        }
        PassOutcome::MutatedNotSaved { report, error } => {
            print_report(config, &report);
            println!("  WARNING: index mutated in memory but not saved: {}", error);
            anyhow::bail!(
                "sync pass mutated the index but could not persist it to {}",
                config.index.persist_dir.display()
            );
        }
    }

    Ok(())
}

fn print_report(config: &Config, report: &SyncReport) {
    println!("sync notes");
    println!("  scanned: {} notes", report.scanned);
    println!("  unchanged: {}", report.unchanged);
    println!(
        "  upserted: {} ({} new, {} modified)",
        report.inserted + report.replaced,
        report.inserted,
        report.replaced
    );
    println!("  chunks written: {}", report.chunks_written);
    if report.deferred > 0 {
        println!("  deferred: {} (limit)", report.deferred);
    }
    if config.embedding.is_enabled() {
        println!("  embeddings written: {}", report.embeddings_written);
        println!("  embeddings pending: {}", report.embeddings_pending);
    }
    print_failures(&report.failed);
    println!("  saved: {}", config.index.persist_dir.display());
}

fn print_failures(failed: &[DocumentFailure]) {
    if failed.is_empty() {
        return;
    }
    println!("  read failures: {}", failed.len());
    for failure in failed {
        println!("    ! {}: {}", failure.identity, failure.error);
    }
}
