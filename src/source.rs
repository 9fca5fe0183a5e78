//! Notes directory scanner.
//!
//! Walks each configured notes root and yields a [`NoteDocument`] per
//! matching file. Only file metadata is touched here — content is streamed
//! later by the fingerprinter, and read in full only for notes that
//! actually need re-indexing.

use std::path::Path;

use chrono::{TimeZone, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::SyncError;
use crate::models::NoteDocument;

/// Scan all configured notes roots.
///
/// An unreadable or missing root aborts the scan with
/// [`SyncError::SourceUnavailable`] — a partial view of the live set must
/// not be planned against. Results are sorted by identity so downstream
/// output is deterministic.
pub fn scan_notes(config: &Config) -> Result<Vec<NoteDocument>, SyncError> {
    let include_set = build_globset(&config.notes.include_globs)
        .map_err(|e| config_glob_error(config, e))?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/.obsidian/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(config.notes.exclude_globs.clone());
    let exclude_set =
        build_globset(&default_excludes).map_err(|e| config_glob_error(config, e))?;

    let mut docs = Vec::new();

    for root in &config.notes.roots {
        if !root.exists() {
            return Err(SyncError::SourceUnavailable {
                root: root.clone(),
                reason: "directory does not exist".to_string(),
            });
        }

        let walker = WalkDir::new(root).follow_links(config.notes.follow_symlinks);
        for entry in walker {
            let entry = entry.map_err(|e| SyncError::SourceUnavailable {
                root: root.clone(),
                reason: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            let rel_str = relative.to_string_lossy().to_string();

            if exclude_set.is_match(&rel_str) {
                continue;
            }
            if !include_set.is_match(&rel_str) {
                continue;
            }

            docs.push(file_to_document(path, &rel_str));
        }
    }

    docs.sort_by(|a, b| a.identity.cmp(&b.identity));
    Ok(docs)
}

fn file_to_document(path: &Path, rel_path: &str) -> NoteDocument {
    let modified_secs = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    let title = path
        .file_stem()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| rel_path.to_string());

    NoteDocument {
        identity: path.to_string_lossy().to_string(),
        rel_path: rel_path.to_string(),
        title,
        modified_at: Utc.timestamp_opt(modified_secs, 0).unwrap(),
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    builder.build()
}

fn config_glob_error(config: &Config, e: globset::Error) -> SyncError {
    SyncError::SourceUnavailable {
        root: config
            .notes
            .roots
            .first()
            .cloned()
            .unwrap_or_default(),
        reason: format!("invalid glob pattern: {}", e),
    }
}
