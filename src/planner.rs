//! Sync planning: decide which notes need re-indexing.
//!
//! One pass fingerprints every live note, then classifies each identity
//! against the reference catalog:
//!
//! - absent from the catalog → `to_upsert` (new)
//! - present, fingerprint equal → `unchanged`
//! - present, fingerprint differs → `to_upsert` (modified)
//! - fingerprint failed → `failed` (reported, does not abort the pass)
//!
//! Fingerprinting runs on a blocking worker pool; classification waits for
//! every fingerprint so the change set reflects one consistent snapshot.
//! Classification depends only on (identity, fingerprint), so input order
//! never affects the result.

use tokio::task::JoinSet;

use crate::catalog::ReferenceCatalog;
use crate::error::SyncError;
use crate::fingerprint;
use crate::models::{DocumentFailure, NoteDocument, PlannedDocument};

/// The result of planning one pass: every live note lands in exactly one
/// of the three groups.
#[derive(Debug, Default)]
pub struct ChangeSet {
    /// Fingerprint matches the catalog; never re-indexed.
    pub unchanged: Vec<PlannedDocument>,
    /// New or modified; the only input to the index mutator.
    pub to_upsert: Vec<PlannedDocument>,
    /// Notes whose content could not be read this pass.
    pub failed: Vec<DocumentFailure>,
}

impl ChangeSet {
    /// True when the mutator has nothing to do. Distinct from an error:
    /// an empty live set or an all-unchanged scan are both valid passes.
    pub fn has_work(&self) -> bool {
        !self.to_upsert.is_empty()
    }

    pub fn total(&self) -> usize {
        self.unchanged.len() + self.to_upsert.len() + self.failed.len()
    }
}

/// Plan a pass: fingerprint all live notes concurrently, then classify.
///
/// The catalog is read-only for the duration of the call; nothing here
/// mutates the index.
pub async fn plan(live_docs: Vec<NoteDocument>, catalog: &ReferenceCatalog) -> ChangeSet {
    let mut tasks: JoinSet<(NoteDocument, Result<String, SyncError>)> = JoinSet::new();

    for doc in live_docs {
        tasks.spawn_blocking(move || {
            let result = fingerprint::fingerprint_file(std::path::Path::new(&doc.identity));
            (doc, result)
        });
    }

    // Drain every fingerprint before classifying anything: the change set
    // must reflect a single snapshot of the live set.
    let mut fingerprinted = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(pair) => fingerprinted.push(pair),
            Err(e) => {
                // A panicked hash task is an I/O-independent bug; surface
                // it as an unreadable note rather than aborting the pass.
                fingerprinted.push((
                    NoteDocument {
                        identity: format!("<join error: {}>", e),
                        rel_path: String::new(),
                        title: String::new(),
                        modified_at: chrono::Utc::now(),
                    },
                    Err(SyncError::unreadable(
                        "<unknown>",
                        std::io::Error::other(e.to_string()),
                    )),
                ));
            }
        }
    }

    classify(fingerprinted, catalog)
}

/// Classify fingerprinted notes against the catalog.
///
/// Pure function of its inputs; output vectors are sorted by identity so
/// reporting is stable regardless of fingerprint completion order.
pub fn classify(
    fingerprinted: Vec<(NoteDocument, Result<String, SyncError>)>,
    catalog: &ReferenceCatalog,
) -> ChangeSet {
    let mut changes = ChangeSet::default();

    for (doc, result) in fingerprinted {
        match result {
            Err(error) => changes.failed.push(DocumentFailure {
                identity: doc.identity,
                error,
            }),
            Ok(fingerprint) => {
                let planned = PlannedDocument { doc, fingerprint };
                match catalog.lookup(&planned.doc.identity) {
                    Some(recorded) if recorded == planned.fingerprint => {
                        changes.unchanged.push(planned)
                    }
                    _ => changes.to_upsert.push(planned),
                }
            }
        }
    }

    changes.unchanged.sort_by(|a, b| a.doc.identity.cmp(&b.doc.identity));
    changes.to_upsert.sort_by(|a, b| a.doc.identity.cmp(&b.doc.identity));
    changes.failed.sort_by(|a, b| a.identity.cmp(&b.identity));

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint_bytes;
    use chrono::Utc;

    fn doc(identity: &str) -> NoteDocument {
        NoteDocument {
            identity: identity.to_string(),
            rel_path: identity.trim_start_matches('/').to_string(),
            title: identity.to_string(),
            modified_at: Utc::now(),
        }
    }

    fn ok(identity: &str, content: &[u8]) -> (NoteDocument, Result<String, SyncError>) {
        (doc(identity), Ok(fingerprint_bytes(content)))
    }

    fn unreadable(identity: &str) -> (NoteDocument, Result<String, SyncError>) {
        (
            doc(identity),
            Err(SyncError::unreadable(
                identity,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            )),
        )
    }

    #[test]
    fn test_empty_catalog_upserts_everything() {
        // Scenario 1: catalog empty, live = {A, B}.
        let changes = classify(
            vec![ok("/n/a.md", b"alpha"), ok("/n/b.md", b"beta")],
            &ReferenceCatalog::empty(),
        );
        assert_eq!(changes.to_upsert.len(), 2);
        assert!(changes.unchanged.is_empty());
        assert!(changes.failed.is_empty());
    }

    #[test]
    fn test_unchanged_and_new() {
        // Scenario 2: A unchanged, B new.
        let catalog = ReferenceCatalog::from_pairs(vec![(
            "/n/a.md".to_string(),
            Some(fingerprint_bytes(b"alpha")),
        )]);
        let changes = classify(
            vec![ok("/n/a.md", b"alpha"), ok("/n/b.md", b"beta")],
            &catalog,
        );
        assert_eq!(changes.unchanged.len(), 1);
        assert_eq!(changes.unchanged[0].doc.identity, "/n/a.md");
        assert_eq!(changes.to_upsert.len(), 1);
        assert_eq!(changes.to_upsert[0].doc.identity, "/n/b.md");
    }

    #[test]
    fn test_modified_document() {
        // Scenario 3: A's content changed since last index.
        let catalog = ReferenceCatalog::from_pairs(vec![(
            "/n/a.md".to_string(),
            Some(fingerprint_bytes(b"old content")),
        )]);
        let changes = classify(vec![ok("/n/a.md", b"new content")], &catalog);
        assert_eq!(changes.to_upsert.len(), 1);
        assert_eq!(
            changes.to_upsert[0].fingerprint,
            fingerprint_bytes(b"new content")
        );
        assert!(changes.unchanged.is_empty());
    }

    #[test]
    fn test_read_failure_is_isolated() {
        // Scenario 4: one unreadable note, the rest classify normally.
        let catalog = ReferenceCatalog::from_pairs(vec![(
            "/n/a.md".to_string(),
            Some(fingerprint_bytes(b"alpha")),
        )]);
        let changes = classify(
            vec![
                ok("/n/a.md", b"alpha"),
                unreadable("/n/broken.md"),
                ok("/n/c.md", b"gamma"),
            ],
            &catalog,
        );
        assert_eq!(changes.unchanged.len(), 1);
        assert_eq!(changes.to_upsert.len(), 1);
        assert_eq!(changes.failed.len(), 1);
        assert_eq!(changes.failed[0].identity, "/n/broken.md");
        match &changes.failed[0].error {
            SyncError::UnreadableSource { .. } => {}
            other => panic!("expected UnreadableSource, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_catalog_fingerprint_forces_upsert() {
        let catalog =
            ReferenceCatalog::from_pairs(vec![("/n/legacy.md".to_string(), None)]);
        let changes = classify(vec![ok("/n/legacy.md", b"whatever")], &catalog);
        assert_eq!(changes.to_upsert.len(), 1);
    }

    #[test]
    fn test_order_independence() {
        let catalog = ReferenceCatalog::from_pairs(vec![
            ("/n/a.md".to_string(), Some(fingerprint_bytes(b"alpha"))),
            ("/n/b.md".to_string(), Some(fingerprint_bytes(b"stale"))),
        ]);
        let forward = vec![
            ok("/n/a.md", b"alpha"),
            ok("/n/b.md", b"beta"),
            ok("/n/c.md", b"gamma"),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let plan_fwd = classify(forward, &catalog);
        let plan_rev = classify(reversed, &catalog);

        let ids = |docs: &[PlannedDocument]| {
            docs.iter().map(|p| p.doc.identity.clone()).collect::<Vec<_>>()
        };
        assert_eq!(ids(&plan_fwd.unchanged), ids(&plan_rev.unchanged));
        assert_eq!(ids(&plan_fwd.to_upsert), ids(&plan_rev.to_upsert));
    }

    #[test]
    fn test_classification_completeness() {
        // Every live note lands in exactly one group.
        let catalog = ReferenceCatalog::from_pairs(vec![(
            "/n/a.md".to_string(),
            Some(fingerprint_bytes(b"alpha")),
        )]);
        let input = vec![
            ok("/n/a.md", b"alpha"),
            ok("/n/b.md", b"beta"),
            unreadable("/n/x.md"),
        ];
        let total = input.len();
        let changes = classify(input, &catalog);
        assert_eq!(changes.total(), total);
    }

    #[test]
    fn test_empty_live_set_is_no_work() {
        let changes = classify(Vec::new(), &ReferenceCatalog::empty());
        assert!(!changes.has_work());
        assert_eq!(changes.total(), 0);
    }

    #[test]
    fn test_idempotence() {
        // Re-planning against a catalog that recorded the first pass's
        // fingerprints yields an empty to_upsert.
        let first = classify(
            vec![ok("/n/a.md", b"alpha"), ok("/n/b.md", b"beta")],
            &ReferenceCatalog::empty(),
        );
        assert_eq!(first.to_upsert.len(), 2);

        let catalog = ReferenceCatalog::from_pairs(
            first
                .to_upsert
                .iter()
                .map(|p| (p.doc.identity.clone(), Some(p.fingerprint.clone()))),
        );
        let second = classify(
            vec![ok("/n/a.md", b"alpha"), ok("/n/b.md", b"beta")],
            &catalog,
        );
        assert!(!second.has_work());
        assert_eq!(second.unchanged.len(), 2);
    }

    #[tokio::test]
    async fn test_plan_fingerprints_from_disk() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("note.md");
        std::fs::write(&path, "on burping").unwrap();

        let live = vec![doc(&path.to_string_lossy())];
        let changes = plan(live, &ReferenceCatalog::empty()).await;
        assert_eq!(changes.to_upsert.len(), 1);
        assert_eq!(
            changes.to_upsert[0].fingerprint,
            fingerprint_bytes(b"on burping")
        );
    }

    #[tokio::test]
    async fn test_plan_reports_missing_file() {
        let live = vec![doc("/nonexistent/gone.md")];
        let changes = plan(live, &ReferenceCatalog::empty()).await;
        assert!(changes.to_upsert.is_empty());
        assert_eq!(changes.failed.len(), 1);
    }
}
