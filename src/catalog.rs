//! Reference catalog: the index's record of what it already contains.
//!
//! Built once per pass from index metadata and treated as a read-only
//! snapshot while planning. Entries whose fingerprint metadata is missing
//! (first-ever or legacy entries) answer `None`, which forces a re-upsert
//! rather than trusting stale data.

use std::collections::HashMap;

use crate::index::NoteIndex;

/// Identity → recorded fingerprint, as of the last successful index update.
#[derive(Debug, Default)]
pub struct ReferenceCatalog {
    entries: HashMap<String, Option<String>>,
}

impl ReferenceCatalog {
    /// An empty catalog. Planning against it classifies every live note as
    /// new — used by `sync --full`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Derive the catalog from the current index metadata.
    pub fn from_index(index: &NoteIndex) -> Self {
        Self::from_pairs(
            index
                .metadata()
                .map(|(identity, fp)| (identity.to_string(), fp.map(|f| f.to_string()))),
        )
    }

    /// Build from (identity, recorded fingerprint) pairs. Later pairs win,
    /// preserving the at-most-one-entry-per-identity invariant.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        Self {
            entries: pairs.into_iter().collect(),
        }
    }

    /// The fingerprint recorded for an identity, if any.
    ///
    /// `None` covers both "never indexed" and "indexed without a recorded
    /// fingerprint"; the planner treats both as needing an upsert.
    pub fn lookup(&self, identity: &str) -> Option<&str> {
        self.entries.get(identity).and_then(|fp| fp.as_deref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
