//! Deletion ledger

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::DocId;

/// Doc ids marked deleted, applied against on-disk data at flush.
///
/// Entries are never removed; adding an id twice has the effect of adding it once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedDocs {
    docs: BTreeSet<DocId>,
}

impl DeletedDocs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tombstone. Returns false if it was already recorded.
    pub fn add_delete_doc(&mut self, doc_id: DocId) -> bool {
        self.docs.insert(doc_id)
    }

    pub fn contains(&self, doc_id: DocId) -> bool {
        self.docs.contains(&doc_id)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Ids in ascending order
    pub fn iter(&self) -> impl Iterator<Item = DocId> + '_ {
        self.docs.iter().copied()
    }

    /// Union `other` into this ledger
    pub fn merge(&mut self, other: &DeletedDocs) {
        self.docs.extend(other.docs.iter().copied());
    }
}
