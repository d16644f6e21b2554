//! Segment Module
//!
//! Physical representation of one table file: named vector groups plus the
//! deletion ledger, and the code that moves it between memory and disk.
//!
//! ## Directory Layout
//! ```text
//! {directory}/
//!   ├── vectors.seg        (all vector groups, ledger ids already removed)
//!   └── deleted_docs.del   (the deletion ledger, merged across flushes)
//! ```
//! Both files use the framed format from [`crate::format`].

mod cache;
mod deleted;
mod reader;
mod vectors;
mod writer;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{AtlasError, Result};

pub use cache::SegmentCache;
pub use deleted::DeletedDocs;
pub use reader::SegmentReader;
pub use vectors::VectorGroup;
pub use writer::{SegmentStats, SegmentWriter};

/// External identifier of one logical vector record
pub type DocId = i64;

/// Group that inserts land in unless a source names another
pub const DEFAULT_VECTOR_GROUP: &str = "vectors";

pub(crate) const VECTORS_FILENAME: &str = "vectors.seg";
pub(crate) const DELETED_DOCS_FILENAME: &str = "deleted_docs.del";
pub(crate) const VECTORS_MAGIC: &[u8; 4] = b"AVSG";
pub(crate) const DELETED_DOCS_MAGIC: &[u8; 4] = b"AVDL";

/// In-memory segment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segment {
    groups: BTreeMap<String, VectorGroup>,
    deleted_docs: DeletedDocs,
}

/// On-disk body of `vectors.seg`
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct VectorsFile {
    pub(crate) groups: BTreeMap<String, VectorGroup>,
}

impl Segment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn groups(&self) -> &BTreeMap<String, VectorGroup> {
        &self.groups
    }

    pub fn groups_mut(&mut self) -> &mut BTreeMap<String, VectorGroup> {
        &mut self.groups
    }

    pub fn group(&self, name: &str) -> Option<&VectorGroup> {
        self.groups.get(name)
    }

    /// Get or create a group; an existing group must match the layout
    pub fn group_for_insert(
        &mut self,
        name: &str,
        dimension: usize,
        element_width: usize,
    ) -> Result<&mut VectorGroup> {
        let group = self
            .groups
            .entry(name.to_string())
            .or_insert_with(|| VectorGroup::new(dimension, element_width));

        if group.dimension() != dimension || group.element_width() != element_width {
            return Err(AtlasError::Segment(format!(
                "group {} holds {}x{} byte vectors, got {}x{}",
                name,
                group.dimension(),
                group.element_width(),
                dimension,
                element_width
            )));
        }

        Ok(group)
    }

    pub fn deleted_docs(&self) -> &DeletedDocs {
        &self.deleted_docs
    }

    pub fn deleted_docs_mut(&mut self) -> &mut DeletedDocs {
        &mut self.deleted_docs
    }

    /// Vectors across all groups
    pub fn row_count(&self) -> usize {
        self.groups.values().map(VectorGroup::len).sum()
    }

    pub fn byte_size(&self) -> usize {
        self.groups.values().map(VectorGroup::byte_size).sum::<usize>()
            + self.deleted_docs.len() * std::mem::size_of::<DocId>()
    }

    /// True if any group still holds `doc_id`
    pub fn contains_doc(&self, doc_id: DocId) -> bool {
        self.groups.values().any(|g| g.uids().contains(&doc_id))
    }

    pub(crate) fn from_parts(groups: BTreeMap<String, VectorGroup>, deleted_docs: DeletedDocs) -> Self {
        Self { groups, deleted_docs }
    }

    /// Remove ledger ids from every group; returns how many vectors went
    pub(crate) fn apply_deletes(&mut self) -> usize {
        let deleted = &self.deleted_docs;
        self.groups.values_mut().map(|g| g.retain_live(deleted)).sum()
    }
}
