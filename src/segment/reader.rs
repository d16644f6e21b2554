//! Segment Reader
//!
//! Loads a flushed segment; every id in the ledger is filtered out on load.

use std::path::{Path, PathBuf};

use crate::error::{AtlasError, Result};
use crate::format::read_framed;

use super::{
    DeletedDocs, DocId, Segment, VectorsFile, DELETED_DOCS_FILENAME, DELETED_DOCS_MAGIC,
    VECTORS_FILENAME, VECTORS_MAGIC,
};

/// Read-only view of a flushed segment
pub struct SegmentReader {
    directory: PathBuf,
    segment: Segment,
}

impl SegmentReader {
    /// Open the segment stored in `directory`
    pub fn open(directory: &Path) -> Result<Self> {
        let vectors_path = directory.join(VECTORS_FILENAME);
        if !vectors_path.exists() {
            return Err(AtlasError::Segment(format!(
                "no segment at {}",
                directory.display()
            )));
        }

        let vectors: VectorsFile = read_framed(&vectors_path, VECTORS_MAGIC)?;

        let ledger_path = directory.join(DELETED_DOCS_FILENAME);
        let deleted_docs = if ledger_path.exists() {
            read_framed(&ledger_path, DELETED_DOCS_MAGIC)?
        } else {
            DeletedDocs::new()
        };

        let mut segment = Segment::from_parts(vectors.groups, deleted_docs);
        segment.apply_deletes();

        Ok(Self {
            directory: directory.to_path_buf(),
            segment,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    pub fn into_segment(self) -> Segment {
        self.segment
    }

    /// Live vectors across all groups
    pub fn row_count(&self) -> usize {
        self.segment.row_count()
    }

    /// True if `doc_id` is readable (present and not tombstoned)
    pub fn contains(&self, doc_id: DocId) -> bool {
        !self.segment.deleted_docs().contains(doc_id) && self.segment.contains_doc(doc_id)
    }

    /// Live doc ids of every group, group by group
    pub fn doc_ids(&self) -> Vec<DocId> {
        self.segment
            .groups()
            .values()
            .flat_map(|g| g.uids().iter().copied())
            .collect()
    }
}
