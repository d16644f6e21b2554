//! Segment Writer
//!
//! Owns the resident segment of one table file and writes it to disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;
use crate::format::{read_framed, write_framed};

use super::{
    DeletedDocs, DocId, Segment, SegmentCache, SegmentReader, VectorsFile, DELETED_DOCS_FILENAME,
    DELETED_DOCS_MAGIC, VECTORS_FILENAME, VECTORS_MAGIC,
};

/// Outcome of a segment flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentStats {
    /// Live vectors written
    pub row_count: u64,
    /// Bytes on disk (vectors + ledger)
    pub file_size: u64,
    /// Resident vectors dropped because the ledger named them
    pub deleted_count: u64,
}

/// Builds one segment in memory and flushes it to `directory`
pub struct SegmentWriter {
    directory: PathBuf,
    segment: Segment,
}

impl SegmentWriter {
    /// Bind a writer to `directory`. Nothing touches disk until `serialize`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            segment: Segment::new(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    /// Resident segment, for in-place edits
    pub fn segment_mut(&mut self) -> &mut Segment {
        &mut self.segment
    }

    /// Append vectors to `group`, creating it on first use
    pub fn add_vectors(
        &mut self,
        group: &str,
        dimension: usize,
        element_width: usize,
        uids: &[DocId],
        data: &[u8],
    ) -> Result<()> {
        self.segment
            .group_for_insert(group, dimension, element_width)?
            .append(uids, data)
    }

    /// Flush the resident segment.
    ///
    /// Steps:
    /// 1. Union any ledger already on disk into the resident ledger
    /// 2. Drop ledger ids from the resident groups
    /// 3. Write `vectors.seg` and `deleted_docs.del`
    pub fn serialize(&mut self) -> Result<SegmentStats> {
        fs::create_dir_all(&self.directory)?;

        let ledger_path = self.directory.join(DELETED_DOCS_FILENAME);
        if ledger_path.exists() {
            let on_disk: DeletedDocs = read_framed(&ledger_path, DELETED_DOCS_MAGIC)?;
            self.segment.deleted_docs_mut().merge(&on_disk);
        }

        let deleted_count = self.segment.apply_deletes() as u64;

        let body = VectorsFile {
            groups: self.segment.groups().clone(),
        };
        let vectors_size = write_framed(&self.directory.join(VECTORS_FILENAME), VECTORS_MAGIC, &body)?;
        let ledger_size = write_framed(&ledger_path, DELETED_DOCS_MAGIC, self.segment.deleted_docs())?;

        let stats = SegmentStats {
            row_count: self.segment.row_count() as u64,
            file_size: vectors_size + ledger_size,
            deleted_count,
        };

        tracing::trace!(
            directory = %self.directory.display(),
            rows = stats.row_count,
            bytes = stats.file_size,
            deleted = stats.deleted_count,
            "segment written"
        );

        Ok(stats)
    }

    /// Load what `serialize` wrote into the read cache
    pub fn cache(&self, cache: &SegmentCache) -> Result<()> {
        let reader = SegmentReader::open(&self.directory)?;
        cache.insert(self.directory.clone(), Arc::new(reader.into_segment()));
        Ok(())
    }
}
