//! MemTable implementation
//!
//! Sequence of memtable files for one logical table.

use crate::error::{AtlasError, Result};
use crate::meta::{FileType, TableFileSchema};
use crate::segment::DocId;
use crate::source::VectorSource;

use super::{InsertContext, MemTableFile};

/// Insert buffer of one table
///
/// Only the last file takes inserts; earlier ones are full and wait for flush.
pub struct MemTable {
    table_id: String,
    ctx: InsertContext,
    files: Vec<MemTableFile>,
}

impl MemTable {
    pub fn new(table_id: impl Into<String>, ctx: InsertContext) -> Self {
        Self {
            table_id: table_id.into(),
            ctx,
            files: Vec::new(),
        }
    }

    /// Drain `source` into this table's files, opening new files as they fill.
    pub fn add<S: VectorSource + ?Sized>(&mut self, source: &mut S) -> Result<()> {
        let mut force_new = false;

        while !source.all_added() {
            let remaining = source.remaining();

            match self.files.last_mut() {
                Some(file) if !force_new && !file.is_full() => {
                    file.add(source)?;
                    // no progress on a file that is not full: its budget is
                    // below this source's vector size, so roll over
                    force_new = source.remaining() == remaining;
                }
                _ => {
                    let mut file = MemTableFile::new(&self.table_id, self.ctx.clone());
                    if let Err(e) = file.add(source) {
                        self.discard(file);
                        return Err(e);
                    }
                    if source.remaining() == remaining {
                        self.discard(file);
                        return Err(AtlasError::Config(format!(
                            "table {}: file budget of {} bytes cannot hold a single vector",
                            self.table_id, self.ctx.config.max_table_file_mem
                        )));
                    }
                    self.files.push(file);
                    force_new = false;
                }
            }
        }

        Ok(())
    }

    /// Delete `doc_id` from every buffered file
    pub fn delete(&mut self, doc_id: DocId) -> Result<()> {
        for file in self.files.iter_mut() {
            file.delete(doc_id)?;
        }
        Ok(())
    }

    /// Delete several ids
    pub fn delete_batch(&mut self, doc_ids: &[DocId]) -> Result<()> {
        for &doc_id in doc_ids {
            self.delete(doc_id)?;
        }
        Ok(())
    }

    /// Flush every file, oldest first, and return their final schemas.
    ///
    /// Files are dropped as they are flushed; on error the unflushed ones stay.
    pub fn serialize(&mut self) -> Result<Vec<TableFileSchema>> {
        let mut flushed = Vec::with_capacity(self.files.len());

        while let Some(file) = self.files.first_mut() {
            file.serialize()?;
            flushed.push(self.files.remove(0).into_schema());
        }

        tracing::debug!(table_id = %self.table_id, files = flushed.len(), "memtable flushed");
        Ok(flushed)
    }

    /// Retire the row of a file that never took a vector.
    ///
    /// The row is marked TO_DELETE so it is never mistaken for a flushed file.
    fn discard(&self, file: MemTableFile) {
        if !file.is_registered() {
            return;
        }

        let mut schema = file.into_schema();
        schema.file_type = FileType::ToDelete;
        if let Err(e) = self.ctx.meta.update_table_file(&schema) {
            tracing::warn!(file_id = %schema.file_id, error = %e, "failed to retire unused table file");
        }
    }

    /// Bytes buffered across all files
    pub fn current_mem(&self) -> usize {
        self.files.iter().map(MemTableFile::current_mem).sum()
    }

    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn files(&self) -> &[MemTableFile] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
