//! MemTable file
//!
//! Insert buffer for exactly one physical table file.

use crate::config::FLOAT_TYPE_SIZE;
use crate::error::{AtlasError, Result};
use crate::meta::{EngineType, FileType, TableFileSchema};
use crate::metrics::CollectSerializeMetrics;
use crate::segment::{DocId, Segment, SegmentWriter};
use crate::source::VectorSource;

use super::InsertContext;

/// File type a flush of `size` buffered bytes produces.
///
/// Idmap engines are searched brute-force and never become index candidates.
pub fn flush_file_type(engine_type: EngineType, size: u64, index_file_size: u64) -> FileType {
    if engine_type.is_idmap() {
        FileType::Raw
    } else if size >= index_file_size {
        FileType::ToIndex
    } else {
        FileType::Raw
    }
}

/// In-memory buffer bound to one table file
///
/// ## Lifecycle
/// ```text
/// new ──▶ registered ──▶ add/delete ... ──▶ serialize ──▶ sealed
///  │
///  └────▶ unregistered (every operation fails)
/// ```
///
/// All mutating operations take `&mut self`, so a file has at most one
/// writer at a time; the type holds no locks.
pub struct MemTableFile {
    table_id: String,
    ctx: InsertContext,

    /// Owned copy of the file's schema row
    schema: TableFileSchema,

    /// Bytes accounted as resident; only grows until flush
    current_mem: usize,

    /// Present only if the schema row was created
    writer: Option<SegmentWriter>,

    /// Why registration failed, if it did
    registration_error: Option<String>,

    sealed: bool,
}

impl MemTableFile {
    /// Register a new file row for `table_id` and bind a segment writer to it.
    ///
    /// A registration failure is logged and leaves the file unregistered.
    pub fn new(table_id: &str, ctx: InsertContext) -> Self {
        let mut file = Self {
            table_id: table_id.to_string(),
            ctx,
            schema: TableFileSchema::request(table_id),
            current_mem: 0,
            writer: None,
            registration_error: None,
            sealed: false,
        };

        match file.create_table_file() {
            Ok(()) => {
                file.writer = Some(SegmentWriter::new(file.schema.directory.clone()));
            }
            Err(e) => {
                file.registration_error = Some(e.to_string());
            }
        }

        file
    }

    fn create_table_file(&mut self) -> Result<()> {
        let request = TableFileSchema::request(self.table_id.as_str());
        match self.ctx.meta.create_table_file(request) {
            Ok(schema) => {
                self.schema = schema;
                Ok(())
            }
            Err(e) => {
                tracing::error!(table_id = %self.table_id, error = %e, "MemTableFile::create_table_file failed");
                Err(e)
            }
        }
    }

    /// Buffer as many vectors from `source` as the remaining budget allows.
    ///
    /// Returns `Ok(())` without touching the source if not even one vector
    /// fits; callers check [`is_full`](Self::is_full) and move on to a new file.
    pub fn add<S: VectorSource + ?Sized>(&mut self, source: &mut S) -> Result<()> {
        if self.sealed {
            return Err(self.sealed_error("add"));
        }
        let Some(writer) = self.writer.as_mut() else {
            return Err(self.unregistered_error("add"));
        };

        if self.schema.dimension <= 0 {
            tracing::error!(
                table_id = %self.schema.table_id,
                dimension = self.schema.dimension,
                "MemTableFile::add: invalid table file dimension"
            );
            return Err(AtlasError::Config(format!(
                "table file {} of table {} has dimension {}",
                self.schema.file_id, self.schema.table_id, self.schema.dimension
            )));
        }

        let single_vector_mem_size = source.single_vector_size(self.schema.dimension as usize);
        let mem_left = self.ctx.config.max_table_file_mem.saturating_sub(self.current_mem);
        if single_vector_mem_size == 0 || mem_left < single_vector_mem_size {
            return Ok(());
        }

        // Integer division: a partial vector's worth of budget is never rounded up.
        let num_vectors_to_add = mem_left / single_vector_mem_size;
        let num_vectors_added = source.add(writer, &self.schema, num_vectors_to_add)?;
        if num_vectors_added > num_vectors_to_add {
            tracing::error!(
                file_id = %self.schema.file_id,
                requested = num_vectors_to_add,
                reported = num_vectors_added,
                "vector source added more than requested"
            );
            return Err(AtlasError::Source(format!(
                "source reported {} vectors added, at most {} were requested",
                num_vectors_added, num_vectors_to_add
            )));
        }

        self.current_mem += num_vectors_added * single_vector_mem_size;
        Ok(())
    }

    /// Mark `doc_id` deleted.
    ///
    /// Resident copies are erased right away where found; the id always goes
    /// into the deletion ledger, which is what later reads honour.
    pub fn delete(&mut self, doc_id: DocId) -> Result<()> {
        if self.sealed {
            return Err(self.sealed_error("delete"));
        }
        let Some(writer) = self.writer.as_mut() else {
            return Err(self.unregistered_error("delete"));
        };

        let element_width = self.schema.metric_type.element_width();
        let segment = writer.segment_mut();

        for group in segment.groups_mut().values_mut() {
            if let Some(offset) = group.uids().iter().position(|&uid| uid == doc_id) {
                group.erase(offset, element_width);
            }
        }

        segment.deleted_docs_mut().add_delete_doc(doc_id);
        Ok(())
    }

    /// Bytes accounted as resident
    pub fn current_mem(&self) -> usize {
        self.current_mem
    }

    /// Budget still available
    pub fn mem_left(&self) -> usize {
        self.ctx.config.max_table_file_mem.saturating_sub(self.current_mem)
    }

    /// True once less than one float vector's worth of budget is left.
    ///
    /// Always uses the float element width, binary tables included.
    pub fn is_full(&self) -> bool {
        let single_vector_mem_size = self.schema.dimension.max(0) as usize * FLOAT_TYPE_SIZE;
        self.mem_left() < single_vector_mem_size
    }

    /// Flush the buffer and record the file's new state.
    ///
    /// Steps:
    /// 1. Write the segment (resident vectors + deletion ledger)
    /// 2. Pick RAW or TO_INDEX from the engine type and buffered size
    /// 3. Persist the schema row
    /// 4. Optionally warm the read cache (failures only logged)
    ///
    /// Returns the outcome of step 3. On success the file is sealed.
    pub fn serialize(&mut self) -> Result<()> {
        if self.sealed {
            return Err(self.sealed_error("serialize"));
        }
        let Some(writer) = self.writer.as_mut() else {
            return Err(self.unregistered_error("serialize"));
        };

        let size = self.current_mem;
        let _metrics = CollectSerializeMetrics::new(&self.ctx.metrics, size);

        let stats = writer.serialize().map_err(|e| {
            tracing::error!(file_id = %self.schema.file_id, error = %e, "segment serialize failed");
            e
        })?;

        self.schema.file_size = stats.file_size;
        self.schema.row_count = stats.row_count;
        self.schema.file_type =
            flush_file_type(self.schema.engine_type, size as u64, self.schema.index_file_size);

        let status = self.ctx.meta.update_table_file(&self.schema);

        tracing::debug!(
            table_id = %self.schema.table_id,
            file_id = %self.schema.file_id,
            size,
            rows = stats.row_count,
            "new {} file",
            if self.schema.file_type == FileType::Raw { "raw" } else { "to_index" }
        );

        if self.ctx.config.insert_cache_immediately {
            if let Err(e) = writer.cache(&self.ctx.cache) {
                tracing::warn!(file_id = %self.schema.file_id, error = %e, "failed to warm segment cache");
            }
        }

        match status {
            Ok(()) => {
                self.sealed = true;
                Ok(())
            }
            Err(e) => {
                tracing::error!(file_id = %self.schema.file_id, error = %e, "failed to update table file");
                Err(e)
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    pub fn schema(&self) -> &TableFileSchema {
        &self.schema
    }

    pub fn into_schema(self) -> TableFileSchema {
        self.schema
    }

    /// Resident segment, if registered
    pub fn segment(&self) -> Option<&Segment> {
        self.writer.as_ref().map(SegmentWriter::segment)
    }

    pub fn is_registered(&self) -> bool {
        self.writer.is_some()
    }

    pub fn registration_error(&self) -> Option<&str> {
        self.registration_error.as_deref()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn unregistered_error(&self, op: &str) -> AtlasError {
        AtlasError::Unregistered(format!(
            "{} on a file of table {}: {}",
            op,
            self.table_id,
            self.registration_error.as_deref().unwrap_or("no schema row")
        ))
    }

    fn sealed_error(&self, op: &str) -> AtlasError {
        AtlasError::Sealed(format!("{} on file {} of table {}", op, self.schema.file_id, self.table_id))
    }
}
