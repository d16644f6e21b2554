//! MemManager
//!
//! Logged front door to the memtables of every table: each insert and delete
//! goes to the WAL first, flushes advance the table's flushed LSN, and
//! opening replays whatever was logged but never flushed.

use std::collections::BTreeMap;

use crate::error::{AtlasError, Result};
use crate::meta::TableFileSchema;
use crate::segment::DocId;
use crate::source::VectorBatch;
use crate::wal::{Operation, WalEntry, WalManager};

use super::{InsertContext, MemTable};

/// Memtables of all tables, backed by the write-ahead log
pub struct MemManager {
    ctx: InsertContext,
    wal: WalManager,
    tables: BTreeMap<String, MemTable>,
}

impl MemManager {
    /// Open the WAL under `ctx.config.data_dir` and replay unflushed entries
    pub fn open(ctx: InsertContext) -> Result<Self> {
        let wal = WalManager::open(&ctx.config)?;
        let mut manager = Self {
            ctx,
            wal,
            tables: BTreeMap::new(),
        };

        let entries = manager.wal.take_recovery();
        let count = entries.len();
        for entry in entries {
            manager.replay(entry)?;
        }

        if count > 0 {
            tracing::info!(entries = count, tables = manager.tables.len(), "wal replayed");
        }
        Ok(manager)
    }

    /// Log `batch`, then buffer it; returns the LSN it was logged under
    pub fn insert(&mut self, table_id: &str, mut batch: VectorBatch) -> Result<u64> {
        if batch.added_count() > 0 {
            return Err(AtlasError::Source(format!(
                "batch for table {} was already partly added",
                table_id
            )));
        }
        self.validate(table_id, &batch)?;

        self.wal.create_table(table_id)?;
        let lsn = self.wal.insert(table_id, batch.group(), batch.ids(), batch.data())?;

        self.table_mut(table_id).add(&mut batch)?;
        Ok(lsn)
    }

    /// Log deletes, then apply them to the buffered files
    pub fn delete(&mut self, table_id: &str, doc_ids: &[DocId]) -> Result<u64> {
        self.wal.create_table(table_id)?;
        let lsn = self.wal.delete_by_id(table_id, doc_ids)?;

        if let Some(table) = self.tables.get_mut(table_id) {
            table.delete_batch(doc_ids)?;
        }
        Ok(lsn)
    }

    /// Serialize one table's memtable and mark its log entries flushed
    pub fn flush(&mut self, table_id: &str) -> Result<Vec<TableFileSchema>> {
        let lsn = self.wal.flush(Some(table_id));

        let flushed = match self.tables.get_mut(table_id) {
            Some(table) => table.serialize()?,
            None => Vec::new(),
        };

        if lsn != 0 {
            self.wal.table_flushed(table_id, lsn)?;
        }
        Ok(flushed)
    }

    /// Flush every table
    pub fn flush_all(&mut self) -> Result<Vec<TableFileSchema>> {
        let table_ids: Vec<String> = self.tables.keys().cloned().collect();

        let mut flushed = Vec::new();
        for table_id in table_ids {
            flushed.extend(self.flush(&table_id)?);
        }
        Ok(flushed)
    }

    /// Bytes buffered across all tables
    pub fn current_mem(&self) -> usize {
        self.tables.values().map(MemTable::current_mem).sum()
    }

    pub fn table(&self, table_id: &str) -> Option<&MemTable> {
        self.tables.get(table_id)
    }

    pub fn wal(&self) -> &WalManager {
        &self.wal
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn table_mut(&mut self, table_id: &str) -> &mut MemTable {
        let ctx = &self.ctx;
        self.tables
            .entry(table_id.to_string())
            .or_insert_with(|| MemTable::new(table_id, ctx.clone()))
    }

    /// Reject what the memtable would reject, before it reaches the log
    fn validate(&self, table_id: &str, batch: &VectorBatch) -> Result<()> {
        let table = self.ctx.meta.describe_table(table_id)?;

        if table.metric_type.is_binary() != batch.data().is_binary() {
            return Err(AtlasError::Source(format!(
                "metric {:?} of table {} does not accept this encoding",
                table.metric_type, table_id
            )));
        }

        let dimension = table.dimension.max(0) as usize;
        if batch.data().element_count() != batch.len() * dimension {
            return Err(AtlasError::Source(format!(
                "{} elements do not form {} vectors of dimension {}",
                batch.data().element_count(),
                batch.len(),
                dimension
            )));
        }
        Ok(())
    }

    fn replay(&mut self, entry: WalEntry) -> Result<()> {
        let WalEntry {
            lsn,
            table_id,
            operation,
            ..
        } = entry;

        let result = match operation {
            Operation::InsertFloat { group, ids, vectors } => {
                let mut batch = VectorBatch::float(ids, vectors).with_group(group);
                self.table_mut(&table_id).add(&mut batch)
            }
            Operation::InsertBinary { group, ids, vectors } => {
                let mut batch = VectorBatch::binary(ids, vectors).with_group(group);
                self.table_mut(&table_id).add(&mut batch)
            }
            Operation::Delete { ids } => match self.tables.get_mut(&table_id) {
                Some(table) => table.delete_batch(&ids),
                None => Ok(()),
            },
        };

        match result {
            // rejected the first time around too, or the table is gone
            Err(e @ (AtlasError::Unregistered(_) | AtlasError::Config(_) | AtlasError::Source(_))) => {
                tracing::warn!(table_id = %table_id, lsn, error = %e, "skipping wal entry");
                if self.tables.get(&table_id).map_or(false, MemTable::is_empty) {
                    self.tables.remove(&table_id);
                }
                Ok(())
            }
            other => other,
        }
    }
}
