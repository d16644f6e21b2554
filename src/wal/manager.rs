//! WAL Manager
//!
//! Owns the log directory: assigns LSNs, splits large batches into records,
//! tracks how far each table has been flushed, rotates and prunes log files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{Config, WalSyncStrategy};
use crate::error::{AtlasError, Result};
use crate::format::{read_framed, write_framed};
use crate::segment::DocId;
use crate::source::VectorData;

use super::{Operation, WalEntry, WalRecovery, WalWriter};

/// Bytes reserved in a record for everything but ids and vectors
const RECORD_OVERHEAD: usize = 64;

/// LSN bookkeeping of one table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLsn {
    /// Every entry up to here is in a serialized segment
    pub flush_lsn: u64,
    /// Last entry logged for the table
    pub wal_lsn: u64,
}

/// Persisted part of the manager's state (`wal.meta`)
#[derive(Debug, Default, Serialize, Deserialize)]
struct WalMeta {
    tables: BTreeMap<String, TableLsn>,
    applied_lsn: u64,
}

/// Write-ahead log of one instance
///
/// ## On open:
/// 1. Load `wal.meta` (per-table flushed LSNs)
/// 2. Recover every log file in LSN order, truncating a torn tail
/// 3. Queue the entries no table has flushed yet for replay
/// 4. Continue LSNs after the highest one seen
pub struct WalManager {
    dir: PathBuf,
    sync_strategy: WalSyncStrategy,
    file_size: u64,
    record_size: usize,

    /// Log files as (first LSN, path), oldest first; the last one is active
    files: Vec<(u64, PathBuf)>,
    writer: WalWriter,

    last_lsn: u64,
    tables: BTreeMap<String, TableLsn>,

    /// Entries waiting to be replayed into memtables
    recovery: Vec<WalEntry>,
}

impl WalManager {
    const DIR: &'static str = "wal";
    const META_FILENAME: &'static str = "wal.meta";
    const META_MAGIC: &'static [u8; 4] = b"AVWM";
    const EXTENSION: &'static str = "wal";

    /// Open or create the log under `{config.data_dir}/wal`
    pub fn open(config: &Config) -> Result<Self> {
        let dir = config.data_dir.join(Self::DIR);
        fs::create_dir_all(&dir)?;

        let meta_path = dir.join(Self::META_FILENAME);
        let meta: WalMeta = if meta_path.exists() {
            read_framed(&meta_path, Self::META_MAGIC)?
        } else {
            WalMeta::default()
        };

        let mut files = Self::discover(&dir)?;
        let mut tables = meta.tables;
        let mut last_lsn = meta.applied_lsn;
        for table in tables.values() {
            last_lsn = last_lsn.max(table.flush_lsn);
        }

        let mut recovery = Vec::new();
        let mut previous_lsn = 0;
        let file_count = files.len();
        for (i, (first_lsn, path)) in files.iter().enumerate() {
            last_lsn = last_lsn.max(first_lsn.saturating_sub(1));

            // only the newest file may have a torn tail
            let is_last = i + 1 == file_count;
            if !is_last && !config.wal_recovery_error_ignore {
                let verified = WalRecovery::verify(path)?;
                if verified.entries_corrupted > 0 {
                    return Err(AtlasError::Corruption(format!(
                        "wal file {} is damaged after lsn {}",
                        path.display(),
                        verified.last_lsn
                    )));
                }
            }

            let (entries, result) = WalRecovery::recover(path)?;
            if result.was_truncated && !is_last {
                tracing::warn!(path = %path.display(), last_lsn = result.last_lsn, "skipping damaged wal file");
            }

            for entry in entries {
                if entry.lsn <= previous_lsn {
                    return Err(AtlasError::Corruption(format!(
                        "wal lsn {} in {} is not after {}",
                        entry.lsn,
                        path.display(),
                        previous_lsn
                    )));
                }
                previous_lsn = entry.lsn;
                last_lsn = last_lsn.max(entry.lsn);

                // a table missing from wal.meta has flushed nothing of this log
                let table = tables.entry(entry.table_id.clone()).or_insert(TableLsn {
                    flush_lsn: entry.lsn - 1,
                    wal_lsn: entry.lsn - 1,
                });
                table.wal_lsn = table.wal_lsn.max(entry.lsn);
                if entry.lsn > table.flush_lsn {
                    recovery.push(entry);
                }
            }
        }

        // new entries always go to a fresh file named after the next lsn
        let next_lsn = last_lsn + 1;
        let active = dir.join(Self::file_name(next_lsn));
        if files.last().map(|(lsn, _)| *lsn) != Some(next_lsn) {
            files.push((next_lsn, active.clone()));
        }
        let writer = WalWriter::open(&active, config.wal_sync_strategy)?;

        tracing::info!(
            dir = %dir.display(),
            files = files.len(),
            last_lsn,
            replay = recovery.len(),
            "wal opened"
        );

        Ok(Self {
            dir,
            sync_strategy: config.wal_sync_strategy,
            file_size: config.wal_file_size,
            record_size: config.wal_record_size,
            files,
            writer,
            last_lsn,
            tables,
            recovery,
        })
    }

    /// Entries to replay, in LSN order. Empty after the first call.
    pub fn take_recovery(&mut self) -> Vec<WalEntry> {
        std::mem::take(&mut self.recovery)
    }

    /// Start tracking a table; returns its flushed LSN
    pub fn create_table(&mut self, table_id: &str) -> Result<u64> {
        if let Some(table) = self.tables.get(table_id) {
            return Ok(table.flush_lsn);
        }

        let lsn = self.last_lsn;
        self.tables.insert(
            table_id.to_string(),
            TableLsn {
                flush_lsn: lsn,
                wal_lsn: lsn,
            },
        );
        self.persist_meta()?;

        tracing::debug!(table_id, lsn, "wal tracking table");
        Ok(lsn)
    }

    /// Stop tracking a table
    pub fn drop_table(&mut self, table_id: &str) -> Result<()> {
        if self.tables.remove(table_id).is_some() {
            self.persist_meta()?;
            tracing::debug!(table_id, "wal dropped table");
        }
        Ok(())
    }

    /// Log vectors for `table_id`; returns the LSN of the last record.
    ///
    /// A batch larger than one record is split; each part gets its own LSN.
    pub fn insert(&mut self, table_id: &str, group: &str, ids: &[DocId], data: &VectorData) -> Result<u64> {
        if ids.is_empty() {
            return Ok(self.last_lsn);
        }
        if data.element_count() % ids.len() != 0 {
            return Err(AtlasError::Source(format!(
                "{} elements do not form {} vectors",
                data.element_count(),
                ids.len()
            )));
        }

        let dimension = data.element_count() / ids.len();
        let vector_size = dimension * data.element_width() + std::mem::size_of::<DocId>();
        let per_record = self.per_record(table_id.len() + group.len(), vector_size);

        let mut lsn = self.last_lsn;
        for (chunk, start) in ids.chunks(per_record).zip((0..).step_by(per_record)) {
            let range = start * dimension..(start + chunk.len()) * dimension;
            let operation = match data {
                VectorData::Float(v) => Operation::InsertFloat {
                    group: group.to_string(),
                    ids: chunk.to_vec(),
                    vectors: v[range].to_vec(),
                },
                VectorData::Binary(v) => Operation::InsertBinary {
                    group: group.to_string(),
                    ids: chunk.to_vec(),
                    vectors: v[range].to_vec(),
                },
            };
            lsn = self.append(table_id, operation)?;
        }

        tracing::trace!(table_id, group, rows = ids.len(), lsn, "wal insert");
        Ok(lsn)
    }

    /// Log deletes for `table_id`; returns the LSN of the last record
    pub fn delete_by_id(&mut self, table_id: &str, ids: &[DocId]) -> Result<u64> {
        let per_record = self.per_record(table_id.len(), std::mem::size_of::<DocId>());

        let mut lsn = self.last_lsn;
        for chunk in ids.chunks(per_record) {
            lsn = self.append(table_id, Operation::Delete { ids: chunk.to_vec() })?;
        }

        tracing::trace!(table_id, rows = ids.len(), lsn, "wal delete");
        Ok(lsn)
    }

    /// LSN a flush must reach, or 0 if nothing is pending.
    ///
    /// `None` asks for every table.
    pub fn flush(&self, table_id: Option<&str>) -> u64 {
        match table_id {
            Some(id) => match self.tables.get(id) {
                Some(table) if table.wal_lsn > table.flush_lsn => table.wal_lsn,
                _ => 0,
            },
            None => {
                if self.tables.values().any(|t| t.wal_lsn > t.flush_lsn) {
                    self.last_lsn
                } else {
                    0
                }
            }
        }
    }

    /// Record that `table_id` is on disk up to `lsn`, then prune old files
    pub fn table_flushed(&mut self, table_id: &str, lsn: u64) -> Result<()> {
        let Some(table) = self.tables.get_mut(table_id) else {
            return Ok(());
        };
        if lsn <= table.flush_lsn {
            return Ok(());
        }
        table.flush_lsn = lsn;
        self.persist_meta()?;

        tracing::debug!(table_id, lsn, "table flushed");

        let flushed_lsn = self
            .tables
            .values()
            .map(|t| t.flush_lsn)
            .min()
            .unwrap_or(lsn);
        self.remove_old_files(flushed_lsn)?;
        Ok(())
    }

    /// Delete log files whose entries are all at or below `flushed_lsn`.
    ///
    /// The active file is never removed. Returns how many files went.
    pub fn remove_old_files(&mut self, flushed_lsn: u64) -> Result<usize> {
        let mut removed = 0;

        while self.files.len() > 1 {
            // a file ends right before the next one starts
            let next_first = self.files[1].0;
            if next_first.saturating_sub(1) > flushed_lsn {
                break;
            }

            let (_, path) = self.files.remove(0);
            fs::remove_file(&path)?;
            removed += 1;
            tracing::debug!(path = %path.display(), flushed_lsn, "removed wal file");
        }

        Ok(removed)
    }

    /// Force the active file to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.sync()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// LSN of the last logged entry
    pub fn last_lsn(&self) -> u64 {
        self.last_lsn
    }

    pub fn table_lsn(&self, table_id: &str) -> Option<TableLsn> {
        self.tables.get(table_id).copied()
    }

    /// Log files on disk, active one included
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn append(&mut self, table_id: &str, operation: Operation) -> Result<u64> {
        let lsn = self.last_lsn + 1;

        if self.writer.size() > 0 && self.writer.size() >= self.file_size {
            self.rotate(lsn)?;
        }

        let entry = WalEntry::new(lsn, table_id, operation);
        self.writer.append(&entry)?;
        self.last_lsn = lsn;

        if let Some(table) = self.tables.get_mut(table_id) {
            table.wal_lsn = lsn;
        }
        Ok(lsn)
    }

    /// Seal the active file and start one whose first entry is `next_lsn`
    fn rotate(&mut self, next_lsn: u64) -> Result<()> {
        self.writer.sync()?;

        let path = self.dir.join(Self::file_name(next_lsn));
        self.writer = WalWriter::open(&path, self.sync_strategy)?;
        self.files.push((next_lsn, path));

        tracing::debug!(next_lsn, files = self.files.len(), "wal rotated");
        Ok(())
    }

    /// Vectors of `item_size` bytes that fit in one record
    fn per_record(&self, fixed: usize, item_size: usize) -> usize {
        let room = self.record_size.saturating_sub(fixed + RECORD_OVERHEAD);
        (room / item_size.max(1)).max(1)
    }

    fn persist_meta(&self) -> Result<()> {
        let meta = WalMeta {
            tables: self.tables.clone(),
            applied_lsn: self.last_lsn,
        };
        write_framed(&self.dir.join(Self::META_FILENAME), Self::META_MAGIC, &meta)?;
        Ok(())
    }

    fn file_name(first_lsn: u64) -> String {
        format!("{:020}.{}", first_lsn, Self::EXTENSION)
    }

    /// Log files in `dir`, ordered by first LSN
    fn discover(dir: &Path) -> Result<Vec<(u64, PathBuf)>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(Self::EXTENSION) {
                continue;
            }
            let Some(first_lsn) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok())
            else {
                continue;
            };
            files.push((first_lsn, path));
        }
        files.sort_by_key(|(lsn, _)| *lsn);
        Ok(files)
    }
}
