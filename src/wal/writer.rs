//! WAL Writer
//!
//! Handles appending entries to one WAL file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{AtlasError, Result};

use super::WalEntry;

/// Appends entries to a WAL file
///
/// Every append reaches the OS before returning; fsync follows the
/// configured [`WalSyncStrategy`].
pub struct WalWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    sync_strategy: WalSyncStrategy,

    /// Entries appended since the last fsync
    unsynced: usize,

    /// Bytes in the file
    size: u64,

    /// LSN of the last entry this writer appended (0 if none)
    current_lsn: u64,
}

impl WalWriter {
    /// Open or create a WAL file, appending at its end
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            sync_strategy,
            unsynced: 0,
            size,
            current_lsn: 0,
        })
    }

    /// Append an entry; returns its LSN
    pub fn append(&mut self, entry: &WalEntry) -> Result<u64> {
        if entry.lsn <= self.current_lsn {
            return Err(AtlasError::Wal(format!(
                "lsn {} is not after {} in {}",
                entry.lsn,
                self.current_lsn,
                self.path.display()
            )));
        }

        let bytes = entry.encode()?;
        self.writer.write_all(&bytes)?;
        self.writer.flush()?;

        self.size += bytes.len() as u64;
        self.current_lsn = entry.lsn;
        self.unsynced += 1;

        let due = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced >= count.max(1),
        };
        if due {
            self.sync()?;
        }

        Ok(entry.lsn)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Get the current LSN
    pub fn current_lsn(&self) -> u64 {
        self.current_lsn
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
