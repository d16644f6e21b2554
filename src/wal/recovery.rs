//! WAL Recovery
//!
//! Reads back one WAL file after a crash.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::{AtlasError, Result};

use super::{WalEntry, WalReader};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted entries skipped
    pub entries_corrupted: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Whether the WAL was truncated (partial writes removed)
    pub was_truncated: bool,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read all valid entries
    /// 2. Stop at the first damaged entry (torn write, bad checksum, LSN going backwards)
    /// 3. Truncate the file to the last good entry
    /// 4. Return all valid entries in order
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let (entries, mut result, valid_len) = Self::scan(path)?;

        if result.entries_corrupted > 0 {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_len)?;
            file.sync_all()?;
            result.was_truncated = true;

            tracing::warn!(
                path = %path.display(),
                valid_len,
                recovered = result.entries_recovered,
                "truncated damaged wal tail"
            );
        }

        Ok((entries, result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let (_, result, _) = Self::scan(path)?;
        Ok(result)
    }

    fn scan(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult, u64)> {
        let mut reader = WalReader::open(path)?;
        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();
        let mut valid_len = 0;

        loop {
            match reader.next_entry() {
                Ok(Some(entry)) if entry.lsn > result.last_lsn => {
                    result.last_lsn = entry.lsn;
                    result.entries_recovered += 1;
                    valid_len = reader.position();
                    entries.push(entry);
                }
                Ok(Some(entry)) => {
                    tracing::warn!(path = %path.display(), lsn = entry.lsn, last_lsn = result.last_lsn, "wal lsn went backwards");
                    result.entries_corrupted += 1;
                    break;
                }
                Ok(None) => break,
                Err(AtlasError::Corruption(detail)) => {
                    tracing::warn!(path = %path.display(), %detail, "damaged wal entry");
                    result.entries_corrupted += 1;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok((entries, result, valid_len))
    }
}
