//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries.

use serde::{Deserialize, Serialize};

use crate::error::{AtlasError, Result};
use crate::meta::now_millis;
use crate::segment::DocId;

/// Entry header: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// Table the operation belongs to
    pub table_id: String,

    /// The operation to replay
    pub operation: Operation,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Float vectors, flattened row-major
    InsertFloat {
        group: String,
        ids: Vec<DocId>,
        vectors: Vec<f32>,
    },

    /// Binary vectors, flattened row-major
    InsertBinary {
        group: String,
        ids: Vec<DocId>,
        vectors: Vec<u8>,
    },

    /// Delete by doc id
    Delete { ids: Vec<DocId> },
}

impl Operation {
    pub fn ids(&self) -> &[DocId] {
        match self {
            Operation::InsertFloat { ids, .. }
            | Operation::InsertBinary { ids, .. }
            | Operation::Delete { ids } => ids,
        }
    }
}

impl WalEntry {
    pub fn new(lsn: u64, table_id: impl Into<String>, operation: Operation) -> Self {
        Self {
            lsn,
            table_id: table_id.into(),
            operation,
            timestamp: now_millis(),
        }
    }

    /// Header + payload bytes as they go on disk
    pub fn encode(&self) -> Result<Vec<u8>> {
        let data = bincode::serialize(self)
            .map_err(|e| AtlasError::Serialization(format!("wal entry {}: {}", self.lsn, e)))?;
        let len = u32::try_from(data.len())
            .map_err(|_| AtlasError::Wal(format!("wal entry {} is {} bytes", self.lsn, data.len())))?;

        let mut bytes = Vec::with_capacity(HEADER_SIZE + data.len());
        bytes.extend_from_slice(&self.lsn.to_le_bytes());
        bytes.extend_from_slice(&Self::compute_crc(&data).to_le_bytes());
        bytes.extend_from_slice(&len.to_le_bytes());
        bytes.extend_from_slice(&data);
        Ok(bytes)
    }

    /// Rebuild an entry from its header fields and payload.
    ///
    /// Fails with `Corruption` if the checksum or the LSN disagree.
    pub fn decode(lsn: u64, crc: u32, data: &[u8]) -> Result<Self> {
        if Self::compute_crc(data) != crc {
            return Err(AtlasError::Corruption(format!("wal entry {}: checksum mismatch", lsn)));
        }

        let entry: WalEntry = bincode::deserialize(data)
            .map_err(|e| AtlasError::Corruption(format!("wal entry {}: {}", lsn, e)))?;
        if entry.lsn != lsn {
            return Err(AtlasError::Corruption(format!(
                "wal entry header lsn {} does not match payload lsn {}",
                lsn, entry.lsn
            )));
        }

        Ok(entry)
    }

    pub fn compute_crc(data: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(data);
        hasher.finalize()
    }
}
