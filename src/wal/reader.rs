//! WAL Reader
//!
//! Handles reading entries from one WAL file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

use crate::error::{AtlasError, Result};

use super::{WalEntry, HEADER_SIZE};

/// Largest payload accepted from disk; anything bigger is a corrupt length
const MAX_ENTRY_SIZE: usize = 1024 * 1024 * 1024;

/// Reads entries from a WAL file
pub struct WalReader {
    path: PathBuf,
    reader: BufReader<File>,

    /// Offset just past the last entry read successfully
    position: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            position: 0,
        })
    }

    /// Read the next entry from the WAL
    ///
    /// Returns `Ok(None)` at a clean end of file. A torn or damaged entry is
    /// a `Corruption` error; [`position`](Self::position) still points at the
    /// end of the last good entry.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        let mut header = [0u8; HEADER_SIZE];
        match self.read_full(&mut header)? {
            0 => return Ok(None),
            n if n < HEADER_SIZE => {
                return Err(self.corruption(format!("torn header ({} of {} bytes)", n, HEADER_SIZE)));
            }
            _ => {}
        }

        let mut lsn_bytes = [0u8; 8];
        lsn_bytes.copy_from_slice(&header[0..8]);
        let mut crc_bytes = [0u8; 4];
        crc_bytes.copy_from_slice(&header[8..12]);
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&header[12..16]);

        let lsn = u64::from_le_bytes(lsn_bytes);
        let crc = u32::from_le_bytes(crc_bytes);
        let len = u32::from_le_bytes(len_bytes) as usize;

        if len > MAX_ENTRY_SIZE {
            return Err(self.corruption(format!("entry {} claims {} bytes", lsn, len)));
        }

        let mut data = vec![0u8; len];
        let read = self.read_full(&mut data)?;
        if read < len {
            return Err(self.corruption(format!("torn entry {} ({} of {} bytes)", lsn, read, len)));
        }

        let entry = WalEntry::decode(lsn, crc, &data)
            .map_err(|e| self.corruption(e.to_string()))?;

        self.position += (HEADER_SIZE + len) as u64;
        Ok(Some(entry))
    }

    /// Iterate over all valid entries
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }

    /// Offset just past the last entry read successfully
    pub fn position(&self) -> u64 {
        self.position
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Fill `buf` as far as the file allows; returns bytes read
    fn read_full(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }

    fn corruption(&self, detail: String) -> AtlasError {
        AtlasError::Corruption(format!("{} at offset {}: {}", self.path.display(), self.position, detail))
    }
}

/// Iterator over WAL entries
///
/// Stops after the first error.
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
