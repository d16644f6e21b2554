//! Framed file format
//!
//! Every file AtlasVec writes (segment vectors, deletion ledgers, the
//! metadata catalog) shares one envelope around a bincode payload.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                       │
//! │   Magic (4) | Version: u16 (2) | BodyLen: u64 (8)       │
//! ├─────────────────────────────────────────────────────────┤
//! │ Body (BodyLen bytes, bincode)                           │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (4 bytes)                                        │
//! │   BodyCRC: u32                                          │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes go to a sibling `.tmp` file that is fsynced and then renamed over
//! the target, so readers only ever see a complete file.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{AtlasError, Result};

/// Current envelope version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + BodyLen (8) = 14 bytes
pub(crate) const HEADER_SIZE: usize = 14;

/// Footer size: BodyCRC (4)
pub(crate) const FOOTER_SIZE: usize = 4;

/// Serialize `value` and atomically replace `path` with it.
///
/// Returns the size of the written file in bytes.
pub(crate) fn write_framed<T: Serialize>(path: &Path, magic: &[u8; 4], value: &T) -> Result<u64> {
    let body = bincode::serialize(value)
        .map_err(|e| AtlasError::Serialization(format!("{}: {}", path.display(), e)))?;

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&body);
    let crc = hasher.finalize();

    let tmp_path = temp_path(path);
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp_path)?;
    let mut writer = BufWriter::new(file);

    writer.write_all(magic)?;
    writer.write_all(&VERSION.to_le_bytes())?;
    writer.write_all(&(body.len() as u64).to_le_bytes())?;
    writer.write_all(&body)?;
    writer.write_all(&crc.to_le_bytes())?;
    writer.flush()?;

    let file = writer
        .into_inner()
        .map_err(|e| AtlasError::Io(e.into_error()))?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)?;

    Ok((HEADER_SIZE + body.len() + FOOTER_SIZE) as u64)
}

/// Read and verify a framed file written by [`write_framed`].
pub(crate) fn read_framed<T: DeserializeOwned>(path: &Path, magic: &[u8; 4]) -> Result<T> {
    let mut file = File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
        return Err(AtlasError::Corruption(format!(
            "{}: file too short ({} bytes)",
            path.display(),
            bytes.len()
        )));
    }

    if &bytes[0..4] != magic {
        return Err(AtlasError::Corruption(format!(
            "{}: invalid magic, expected {:?}, got {:?}",
            path.display(),
            magic,
            &bytes[0..4]
        )));
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != VERSION {
        return Err(AtlasError::Corruption(format!(
            "{}: unsupported version {}",
            path.display(),
            version
        )));
    }

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&bytes[6..14]);
    let body_len = u64::from_le_bytes(len_bytes);

    let expected_len = usize::try_from(body_len)
        .ok()
        .and_then(|n| n.checked_add(HEADER_SIZE))
        .and_then(|n| n.checked_add(FOOTER_SIZE));
    let body_len = match expected_len {
        Some(total) if total == bytes.len() => total - HEADER_SIZE - FOOTER_SIZE,
        _ => {
            return Err(AtlasError::Corruption(format!(
                "{}: body length {} does not match file size {}",
                path.display(),
                body_len,
                bytes.len()
            )));
        }
    };

    let body = &bytes[HEADER_SIZE..HEADER_SIZE + body_len];
    let mut crc_bytes = [0u8; 4];
    crc_bytes.copy_from_slice(&bytes[HEADER_SIZE + body_len..]);
    let expected_crc = u32::from_le_bytes(crc_bytes);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(body);
    if hasher.finalize() != expected_crc {
        return Err(AtlasError::Corruption(format!(
            "{}: checksum mismatch",
            path.display()
        )));
    }

    bincode::deserialize(body)
        .map_err(|e| AtlasError::Serialization(format!("{}: {}", path.display(), e)))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
