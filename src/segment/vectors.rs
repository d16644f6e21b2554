//! Vector groups
//!
//! Contiguous vector bytes plus the doc ids that own them, in insertion order.

use serde::{Deserialize, Serialize};

use crate::error::{AtlasError, Result};

use super::{DeletedDocs, DocId};

/// One named group of equally sized vectors
///
/// `uids[i]` owns bytes `[i * code_length, (i + 1) * code_length)` of `data`,
/// where `code_length = dimension * element_width`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorGroup {
    dimension: usize,
    element_width: usize,
    data: Vec<u8>,
    uids: Vec<DocId>,
}

impl VectorGroup {
    pub fn new(dimension: usize, element_width: usize) -> Self {
        Self {
            dimension,
            element_width,
            data: Vec::new(),
            uids: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn element_width(&self) -> usize {
        self.element_width
    }

    /// Doc ids in insertion order, parallel to the stored vectors
    pub fn uids(&self) -> &[DocId] {
        &self.uids
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Bytes of the vector at `offset`
    pub fn vector(&self, offset: usize) -> Option<&[u8]> {
        let code_length = self.code_length();
        let start = offset.checked_mul(code_length)?;
        self.data.get(start..start + code_length)
    }

    pub fn len(&self) -> usize {
        self.uids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uids.is_empty()
    }

    /// Approximate resident size: vector bytes plus ids
    pub fn byte_size(&self) -> usize {
        self.data.len() + self.uids.len() * std::mem::size_of::<DocId>()
    }

    /// Append vectors; `data` must hold exactly one code per id
    pub fn append(&mut self, uids: &[DocId], data: &[u8]) -> Result<()> {
        let expected = uids.len() * self.code_length();
        if data.len() != expected {
            return Err(AtlasError::Segment(format!(
                "vector data is {} bytes, expected {} for {} ids of dimension {}",
                data.len(),
                expected,
                uids.len(),
                self.dimension
            )));
        }

        self.uids.extend_from_slice(uids);
        self.data.extend_from_slice(data);
        Ok(())
    }

    /// Remove the vector at `offset` in place.
    ///
    /// The erased range is `dimension * element_width` bytes. An offset past
    /// the end is ignored.
    pub fn erase(&mut self, offset: usize, element_width: usize) {
        if offset >= self.uids.len() {
            return;
        }

        let code_length = self.dimension * element_width;
        let start = offset * code_length;
        let end = (start + code_length).min(self.data.len());
        if start < end {
            self.data.drain(start..end);
        }
        self.uids.remove(offset);
    }

    /// Drop every vector whose id is in the ledger; returns how many went.
    pub(crate) fn retain_live(&mut self, deleted: &DeletedDocs) -> usize {
        if deleted.is_empty() {
            return 0;
        }

        let code_length = self.code_length();
        let mut uids = Vec::with_capacity(self.uids.len());
        let mut data = Vec::with_capacity(self.data.len());

        for (i, uid) in self.uids.iter().enumerate() {
            if deleted.contains(*uid) {
                continue;
            }
            if let Some(bytes) = self.data.get(i * code_length..(i + 1) * code_length) {
                uids.push(*uid);
                data.extend_from_slice(bytes);
            }
        }

        let removed = self.uids.len() - uids.len();
        self.uids = uids;
        self.data = data;
        removed
    }

    fn code_length(&self) -> usize {
        self.dimension * self.element_width
    }
}
