//! Vector Sources
//!
//! Producers of vectors for a memtable file. A source is drained across one
//! or more bounded `add` calls; each call copies at most `max_count` vectors
//! into a segment writer and reports how many it actually copied.

use crate::config::{BINARY_TYPE_SIZE, FLOAT_TYPE_SIZE};
use crate::error::{AtlasError, Result};
use crate::meta::TableFileSchema;
use crate::segment::{DocId, SegmentWriter, DEFAULT_VECTOR_GROUP};

/// A batch of vectors waiting to be buffered
pub trait VectorSource {
    /// Bytes one vector of `dimension` occupies in the writer
    fn single_vector_size(&self, dimension: usize) -> usize;

    /// Copy up to `max_count` vectors into `writer`; returns the number copied.
    ///
    /// Fewer than `max_count` is not an error: the source may run dry.
    fn add(&mut self, writer: &mut SegmentWriter, schema: &TableFileSchema, max_count: usize) -> Result<usize>;

    /// Vectors not yet copied
    fn remaining(&self) -> usize;

    fn all_added(&self) -> bool {
        self.remaining() == 0
    }
}

/// Raw vector payload of a [`VectorBatch`]
#[derive(Debug, Clone, PartialEq)]
pub enum VectorData {
    /// `dimension` f32 values per vector
    Float(Vec<f32>),
    /// `dimension` bytes per vector
    Binary(Vec<u8>),
}

impl VectorData {
    /// Bytes per element
    pub fn element_width(&self) -> usize {
        match self {
            VectorData::Float(_) => FLOAT_TYPE_SIZE,
            VectorData::Binary(_) => BINARY_TYPE_SIZE,
        }
    }

    /// Elements across all vectors
    pub fn element_count(&self) -> usize {
        match self {
            VectorData::Float(v) => v.len(),
            VectorData::Binary(v) => v.len(),
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, VectorData::Binary(_))
    }

    /// Little-endian bytes of elements `[start, end)`
    fn encode(&self, start: usize, end: usize) -> Vec<u8> {
        match self {
            VectorData::Float(v) => v[start..end].iter().flat_map(|f| f.to_le_bytes()).collect(),
            VectorData::Binary(v) => v[start..end].to_vec(),
        }
    }
}

/// In-memory [`VectorSource`] over caller-supplied ids and vectors
#[derive(Debug, Clone)]
pub struct VectorBatch {
    ids: Vec<DocId>,
    data: VectorData,
    group: String,
    /// Vectors already copied out
    added: usize,
}

impl VectorBatch {
    /// Float vectors, flattened row-major
    pub fn float(ids: Vec<DocId>, data: Vec<f32>) -> Self {
        Self::new(ids, VectorData::Float(data))
    }

    /// Binary vectors, flattened row-major
    pub fn binary(ids: Vec<DocId>, data: Vec<u8>) -> Self {
        Self::new(ids, VectorData::Binary(data))
    }

    pub fn new(ids: Vec<DocId>, data: VectorData) -> Self {
        Self {
            ids,
            data,
            group: DEFAULT_VECTOR_GROUP.to_string(),
            added: 0,
        }
    }

    /// Write into a named group instead of the default one
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Vectors copied out so far
    pub fn added_count(&self) -> usize {
        self.added
    }

    pub fn ids(&self) -> &[DocId] {
        &self.ids
    }

    pub fn data(&self) -> &VectorData {
        &self.data
    }

    /// Target vector group
    pub fn group(&self) -> &str {
        &self.group
    }
}

impl VectorSource for VectorBatch {
    fn single_vector_size(&self, dimension: usize) -> usize {
        dimension * self.data.element_width()
    }

    fn add(&mut self, writer: &mut SegmentWriter, schema: &TableFileSchema, max_count: usize) -> Result<usize> {
        if schema.dimension <= 0 {
            return Err(AtlasError::Source(format!(
                "invalid dimension {} for table {}",
                schema.dimension, schema.table_id
            )));
        }
        let dimension = schema.dimension as usize;

        if schema.metric_type.is_binary() != self.data.is_binary() {
            return Err(AtlasError::Source(format!(
                "metric {:?} of table {} does not accept {} vectors",
                schema.metric_type,
                schema.table_id,
                if self.data.is_binary() { "binary" } else { "float" }
            )));
        }

        if self.data.element_count() != self.ids.len() * dimension {
            return Err(AtlasError::Source(format!(
                "{} elements do not form {} vectors of dimension {}",
                self.data.element_count(),
                self.ids.len(),
                dimension
            )));
        }

        let count = max_count.min(self.remaining());
        if count == 0 {
            return Ok(0);
        }

        let start = self.added;
        let end = start + count;
        let bytes = self.data.encode(start * dimension, end * dimension);

        writer.add_vectors(
            &self.group,
            dimension,
            self.data.element_width(),
            &self.ids[start..end],
            &bytes,
        )?;

        self.added = end;
        Ok(count)
    }

    fn remaining(&self) -> usize {
        self.ids.len() - self.added
    }
}
