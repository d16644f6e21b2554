//! Table and table-file descriptors

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{BINARY_TYPE_SIZE, DEFAULT_INDEX_FILE_SIZE, FLOAT_TYPE_SIZE};

/// Lifecycle state of one physical table file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    New,
    /// Flushed, unindexed
    Raw,
    /// Flushed and large enough for a background index build
    ToIndex,
    Index,
    ToDelete,
    NewMerge,
    NewIndex,
    Backup,
}

/// Storage/index engine of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineType {
    FaissIdmap,
    FaissIvfFlat,
    FaissIvfSq8,
    FaissIvfSq8H,
    FaissIvfPq,
    NsgMix,
    Hnsw,
    FaissBinIdmap,
    FaissBinIvfFlat,
}

impl EngineType {
    /// Flat (brute-force) engines never need an index build
    pub fn is_idmap(self) -> bool {
        matches!(self, EngineType::FaissIdmap | EngineType::FaissBinIdmap)
    }
}

/// Distance metric of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricType {
    L2,
    Ip,
    Hamming,
    Jaccard,
    Tanimoto,
    Substructure,
    Superstructure,
}

impl MetricType {
    /// Binary metrics operate on byte-encoded vectors
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            MetricType::Hamming
                | MetricType::Jaccard
                | MetricType::Tanimoto
                | MetricType::Substructure
                | MetricType::Superstructure
        )
    }

    /// Byte width of one vector element under this metric
    pub fn element_width(self) -> usize {
        if self.is_binary() {
            BINARY_TYPE_SIZE
        } else {
            FLOAT_TYPE_SIZE
        }
    }
}

/// Logical table row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_id: String,
    pub dimension: i32,
    pub engine_type: EngineType,
    pub metric_type: MetricType,
    /// Flushed files at least this large (bytes) become `ToIndex`
    pub index_file_size: u64,
    pub nlist: u32,
    /// Unix millis
    pub created_on: u64,
}

impl TableSchema {
    /// A float table with the default index threshold
    pub fn new(table_id: impl Into<String>, dimension: i32) -> Self {
        Self {
            table_id: table_id.into(),
            dimension,
            engine_type: EngineType::FaissIdmap,
            metric_type: MetricType::L2,
            index_file_size: DEFAULT_INDEX_FILE_SIZE,
            nlist: 16384,
            created_on: 0,
        }
    }

    pub fn with_engine_type(mut self, engine_type: EngineType) -> Self {
        self.engine_type = engine_type;
        self
    }

    pub fn with_metric_type(mut self, metric_type: MetricType) -> Self {
        self.metric_type = metric_type;
        self
    }

    pub fn with_index_file_size(mut self, index_file_size: u64) -> Self {
        self.index_file_size = index_file_size;
        self
    }

    pub fn with_nlist(mut self, nlist: u32) -> Self {
        self.nlist = nlist;
        self
    }
}

/// Descriptor of one physical table file
///
/// Identity and location fields (`id`, `file_id`, `directory`) are assigned
/// by the metadata store; the table-level fields are copied from the owning
/// [`TableSchema`] when the row is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableFileSchema {
    pub id: u64,
    pub table_id: String,
    pub file_id: String,
    pub file_type: FileType,
    /// Physical size on disk after flush
    pub file_size: u64,
    pub row_count: u64,
    pub dimension: i32,
    pub engine_type: EngineType,
    pub metric_type: MetricType,
    pub index_file_size: u64,
    pub nlist: u32,
    pub directory: PathBuf,
    /// Unix millis
    pub created_on: u64,
    /// Unix millis
    pub updated_time: u64,
}

impl TableFileSchema {
    /// A registration request for a new file of `table_id`
    pub fn request(table_id: impl Into<String>) -> Self {
        Self {
            id: 0,
            table_id: table_id.into(),
            file_id: String::new(),
            file_type: FileType::Raw,
            file_size: 0,
            row_count: 0,
            dimension: 0,
            engine_type: EngineType::FaissIdmap,
            metric_type: MetricType::L2,
            index_file_size: DEFAULT_INDEX_FILE_SIZE,
            nlist: 0,
            directory: PathBuf::new(),
            created_on: 0,
            updated_time: 0,
        }
    }
}

/// Unix time in milliseconds
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
