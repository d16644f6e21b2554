//! Configuration for AtlasVec
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Byte width of one floating-point vector element
pub const FLOAT_TYPE_SIZE: usize = std::mem::size_of::<f32>();

/// Byte width of one binary vector element
pub const BINARY_TYPE_SIZE: usize = std::mem::size_of::<u8>();

/// Default memory budget of a single memtable file (128 MB)
pub const MAX_TABLE_FILE_MEM: usize = 128 * 1024 * 1024;

/// Default size at which a flushed file becomes an index-build candidate (1 GB)
pub const DEFAULT_INDEX_FILE_SIZE: u64 = 1024 * 1024 * 1024;

/// Default size after which the WAL starts a new log file (64 MB)
pub const DEFAULT_WAL_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Default upper bound on one WAL record's payload (4 MB)
pub const DEFAULT_WAL_RECORD_SIZE: usize = 4 * 1024 * 1024;

/// Main configuration for an AtlasVec instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── meta.bin                         (table + file catalog)
    ///     ├── tables/{table_id}/{file_id}/     (one segment per table file)
    ///     └── wal/                             (write-ahead log files + wal.meta)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// When to fsync the WAL
    pub wal_sync_strategy: WalSyncStrategy,

    /// Size at which the active log file is rotated (in bytes)
    pub wal_file_size: u64,

    /// Max payload of one log record; larger batches are split (in bytes)
    pub wal_record_size: usize,

    /// Keep going past a corrupted log file during recovery instead of failing
    pub wal_recovery_error_ignore: bool,

    // -------------------------------------------------------------------------
    // Insert Buffer Configuration
    // -------------------------------------------------------------------------
    /// Memory budget of one memtable file (in bytes)
    pub max_table_file_mem: usize,

    /// Load freshly flushed segments into the read cache
    pub insert_cache_immediately: bool,

    // -------------------------------------------------------------------------
    // Cache Configuration
    // -------------------------------------------------------------------------
    /// Capacity of the segment read cache (in bytes)
    pub cache_capacity: usize,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./atlasvec_data"),
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            wal_file_size: DEFAULT_WAL_FILE_SIZE,
            wal_record_size: DEFAULT_WAL_RECORD_SIZE,
            wal_recovery_error_ignore: false,
            max_table_file_mem: MAX_TABLE_FILE_MEM,
            insert_cache_immediately: false,
            cache_capacity: 1024 * 1024 * 1024, // 1 GB
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the WAL file rotation size (in bytes)
    pub fn wal_file_size(mut self, size: u64) -> Self {
        self.config.wal_file_size = size;
        self
    }

    /// Set the max payload of one WAL record (in bytes)
    pub fn wal_record_size(mut self, size: usize) -> Self {
        self.config.wal_record_size = size;
        self
    }

    /// Skip corrupted WAL files during recovery
    pub fn wal_recovery_error_ignore(mut self, enabled: bool) -> Self {
        self.config.wal_recovery_error_ignore = enabled;
        self
    }

    /// Set the memory budget of one memtable file (in bytes)
    pub fn max_table_file_mem(mut self, size: usize) -> Self {
        self.config.max_table_file_mem = size;
        self
    }

    /// Warm the read cache right after each flush
    pub fn insert_cache_immediately(mut self, enabled: bool) -> Self {
        self.config.insert_cache_immediately = enabled;
        self
    }

    /// Set the segment cache capacity (in bytes)
    pub fn cache_capacity(mut self, size: usize) -> Self {
        self.config.cache_capacity = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
