//! MemTable Module
//!
//! In-memory insert buffers, one [`MemTableFile`] per physical table file.
//!
//! ## Responsibilities
//! - Enforce the per-file memory budget, allowing partial inserts
//! - Soft-delete: erase resident copies, always record a tombstone
//! - Decide at flush whether the file is RAW or TO_INDEX
//! - Roll inserts over to a fresh file once the current one is full
//! - Log every insert/delete to the WAL before buffering it ([`MemManager`])
//!
//! ## Data Flow
//! ```text
//!                  WAL ◀──log── MemManager
//!                                   │
//!   VectorSource ──add──▶ MemTable ──▶ MemTableFile ──▶ SegmentWriter
//!                                           │                 │
//!                                     serialize()        vectors.seg
//!                                           │          deleted_docs.del
//!                                           ▼
//!                                    MetadataStore (RAW / TO_INDEX)
//! ```

mod file;
mod manager;
mod table;

use std::sync::Arc;

use crate::config::Config;
use crate::meta::MetadataStore;
use crate::metrics::Metrics;
use crate::segment::SegmentCache;

pub use file::{flush_file_type, MemTableFile};
pub use manager::MemManager;
pub use table::MemTable;

/// Collaborators shared by every memtable file of an instance
#[derive(Clone)]
pub struct InsertContext {
    pub meta: Arc<dyn MetadataStore>,
    pub cache: Arc<SegmentCache>,
    pub metrics: Arc<Metrics>,
    pub config: Config,
}

impl InsertContext {
    /// Fresh cache and metrics sized from `config`
    pub fn new(meta: Arc<dyn MetadataStore>, config: Config) -> Self {
        Self {
            meta,
            cache: Arc::new(SegmentCache::new(config.cache_capacity)),
            metrics: Arc::new(Metrics::new()),
            config,
        }
    }
}
