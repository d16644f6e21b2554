//! Metadata Module
//!
//! Schema rows for tables and their physical files.
//!
//! ## File State Machine (as written by the insert path)
//! ```text
//!   create_table_file            serialize
//!  ─────────────────▶  RAW  ──────────────────▶  TO_INDEX   (size ≥ index_file_size,
//!                       │                                    non-idmap engine)
//!                       └─────────────────────▶  RAW        (otherwise)
//! ```
//! The remaining [`FileType`] states belong to the indexer and the merger.

mod schema;
mod store;

pub(crate) use schema::now_millis;
pub use schema::{EngineType, FileType, MetricType, TableFileSchema, TableSchema};
pub use store::{FileMetaStore, MetadataStore};
