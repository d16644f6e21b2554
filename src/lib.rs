//! # AtlasVec
//!
//! The insert buffer of a vector storage engine:
//! - Memory-budgeted memtable files with partial-insert semantics
//! - Soft deletes: best-effort in-memory erase plus an authoritative ledger
//! - Flush-time decision between RAW files and TO_INDEX candidates
//! - File-backed metadata catalog and checksummed segment files
//! - Write-ahead log replayed on open, pruned as tables flush
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       MemManager                             │──▶ WAL
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        MemTable                              │
//! │            (one per table, owns a list of files)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      MemTableFile                            │
//! │        (budget, delete, RAW / TO_INDEX at serialize)         │
//! └───────┬─────────────────────┬────────────────────┬──────────┘
//!         │                     │                    │
//!         ▼                     ▼                    ▼
//!  ┌─────────────┐      ┌──────────────┐     ┌──────────────┐
//!  │VectorSource │      │SegmentWriter │     │MetadataStore │
//!  │  (batches)  │      │(vectors+del) │     │  (meta.bin)  │
//!  └─────────────┘      └──────┬───────┘     └──────────────┘
//!                              │
//!                              ▼
//!                       ┌──────────────┐
//!                       │ SegmentCache │
//!                       │    (LRU)     │
//!                       └──────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

mod format;
pub mod meta;
pub mod segment;
pub mod source;
pub mod metrics;
pub mod wal;
pub mod memtable;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{AtlasError, Result};
pub use config::Config;
pub use memtable::{InsertContext, MemManager, MemTable, MemTableFile};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of AtlasVec
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
