//! Write-Ahead Log (WAL) Module
//!
//! Makes buffered inserts and deletes survive a crash before flush.
//!
//! ## Responsibilities
//! - Append insert/delete records before they reach a memtable
//! - CRC32 checksums for corruption detection
//! - Log Sequence Numbers (LSN) for ordering
//! - Per-table flushed LSN, so replay skips what is already on disk
//! - Rotate log files and remove the ones every table has flushed past
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Entry 1                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Entry 2                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Log files live in `{data_dir}/wal/` and are named after the LSN of their
//! first entry (`{lsn:020}.wal`), so name order is log order.

mod entry;
mod manager;
mod reader;
mod recovery;
mod writer;

pub use entry::{Operation, WalEntry, HEADER_SIZE};
pub use manager::{TableLsn, WalManager};
pub use reader::{WalIterator, WalReader};
pub use recovery::{RecoveryResult, WalRecovery};
pub use writer::WalWriter;
