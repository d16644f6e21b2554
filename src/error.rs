//! Error types for AtlasVec
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using AtlasError
pub type Result<T> = std::result::Result<T, AtlasError>;

/// Unified error type for AtlasVec operations
#[derive(Debug, Error)]
pub enum AtlasError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Configuration / Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    /// The memtable file never got a schema row, so it has no segment writer
    #[error("Table file not registered: {0}")]
    Unregistered(String),

    /// The memtable file was already serialized
    #[error("Table file already serialized: {0}")]
    Sealed(String),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL error: {0}")]
    Wal(String),

    // -------------------------------------------------------------------------
    // Metadata Errors
    // -------------------------------------------------------------------------
    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table file not found: {0}")]
    FileNotFound(String),

    // -------------------------------------------------------------------------
    // Segment Errors
    // -------------------------------------------------------------------------
    #[error("Segment error: {0}")]
    Segment(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Vector Source Errors
    // -------------------------------------------------------------------------
    #[error("Vector source error: {0}")]
    Source(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),
}
