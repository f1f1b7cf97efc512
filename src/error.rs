//! Error types for logkv
//!
//! Provides a unified error type for all operations. A missing key is not an
//! error: lookups return `Ok(None)`.

use thiserror::Error;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for logkv operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Frame Errors
    // -------------------------------------------------------------------------
    /// The frame header declares more bytes than the buffer holds
    #[error("Corrupt frame: header declares {needed} bytes, only {available} available")]
    CorruptFrame { needed: u64, available: u64 },

    /// The serialized frame would not fit a 32-bit location size
    #[error("Entry too large: key {key_len} bytes, value {value_len} bytes")]
    EntryTooLarge { key_len: usize, value_len: usize },

    // -------------------------------------------------------------------------
    // Index Errors
    // -------------------------------------------------------------------------
    #[error("Index '{0}' does not support ordered scans")]
    Unordered(&'static str),

    // -------------------------------------------------------------------------
    // Recovery Errors
    // -------------------------------------------------------------------------
    #[error("Recovery failed at offset {offset}: {source}")]
    Recovery {
        offset: u64,
        #[source]
        source: Box<KvError>,
    },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Shell Errors
    // -------------------------------------------------------------------------
    #[error("{0}")]
    Shell(String),
}

impl KvError {
    /// True if this error (or the error it wraps) is a corrupt frame
    pub fn is_corrupt_frame(&self) -> bool {
        match self {
            KvError::CorruptFrame { .. } => true,
            KvError::Recovery { source, .. } => source.is_corrupt_frame(),
            _ => false,
        }
    }
}
