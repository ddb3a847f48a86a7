//! Error types for EmberKV
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::index::IndexError;

/// Result type alias using EmberError
pub type Result<T> = std::result::Result<T, EmberError>;

/// Unified error type for EmberKV operations
#[derive(Debug, Error)]
pub enum EmberError {
    // -------------------------------------------------------------------------
    // Transaction Errors
    // -------------------------------------------------------------------------
    #[error("Transaction is closed")]
    TxClosed,

    #[error("Transaction is read-only")]
    TxReadOnly,

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Not found bucket: {bucket}, key: {key}")]
    BucketOrKeyNotFound { bucket: String, key: String },

    #[error("Key not found")]
    NotFoundKey,

    #[error("Range scan failed: {0}")]
    RangeScan(#[source] ScanError),

    #[error("Prefix scan failed: {0}")]
    PrefixScan(#[source] ScanError),

    #[error("Key cannot be empty")]
    EmptyKey,

    // -------------------------------------------------------------------------
    // Segment Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Segment {file_id} ({}) unreadable: {source}", .path.display())]
    SegmentIo {
        file_id: u64,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Decode error in segment {file_id} at offset {offset}{}: {reason}", key_suffix(.key))]
    Decode {
        file_id: u64,
        offset: u64,
        key: Option<String>,
        reason: String,
    },

    #[error("Record of {size} bytes exceeds segment size {limit}")]
    RecordTooLarge { size: u64, limit: u64 },

    #[error("Index holds no resident entry for key {key}")]
    MissingResident { key: String },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Why a range or prefix scan produced no result set
#[derive(Debug, Error)]
pub enum ScanError {
    /// Nothing live matched after tombstone/expiration filtering
    #[error("no live records matched")]
    Empty,

    /// The bucket index rejected the query
    #[error(transparent)]
    Index(#[from] IndexError),
}

impl EmberError {
    /// Attach the index key to a decode error that was raised without one
    pub fn with_key(self, key: &[u8]) -> Self {
        match self {
            EmberError::Decode {
                file_id,
                offset,
                key: None,
                reason,
            } => EmberError::Decode {
                file_id,
                offset,
                key: Some(String::from_utf8_lossy(key).into_owned()),
                reason,
            },
            other => other,
        }
    }

    /// True for the absence class (`NotFoundKey` / `BucketOrKeyNotFound`)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EmberError::NotFoundKey | EmberError::BucketOrKeyNotFound { .. }
        )
    }
}

impl From<bincode::Error> for EmberError {
    fn from(e: bincode::Error) -> Self {
        EmberError::Serialization(e.to_string())
    }
}

fn key_suffix(key: &Option<String>) -> String {
    match key {
        Some(k) => format!(" (key {})", k),
        None => String::new(),
    }
}
