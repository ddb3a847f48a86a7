//! Index Module
//!
//! Per-bucket ordered index mapping key → record pointer.
//!
//! ## Query Contract
//! - `find`: exact match, `KeyNotFound` if absent (no liveness filtering)
//! - `range`: every indexed key in `[start, end]`, ascending; `InvalidRange`
//!   if `start > end`
//! - `prefix_scan`: every key sharing `prefix`, ascending, with `limit` used
//!   only as a hint (see `RecordIndex::prefix_scan`)
//!
//! ## Data Structure Choice
//! BTreeMap keyed by raw key bytes:
//! - Lexicographic order for free (range and prefix scans)
//! - Pointers are replaced, never mutated, on update/delete

mod table;

use thiserror::Error;

pub use table::RecordIndex;

/// Errors reported by a bucket index
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("key not found in index")]
    KeyNotFound,

    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange { start: String, end: String },
}

/// Result cap for scans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanLimit {
    /// Return every live match
    NoLimit,

    /// Return at most this many live matches
    Max(usize),
}

impl ScanLimit {
    /// True once `count` results satisfy the cap
    pub fn is_reached(&self, count: usize) -> bool {
        match self {
            ScanLimit::NoLimit => false,
            ScanLimit::Max(max) => count >= *max,
        }
    }
}

impl From<usize> for ScanLimit {
    fn from(max: usize) -> Self {
        ScanLimit::Max(max)
    }
}
