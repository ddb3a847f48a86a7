//! Record pointers: the value type held by a bucket index.

use super::{Entry, Meta};

/// Where a serialized record lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub file_id: u64,
    pub offset: u64,
}

impl Location {
    pub fn new(file_id: u64, offset: u64) -> Self {
        Self { file_id, offset }
    }
}

/// Index value: metadata, segment location, and (cached mode) the entry itself
///
/// Only one of `entry` / `location` is trusted, depending on the storage
/// mode the database runs in. Pointers are never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPointer {
    pub meta: Meta,
    pub location: Location,
    pub entry: Option<Entry>,
}

impl RecordPointer {
    /// Pointer for mapped mode: location only
    pub fn mapped(meta: Meta, location: Location) -> Self {
        Self {
            meta,
            location,
            entry: None,
        }
    }

    /// Pointer for cached mode: carries the decoded entry
    pub fn cached(entry: Entry, location: Location) -> Self {
        Self {
            meta: entry.meta,
            location,
            entry: Some(entry),
        }
    }

    pub fn is_live(&self, now: u64) -> bool {
        self.meta.is_live(now)
    }
}
