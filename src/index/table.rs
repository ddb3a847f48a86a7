//! RecordIndex implementation

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::record::RecordPointer;

use super::{IndexError, ScanLimit};

/// Ordered key → pointer index for one bucket
#[derive(Debug, Default, Clone)]
pub struct RecordIndex {
    tree: BTreeMap<Vec<u8>, RecordPointer>,
}

impl RecordIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the pointer for `key`, returning the previous one
    pub fn insert(&mut self, key: Vec<u8>, pointer: RecordPointer) -> Option<RecordPointer> {
        self.tree.insert(key, pointer)
    }

    /// Exact lookup
    pub fn find(&self, key: &[u8]) -> Result<&RecordPointer, IndexError> {
        self.tree.get(key).ok_or(IndexError::KeyNotFound)
    }

    /// Every indexed key in `[start, end]`, ascending
    pub fn range(
        &self,
        start: &[u8],
        end: &[u8],
    ) -> Result<Vec<(Vec<u8>, RecordPointer)>, IndexError> {
        if start > end {
            return Err(IndexError::InvalidRange {
                start: String::from_utf8_lossy(start).into_owned(),
                end: String::from_utf8_lossy(end).into_owned(),
            });
        }

        Ok(self
            .tree
            .range::<[u8], _>((Bound::Included(start), Bound::Included(end)))
            .map(|(k, p)| (k.clone(), p.clone()))
            .collect())
    }

    /// Every key sharing `prefix`, ascending
    ///
    /// `limit` is a hint: the walk stops once `limit` pointers live at `now`
    /// have been collected. Dead pointers are still returned (the caller
    /// filters them) but never count toward the cap.
    pub fn prefix_scan(
        &self,
        prefix: &[u8],
        limit: ScanLimit,
        now: u64,
    ) -> Result<Vec<(Vec<u8>, RecordPointer)>, IndexError> {
        let mut out = Vec::new();
        let mut live = 0usize;

        let matches = self
            .tree
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix));

        for (key, pointer) in matches {
            if limit.is_reached(live) {
                break;
            }
            if pointer.is_live(now) {
                live += 1;
            }
            out.push((key.clone(), pointer.clone()));
        }

        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}
