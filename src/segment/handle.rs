//! Segment Handle
//!
//! A live read-only mapping of one segment. Dropping the handle unmaps it.

use memmap2::Mmap;

use crate::error::Result;
use crate::record::{decode_record, Entry};

/// Mapped view of one segment
pub struct SegmentHandle {
    file_id: u64,

    /// `None` for a zero-length segment (nothing to map)
    mmap: Option<Mmap>,
}

impl SegmentHandle {
    pub(super) fn new(file_id: u64, mmap: Mmap) -> Self {
        Self {
            file_id,
            mmap: Some(mmap),
        }
    }

    pub(super) fn empty(file_id: u64) -> Self {
        Self { file_id, mmap: None }
    }

    pub fn file_id(&self) -> u64 {
        self.file_id
    }

    /// Mapped bytes
    pub fn bytes(&self) -> &[u8] {
        match &self.mmap {
            Some(m) => &m[..],
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode the record starting at `offset`
    pub fn read_entry_at(&self, offset: u64) -> Result<Entry> {
        decode_record(self.bytes(), self.file_id, offset).map(|(entry, _)| entry)
    }

    /// Sequential iteration from offset 0 (startup replay)
    pub fn iter(&self) -> SegmentIter<'_> {
        SegmentIter {
            handle: self,
            offset: 0,
            failed: false,
        }
    }
}

/// Iterator over `(offset, entry, encoded_len)` in file order
///
/// Yields the first decode error and then stops.
pub struct SegmentIter<'a> {
    handle: &'a SegmentHandle,
    offset: u64,
    failed: bool,
}

impl<'a> SegmentIter<'a> {
    /// Offset of the next record (or of the record that failed to decode)
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl<'a> Iterator for SegmentIter<'a> {
    type Item = Result<(u64, Entry, usize)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.handle.len() as u64 {
            return None;
        }

        match decode_record(self.handle.bytes(), self.handle.file_id, self.offset) {
            Ok((entry, len)) => {
                let at = self.offset;
                self.offset += len as u64;
                Some(Ok((at, entry, len)))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
