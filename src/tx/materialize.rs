//! Record Materializer
//!
//! Turns record pointers into entries: tombstoned and expired pointers are
//! skipped, the rest are taken from the index (cached mode) or read from
//! their segment (mapped mode), until the result cap is met.

use crate::config::StorageMode;
use crate::error::{EmberError, Result};
use crate::index::ScanLimit;
use crate::record::{Entry, RecordPointer};
use crate::segment::SegmentStore;

use super::Entries;

/// Resolve pointers, in input order, into a result set
///
/// Dead pointers never count toward `limit`. Once the cap is met the walk
/// stops without touching the remaining pointers. Any segment failure aborts
/// the whole call.
pub fn resolve<I>(
    pointers: I,
    limit: ScanLimit,
    mode: StorageMode,
    store: &SegmentStore,
    now: u64,
) -> Result<Entries>
where
    I: IntoIterator<Item = (Vec<u8>, RecordPointer)>,
{
    let mut entries = Entries::new();
    let mut skipped = 0usize;

    for (key, pointer) in pointers {
        if !pointer.is_live(now) {
            skipped += 1;
            continue;
        }
        if limit.is_reached(entries.len()) {
            break;
        }

        let entry = materialize(&key, pointer, mode, store)?;
        entries.push(key, entry);
    }

    tracing::trace!(returned = entries.len(), skipped, ?mode, "resolved pointers");
    Ok(entries)
}

/// Resolve a single live pointer
pub fn materialize(
    key: &[u8],
    pointer: RecordPointer,
    mode: StorageMode,
    store: &SegmentStore,
) -> Result<Entry> {
    match mode {
        StorageMode::Cached => pointer.entry.ok_or_else(|| EmberError::MissingResident {
            key: String::from_utf8_lossy(key).into_owned(),
        }),
        StorageMode::Mapped => store
            .read_entry(pointer.location)
            .map_err(|e| e.with_key(key)),
    }
}
