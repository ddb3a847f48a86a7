//! Segment Recovery
//!
//! Replays every segment in file-id order on startup so the bucket indexes
//! can be rebuilt.

use crate::error::{EmberError, Result};
use crate::record::{Entry, Location};

use super::{SegmentStore, FIRST_FILE_ID};

/// Replays segments into a caller-supplied sink
pub struct SegmentRecovery;

/// Result of a replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of segment files scanned
    pub segments_scanned: u64,

    /// Number of records successfully decoded
    pub records_recovered: u64,

    /// Bytes past the last valid record of the newest segment
    pub torn_bytes: u64,

    /// Segment the writer should append to
    pub active_file_id: u64,

    /// Write position inside the active segment
    pub active_offset: u64,
}

impl SegmentRecovery {
    /// Decode every record of every segment, oldest first
    ///
    /// A decode failure in the newest segment marks a torn tail: replay
    /// stops there and the valid prefix length is reported so the writer can
    /// truncate. The same failure in any older segment is returned as is.
    ///
    /// A segment longer than the configured `segment_size` cannot be mapped
    /// whole, so replay refuses it with `Config` instead of treating the
    /// unmapped records as a torn tail.
    pub fn replay<F>(store: &SegmentStore, mut sink: F) -> Result<RecoveryResult>
    where
        F: FnMut(Location, Entry),
    {
        let ids = store.segment_ids()?;
        let mut result = RecoveryResult {
            segments_scanned: 0,
            records_recovered: 0,
            torn_bytes: 0,
            active_file_id: ids.last().copied().unwrap_or(FIRST_FILE_ID),
            active_offset: 0,
        };

        for (pos, &file_id) in ids.iter().enumerate() {
            let is_newest = pos + 1 == ids.len();
            let file_len = store.segment_len(file_id)?;
            if file_len > store.segment_size() {
                return Err(EmberError::Config(format!(
                    "segment {} is {} bytes, larger than segment_size {}",
                    file_id,
                    file_len,
                    store.segment_size()
                )));
            }

            let handle = store.open_for_read(file_id)?;
            let mut iter = handle.iter();
            let mut valid_end = 0u64;

            while let Some(item) = iter.next() {
                match item {
                    Ok((offset, entry, len)) => {
                        sink(Location::new(file_id, offset), entry);
                        result.records_recovered += 1;
                        valid_end = offset + len as u64;
                    }
                    Err(e) if is_newest => {
                        tracing::warn!(file_id, offset = iter.offset(), error = %e, "torn segment tail");
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }

            if is_newest {
                result.active_offset = valid_end;
                result.torn_bytes = file_len - valid_end;
            }
            result.segments_scanned += 1;
            store.release(handle);
        }

        Ok(result)
    }
}
