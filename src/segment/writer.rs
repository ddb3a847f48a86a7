//! Segment Writer
//!
//! Appends encoded records to the active segment, rotating to a new file id
//! when the next record would cross `segment_size`.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::mem;

use crate::config::SyncStrategy;
use crate::error::{EmberError, Result};
use crate::record::{encode_record, Entry, Location};

use super::SegmentStore;

/// Appends records to the active segment
pub struct SegmentWriter {
    store: SegmentStore,
    sync_strategy: SyncStrategy,

    /// Id of the segment currently receiving appends
    file_id: u64,

    /// Buffered writer for performance
    writer: BufWriter<File>,

    /// Next write position within the active segment
    offset: u64,

    /// Commits since the last fsync (EveryNCommits)
    unsynced_commits: usize,
}

impl SegmentWriter {
    /// Open segment `file_id` for appending at `offset`
    ///
    /// Anything past `offset` (a torn tail) is cut off.
    pub fn open(
        store: SegmentStore,
        file_id: u64,
        offset: u64,
        sync_strategy: SyncStrategy,
    ) -> Result<Self> {
        let file = Self::open_segment(&store, file_id)?;
        let current_len = file.metadata()?.len();
        if current_len > offset {
            tracing::warn!(file_id, offset, current_len, "truncating segment tail");
            file.set_len(offset)?;
        }

        let mut writer = BufWriter::new(file);
        writer.seek(SeekFrom::Start(offset))?;

        Ok(Self {
            store,
            sync_strategy,
            file_id,
            writer,
            offset,
            unsynced_commits: 0,
        })
    }

    /// Append one record, returning where it landed
    pub fn append(&mut self, entry: &Entry) -> Result<Location> {
        let bytes = encode_record(entry)?;
        let size = bytes.len() as u64;
        let limit = self.store.segment_size();

        if size > limit {
            return Err(EmberError::RecordTooLarge { size, limit });
        }

        if self.offset > 0 && self.offset + size > limit {
            self.rotate()?;
        }

        self.writer.write_all(&bytes)?;
        let location = Location::new(self.file_id, self.offset);
        self.offset += size;

        Ok(location)
    }

    /// Make appended records visible to readers and apply the sync strategy
    pub fn commit(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.unsynced_commits += 1;

        let due = match self.sync_strategy {
            SyncStrategy::EveryCommit => true,
            SyncStrategy::EveryNCommits { count } => self.unsynced_commits >= count,
        };
        if due {
            self.sync()?;
        }
        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.unsynced_commits = 0;
        Ok(())
    }

    /// Where the next record will land (before any rotation)
    pub fn position(&self) -> Location {
        Location::new(self.file_id, self.offset)
    }

    /// Undo every append made since `position` was taken
    ///
    /// Buffered bytes are dropped without being written, segments created
    /// by rotation since then are deleted, and the segment at `position` is
    /// cut back to its offset.
    pub fn rewind(&mut self, position: Location) -> Result<()> {
        let file = Self::open_segment(&self.store, position.file_id)?;
        let stale = mem::replace(&mut self.writer, BufWriter::new(file));
        let (_, discarded) = stale.into_parts();

        for file_id in position.file_id + 1..=self.file_id {
            let path = self.store.segment_path(file_id);
            fs::remove_file(&path).map_err(|source| EmberError::SegmentIo {
                file_id,
                path,
                source,
            })?;
        }

        self.writer.get_ref().set_len(position.offset)?;
        self.writer.seek(SeekFrom::Start(position.offset))?;
        self.writer.get_ref().sync_all()?;

        tracing::debug!(
            file_id = position.file_id,
            offset = position.offset,
            discarded_from = self.file_id,
            unwritten = discarded.map_or(0, |buf| buf.len()),
            "rewound segment writer"
        );

        self.file_id = position.file_id;
        self.offset = position.offset;
        Ok(())
    }

    pub fn file_id(&self) -> u64 {
        self.file_id
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn rotate(&mut self) -> Result<()> {
        self.sync()?;

        let next_id = self.file_id + 1;
        let file = Self::open_segment(&self.store, next_id)?;
        file.set_len(0)?;

        tracing::debug!(from = self.file_id, to = next_id, "rotated segment");

        self.writer = BufWriter::new(file);
        self.file_id = next_id;
        self.offset = 0;
        Ok(())
    }

    fn open_segment(store: &SegmentStore, file_id: u64) -> Result<File> {
        let path = store.segment_path(file_id);
        OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| EmberError::SegmentIo {
                file_id,
                path,
                source,
            })
    }
}
