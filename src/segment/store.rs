//! Segment Store
//!
//! Maps file ids to paths and opens transient read-only mappings.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use memmap2::MmapOptions;

use crate::error::{EmberError, Result};
use crate::record::{Entry, Location};

use super::SegmentHandle;

/// Owns the segment directory and the configured segment size
#[derive(Debug, Clone)]
pub struct SegmentStore {
    /// Directory where segments are stored
    dir: PathBuf,

    /// Max segment size, also the upper bound of every mapping
    segment_size: u64,
}

impl SegmentStore {
    /// Open or create the segment directory
    pub fn open(dir: &Path, segment_size: u64) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            segment_size,
        })
    }

    /// Map segment `file_id` read-only
    ///
    /// The mapping covers `min(file length, segment_size)` bytes and is
    /// released when the handle drops.
    pub fn open_for_read(&self, file_id: u64) -> Result<SegmentHandle> {
        let path = self.segment_path(file_id);
        let io_err = |source| EmberError::SegmentIo {
            file_id,
            path: path.clone(),
            source,
        };

        let file = File::open(&path).map_err(io_err)?;
        let file_len = file.metadata().map_err(io_err)?.len();
        let map_len = file_len.min(self.segment_size);

        if map_len == 0 {
            return Ok(SegmentHandle::empty(file_id));
        }

        // SAFETY: segments are immutable once a record is written and the
        // mapping is read-only; every decode bounds-checks against the
        // mapped length.
        let mmap = unsafe { MmapOptions::new().len(map_len as usize).map(&file) }
            .map_err(io_err)?;

        tracing::trace!(file_id, map_len, "mapped segment");
        Ok(SegmentHandle::new(file_id, mmap))
    }

    /// On-disk length of segment `file_id`
    pub fn segment_len(&self, file_id: u64) -> Result<u64> {
        let path = self.segment_path(file_id);
        fs::metadata(&path)
            .map(|meta| meta.len())
            .map_err(|source| EmberError::SegmentIo {
                file_id,
                path,
                source,
            })
    }

    /// Decode the record at `offset` in an already mapped segment
    pub fn read_entry_at(&self, handle: &SegmentHandle, offset: u64) -> Result<Entry> {
        handle.read_entry_at(offset)
    }

    /// Unmap a segment
    pub fn release(&self, handle: SegmentHandle) {
        tracing::trace!(file_id = handle.file_id(), "released segment");
        drop(handle);
    }

    /// One full open → read → release cycle for a single location
    ///
    /// The handle is dropped on every exit path, including decode failure.
    pub fn read_entry(&self, location: Location) -> Result<Entry> {
        let handle = self.open_for_read(location.file_id)?;
        let result = self.read_entry_at(&handle, location.offset);
        self.release(handle);
        result
    }

    /// Existing segment ids in ascending order
    pub fn segment_ids(&self) -> Result<Vec<u64>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() {
                if let Some(id) = Self::parse_segment_id(&path) {
                    ids.push(id);
                }
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    /// Deterministic path for a segment id
    pub fn segment_path(&self, file_id: u64) -> PathBuf {
        self.dir.join(format!("segment_{:06}.dat", file_id))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn segment_size(&self) -> u64 {
        self.segment_size
    }

    /// "segment_000042.dat" → Some(42)
    fn parse_segment_id(path: &Path) -> Option<u64> {
        if path.extension()? != "dat" {
            return None;
        }
        let name = path.file_stem()?.to_string_lossy();
        let id_str = name.strip_prefix("segment_")?;
        id_str.parse().ok()
    }
}
