//! Database Module
//!
//! The database handle: owns the bucket index table, the segment store, and
//! the segment writer, and hands out transactions.
//!
//! ## Responsibilities
//! - Rebuild every bucket index from the segments on open
//! - Serialize writable transactions, let read-only ones run concurrently
//! - Append committed records and publish their pointers
//! - Sync the active segment on close

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use parking_lot::{Mutex, RwLock};

use crate::config::{Config, StorageMode};
use crate::error::{EmberError, Result};
use crate::index::RecordIndex;
use crate::record::{encoded_len, Entry, Location, RecordPointer};
use crate::segment::{SegmentRecovery, SegmentStore, SegmentWriter, SEGMENT_DIR};
use crate::tx::Tx;

/// The database handle
///
/// ## Concurrency Model
///
/// - **Writable transactions**: serialized by `write_lock`, held from
///   `begin(true)` until the transaction closes or drops
/// - **Reads**: take the `indexes` read lock only long enough to copy out the
///   pointers they need; segment I/O happens outside the lock
/// - **Commit**: appends under the `writer` mutex, then publishes under the
///   `indexes` write lock
pub struct Db {
    /// Database configuration
    config: Config,

    /// Read side of the segments
    store: SegmentStore,

    /// Bucket name → ordered index
    indexes: RwLock<HashMap<String, RecordIndex>>,

    /// Append side of the segments
    writer: Mutex<SegmentWriter>,

    /// Serializes writable transactions
    write_lock: Mutex<()>,
}

impl Db {
    /// Open or create a database with the given config
    ///
    /// On startup:
    /// 1. Validate config and create directories
    /// 2. Replay every segment into the bucket indexes
    /// 3. Cut any torn tail off the newest segment
    /// 4. Position the writer after the last valid record
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let store = SegmentStore::open(&config.data_dir.join(SEGMENT_DIR), config.segment_size)?;
        let mode = config.storage_mode;

        let mut indexes: HashMap<String, RecordIndex> = HashMap::new();
        let recovery = SegmentRecovery::replay(&store, |location, entry| {
            let key = entry.key.to_vec();
            let bucket = entry.bucket.clone();
            let pointer = Self::pointer_for(mode, entry, location);
            indexes.entry(bucket).or_default().insert(key, pointer);
        })?;

        if recovery.records_recovered > 0 || recovery.torn_bytes > 0 {
            tracing::info!(
                segments = recovery.segments_scanned,
                records = recovery.records_recovered,
                buckets = indexes.len(),
                torn_bytes = recovery.torn_bytes,
                "rebuilt indexes from segments"
            );
        }

        let writer = SegmentWriter::open(
            store.clone(),
            recovery.active_file_id,
            recovery.active_offset,
            config.sync_strategy,
        )?;

        tracing::info!(
            data_dir = %config.data_dir.display(),
            ?mode,
            segment_size = config.segment_size,
            "database opened"
        );

        Ok(Self {
            config,
            store,
            indexes: RwLock::new(indexes),
            writer: Mutex::new(writer),
            write_lock: Mutex::new(()),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    /// Start a transaction
    ///
    /// A writable transaction blocks until any other writable transaction
    /// has closed.
    pub fn begin(&self, writable: bool) -> Tx<'_> {
        let guard = if writable {
            Some(self.write_lock.lock())
        } else {
            None
        };
        Tx::new(self, guard)
    }

    /// Run `f` in a read-only transaction
    pub fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Tx<'_>) -> Result<T>,
    {
        let mut tx = self.begin(false);
        let result = f(&tx);
        tx.rollback()?;
        result
    }

    /// Run `f` in a writable transaction: commit on `Ok`, roll back on `Err`
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Tx<'_>) -> Result<T>,
    {
        let mut tx = self.begin(true);
        match f(&mut tx) {
            Ok(value) => {
                if tx.is_open() {
                    tx.commit()?;
                }
                Ok(value)
            }
            Err(e) => {
                if tx.is_open() {
                    tx.rollback()?;
                }
                Err(e)
            }
        }
    }

    /// Close the database gracefully
    ///
    /// Syncs the active segment. Taking `self` by value means no transaction
    /// can outlive the handle.
    pub fn close(self) -> Result<()> {
        self.writer.lock().sync()?;
        tracing::info!(data_dir = %self.config.data_dir.display(), "database closed");
        Ok(())
    }

    /// Append pending records and publish their pointers
    ///
    /// Either every record reaches the segments or none does: sizes are
    /// checked before the first append, and any later write failure rewinds
    /// the writer to where the commit started.
    pub(crate) fn apply(&self, pending: Vec<Entry>) -> Result<()> {
        let limit = self.store.segment_size();
        for entry in &pending {
            let size = encoded_len(entry) as u64;
            if size > limit {
                return Err(EmberError::RecordTooLarge { size, limit });
            }
        }

        let located = {
            let mut writer = self.writer.lock();
            let start = writer.position();
            match Self::append_all(&mut writer, pending) {
                Ok(located) => located,
                Err(e) => {
                    if let Err(rewind_err) = writer.rewind(start) {
                        tracing::error!(
                            file_id = start.file_id,
                            offset = start.offset,
                            error = %rewind_err,
                            "failed to rewind after aborted commit"
                        );
                    }
                    return Err(e);
                }
            }
        };

        let records = located.len();
        let mode = self.config.storage_mode;
        let mut indexes = self.indexes.write();
        for (entry, location) in located {
            let key = entry.key.to_vec();
            let index = indexes.entry(entry.bucket.clone()).or_default();
            index.insert(key, Self::pointer_for(mode, entry, location));
        }

        tracing::debug!(records, buckets = indexes.len(), "committed transaction");
        Ok(())
    }

    fn append_all(writer: &mut SegmentWriter, pending: Vec<Entry>) -> Result<Vec<(Entry, Location)>> {
        let mut located = Vec::with_capacity(pending.len());
        for entry in pending {
            let location = writer.append(&entry)?;
            located.push((entry, location));
        }
        writer.commit()?;
        Ok(located)
    }

    fn pointer_for(mode: StorageMode, entry: Entry, location: Location) -> RecordPointer {
        match mode {
            StorageMode::Cached => RecordPointer::cached(entry, location),
            StorageMode::Mapped => RecordPointer::mapped(entry.meta, location),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub(crate) fn indexes(&self) -> &RwLock<HashMap<String, RecordIndex>> {
        &self.indexes
    }

    /// Segment store backing mapped-mode reads
    pub fn store(&self) -> &SegmentStore {
        &self.store
    }

    pub fn storage_mode(&self) -> StorageMode {
        self.config.storage_mode
    }

    /// Names of every bucket with an index, sorted
    pub fn bucket_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indexes.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of indexed keys (live or not) in `bucket`
    pub fn bucket_len(&self, bucket: &str) -> usize {
        self.indexes.read().get(bucket).map_or(0, RecordIndex::len)
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
