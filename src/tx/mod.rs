//! Transaction Module
//!
//! Bucket-scoped reads, scans, and writes against a `Db`.
//!
//! ## State Machine
//! ```text
//! Open ──(get/scan/put/delete)*──► Open ──(commit | rollback)──► Closed
//! ```
//! Every operation checks the state first; once closed, everything fails
//! with `TxClosed` and has no side effect.
//!
//! ## Visibility
//! Reads observe committed state only. Pending writes (including deletes)
//! are published to the bucket indexes when `commit` succeeds.
//!
//! ## Empty scans
//! `range_scan` and `prefix_scan` report an empty result (after tombstone and
//! expiration filtering) as `RangeScan(ScanError::Empty)` /
//! `PrefixScan(ScanError::Empty)` rather than an empty success. Callers rely
//! on this signal; it is part of the API contract.

mod entries;
pub mod materialize;

use std::iter;
use std::mem;

use parking_lot::MutexGuard;

use crate::db::Db;
use crate::error::{EmberError, Result, ScanError};
use crate::index::ScanLimit;
use crate::record::{now_secs, Entry, Flag, Meta, PERSISTENT};

pub use entries::Entries;
pub use materialize::{materialize, resolve};

/// Transaction lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Open,
    Closed,
}

/// A transaction scoped to one logical caller
///
/// Not meant to be shared between threads; a writable transaction holds the
/// database write lock until it is closed or dropped.
pub struct Tx<'db> {
    db: &'db Db,
    state: TxState,

    /// Records buffered until commit
    pending: Vec<Entry>,

    /// Serializes writable transactions (None for read-only)
    write_guard: Option<MutexGuard<'db, ()>>,
}

impl<'db> Tx<'db> {
    pub(crate) fn new(db: &'db Db, write_guard: Option<MutexGuard<'db, ()>>) -> Self {
        Self {
            db,
            state: TxState::Open,
            pending: Vec::new(),
            write_guard,
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get the live entry for `key` in `bucket`
    ///
    /// - `BucketOrKeyNotFound`: no such bucket, or the key was never indexed
    /// - `NotFoundKey`: the indexed record is a tombstone or has expired
    pub fn get(&self, bucket: &str, key: &[u8]) -> Result<Entry> {
        self.check_open()?;
        let now = now_secs();

        let pointer = {
            let indexes = self.db.indexes().read();
            indexes
                .get(bucket)
                .and_then(|index| index.find(key).ok())
                .cloned()
                .ok_or_else(|| EmberError::BucketOrKeyNotFound {
                    bucket: bucket.to_string(),
                    key: String::from_utf8_lossy(key).into_owned(),
                })?
        };

        if !pointer.is_live(now) {
            return Err(EmberError::NotFoundKey);
        }

        resolve(
            iter::once((key.to_vec(), pointer)),
            ScanLimit::Max(1),
            self.db.storage_mode(),
            self.db.store(),
            now,
        )?
        .into_iter()
        .next()
        .map(|(_, entry)| entry)
        .ok_or(EmberError::NotFoundKey)
    }

    /// Every live entry with a key in `[start, end]`, ascending
    pub fn range_scan(&self, bucket: &str, start: &[u8], end: &[u8]) -> Result<Entries> {
        self.check_open()?;
        let now = now_secs();

        let pointers = {
            let indexes = self.db.indexes().read();
            match indexes.get(bucket) {
                Some(index) => index
                    .range(start, end)
                    .map_err(|e| EmberError::RangeScan(ScanError::Index(e)))?,
                None => Vec::new(),
            }
        };

        let entries = resolve(
            pointers,
            ScanLimit::NoLimit,
            self.db.storage_mode(),
            self.db.store(),
            now,
        )?;

        if entries.is_empty() {
            return Err(EmberError::RangeScan(ScanError::Empty));
        }
        Ok(entries)
    }

    /// Up to `limit` live entries whose key starts with `prefix`, ascending
    pub fn prefix_scan(
        &self,
        bucket: &str,
        prefix: &[u8],
        limit: ScanLimit,
    ) -> Result<Entries> {
        self.check_open()?;
        let now = now_secs();

        let pointers = {
            let indexes = self.db.indexes().read();
            match indexes.get(bucket) {
                Some(index) => index
                    .prefix_scan(prefix, limit, now)
                    .map_err(|e| EmberError::PrefixScan(ScanError::Index(e)))?,
                None => Vec::new(),
            }
        };

        let entries = resolve(
            pointers,
            limit,
            self.db.storage_mode(),
            self.db.store(),
            now,
        )?;

        if entries.is_empty() {
            return Err(EmberError::PrefixScan(ScanError::Empty));
        }
        Ok(entries)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Buffer a persistent put
    pub fn put(&mut self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()> {
        self.put_with_ttl(bucket, key, value, PERSISTENT)
    }

    /// Buffer a put that expires `ttl` seconds after it is buffered
    pub fn put_with_ttl(&mut self, bucket: &str, key: &[u8], value: &[u8], ttl: u32) -> Result<()> {
        let meta = Meta::new(Flag::Normal, now_secs(), ttl);
        self.write(Entry::new(bucket, key.to_vec(), value.to_vec(), meta))
    }

    /// Delete `key` by buffering a tombstone record
    ///
    /// The index entry is not removed; the tombstone shadows it once
    /// committed.
    pub fn delete(&mut self, bucket: &str, key: &[u8]) -> Result<()> {
        self.write(Entry::tombstone(bucket, key.to_vec(), now_secs()))
    }

    fn write(&mut self, entry: Entry) -> Result<()> {
        self.check_open()?;
        if self.write_guard.is_none() {
            return Err(EmberError::TxReadOnly);
        }
        if entry.key.is_empty() {
            return Err(EmberError::EmptyKey);
        }
        self.pending.push(entry);
        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Persist pending writes, publish them, and close the transaction
    ///
    /// The transaction is closed even when the write path fails.
    pub fn commit(&mut self) -> Result<()> {
        self.check_open()?;
        let pending = mem::take(&mut self.pending);
        let result = if pending.is_empty() {
            Ok(())
        } else {
            self.db.apply(pending)
        };
        self.close();
        result
    }

    /// Discard pending writes and close the transaction
    pub fn rollback(&mut self) -> Result<()> {
        self.check_open()?;
        if !self.pending.is_empty() {
            tracing::debug!(discarded = self.pending.len(), "rolled back transaction");
        }
        self.pending.clear();
        self.close();
        Ok(())
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == TxState::Open
    }

    pub fn is_writable(&self) -> bool {
        self.write_guard.is_some()
    }

    /// Number of buffered writes
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn check_open(&self) -> Result<()> {
        match self.state {
            TxState::Open => Ok(()),
            TxState::Closed => Err(EmberError::TxClosed),
        }
    }

    fn close(&mut self) {
        self.state = TxState::Closed;
        self.write_guard = None;
    }
}

impl Drop for Tx<'_> {
    fn drop(&mut self) {
        if self.is_open() && !self.pending.is_empty() {
            tracing::debug!(
                discarded = self.pending.len(),
                "transaction dropped while open, pending writes discarded"
            );
        }
    }
}
