//! Record Module
//!
//! The materialized entry type, its metadata, and the index pointer that
//! locates it.
//!
//! ## Record Format (on disk)
//! ```text
//! ┌───────────┬──────────────────────────────┬────────┬─────┬───────┐
//! │ CRC32 (4) │ Header (26, bincode fixint)  │ Bucket │ Key │ Value │
//! └───────────┴──────────────────────────────┴────────┴─────┴───────┘
//!
//! Header: Timestamp u64 | TTL u32 | Flag u16 | BucketLen u32 | KeyLen u32 | ValLen u32
//! ```
//! The CRC covers the header and the payload.

mod codec;
mod pointer;

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;

pub use codec::{decode_record, encode_record, encoded_len, CRC_SIZE, HEADER_SIZE, RECORD_OVERHEAD};
pub use pointer::{Location, RecordPointer};

/// TTL value meaning "never expires"
pub const PERSISTENT: u32 = 0;

/// Record flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// A live value
    Normal,

    /// A deletion marker
    Tombstone,
}

impl Flag {
    pub(crate) fn to_u16(self) -> u16 {
        match self {
            Flag::Normal => 0,
            Flag::Tombstone => 1,
        }
    }

    pub(crate) fn from_u16(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(Flag::Normal),
            1 => Some(Flag::Tombstone),
            _ => None,
        }
    }
}

/// Per-record metadata: flag plus write time and TTL (both in seconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meta {
    pub flag: Flag,

    /// Unix seconds when the record was written
    pub timestamp: u64,

    /// Seconds to live after `timestamp`; `PERSISTENT` never expires
    pub ttl: u32,
}

impl Meta {
    pub fn new(flag: Flag, timestamp: u64, ttl: u32) -> Self {
        Self { flag, timestamp, ttl }
    }

    pub fn is_tombstone(&self) -> bool {
        self.flag == Flag::Tombstone
    }

    /// Absolute expiration time, or `None` for persistent records
    pub fn expires_at(&self) -> Option<u64> {
        if self.ttl == PERSISTENT {
            None
        } else {
            Some(self.timestamp.saturating_add(self.ttl as u64))
        }
    }

    /// Expired once `now` reaches the expiration timestamp
    pub fn is_expired(&self, now: u64) -> bool {
        matches!(self.expires_at(), Some(at) if now >= at)
    }

    /// Neither deleted nor expired at `now`
    pub fn is_live(&self, now: u64) -> bool {
        !self.is_tombstone() && !self.is_expired(now)
    }
}

/// A materialized key-value record
///
/// Entries are read-only snapshots. Cloning is cheap: key and value are
/// reference-counted buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub bucket: String,
    pub key: Bytes,
    pub value: Bytes,
    pub meta: Meta,
}

impl Entry {
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<Bytes>,
        value: impl Into<Bytes>,
        meta: Meta,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            value: value.into(),
            meta,
        }
    }

    /// Tombstone for `key` written at `timestamp`, with an empty value
    pub fn tombstone(bucket: impl Into<String>, key: impl Into<Bytes>, timestamp: u64) -> Self {
        Self::new(
            bucket,
            key,
            Bytes::new(),
            Meta::new(Flag::Tombstone, timestamp, PERSISTENT),
        )
    }
}

/// Current wall-clock time in unix seconds
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
