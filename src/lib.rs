//! # EmberKV
//!
//! An embedded key-value store with:
//! - Named buckets, each with its own ordered index
//! - Append-only on-disk segments
//! - Two storage modes: values cached in the index, or read on demand
//!   through a transient memory mapping
//! - Tombstone deletes and per-record TTLs, filtered on every read
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Transaction (get / scans / delete)          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ bucket, key / range / prefix
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Record Index (per bucket)                   │
//! │                 key → RecordPointer                         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ ordered pointers
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Materializer                                │
//! │    skip tombstoned/expired, honor limit, resolve by mode    │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │ Cached                           │ Mapped
//!            ▼                                  ▼
//!   ┌─────────────────┐              ┌─────────────────────┐
//!   │ resident Entry  │              │   Segment Store     │
//!   │ (no I/O)        │              │ map → decode → drop │
//!   └─────────────────┘              └─────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod segment;
pub mod index;
pub mod tx;
pub mod db;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{EmberError, Result, ScanError};
pub use config::{Config, StorageMode, SyncStrategy};
pub use db::Db;
pub use index::ScanLimit;
pub use record::{Entry, Flag, Meta};
pub use tx::{Entries, Tx};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of EmberKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
