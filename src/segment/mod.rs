//! Segment Module
//!
//! Immutable, append-only data segments identified by a numeric file id.
//!
//! ## Responsibilities
//! - Map a segment on demand and decode one record at a byte offset
//! - Release every mapping as soon as the read is done (scoped, on drop)
//! - Append records to the active segment and rotate at `segment_size`
//! - Replay all segments on startup to rebuild the bucket indexes
//!
//! ## Layout
//! ```text
//! {data_dir}/segments/
//!   ├── segment_000001.dat
//!   ├── segment_000002.dat
//!   └── ...                    (records back to back, see `record`)
//! ```
//!
//! Mappings are never cached across reads: each mapped-mode lookup performs
//! its own open → read → release cycle, so at most one mapping is alive per
//! in-flight read.

mod handle;
mod recovery;
mod store;
mod writer;

pub use handle::{SegmentHandle, SegmentIter};
pub use recovery::{RecoveryResult, SegmentRecovery};
pub use store::SegmentStore;
pub use writer::SegmentWriter;

/// Directory (under `data_dir`) holding segment files
pub const SEGMENT_DIR: &str = "segments";

/// First file id handed out in an empty store
pub const FIRST_FILE_ID: u64 = 1;
