//! Configuration for EmberKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{EmberError, Result};
use crate::record::RECORD_OVERHEAD;

/// Main configuration for an EmberKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     └── segments/        (append-only segment files)
    pub data_dir: PathBuf,

    /// Where values live once a record is indexed
    pub storage_mode: StorageMode,

    /// Max size of one segment file (in bytes); also the mapping size for reads
    pub segment_size: u64,

    // -------------------------------------------------------------------------
    // Durability Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync the active segment
    pub sync_strategy: SyncStrategy,
}

/// Storage mode, resolved once per database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// Index pointers carry the decoded entry; reads never touch segments
    Cached,

    /// Index pointers carry only a location; reads map the segment on demand
    Mapped,
}

/// Segment sync strategy
#[derive(Debug, Clone, Copy)]
pub enum SyncStrategy {
    /// fsync after every commit (safest, slowest)
    EveryCommit,

    /// fsync after N commits (balanced durability/performance)
    EveryNCommits { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./emberkv_data"),
            storage_mode: StorageMode::Mapped,
            segment_size: 8 * 1024 * 1024, // 8 MB
            sync_strategy: SyncStrategy::EveryCommit,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the storage layer cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.segment_size <= RECORD_OVERHEAD as u64 {
            return Err(EmberError::Config(format!(
                "segment_size {} must exceed the record overhead of {} bytes",
                self.segment_size, RECORD_OVERHEAD
            )));
        }
        if let SyncStrategy::EveryNCommits { count: 0 } = self.sync_strategy {
            return Err(EmberError::Config(
                "EveryNCommits requires a count of at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the storage mode
    pub fn storage_mode(mut self, mode: StorageMode) -> Self {
        self.config.storage_mode = mode;
        self
    }

    /// Set the segment size (in bytes)
    pub fn segment_size(mut self, size: u64) -> Self {
        self.config.segment_size = size;
        self
    }

    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
